//! Uniform random fan-out over several channels.

use rand::Rng;

use super::{Channel, ChannelError, Request, Response};

/// Delegates each dispatch to one uniformly chosen channel.
///
/// Stateless and health-unaware: a channel that just failed is as likely to
/// be picked again as any other. Use [`crate::client::Pool`] when failures
/// should steer selection.
pub struct RandomChannel {
    channels: Vec<Box<dyn Channel>>,
}

impl RandomChannel {
    /// Panics if `channels` is empty.
    pub fn new(channels: Vec<Box<dyn Channel>>) -> Self {
        assert!(!channels.is_empty(), "RandomChannel::new: no channels provided");
        Self { channels }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl Channel for RandomChannel {
    fn dispatch(&mut self, request: &Request) -> Result<Response, ChannelError> {
        let idx = rand::thread_rng().gen_range(0..self.channels.len());
        self.channels[idx].dispatch(request)
    }
}

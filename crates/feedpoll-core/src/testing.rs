//! Test doubles shared by unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;
use std::time::Instant;

use crate::channel::{Channel, ChannelError, Request, Response};

pub(crate) type DispatchLog = Rc<RefCell<Vec<Instant>>>;

/// Channel that replays scripted results, then answers `200 ok` forever.
/// Every dispatch start is recorded.
pub(crate) struct ScriptedChannel {
    script: VecDeque<Result<Response, ChannelError>>,
    log: DispatchLog,
    requests: Rc<RefCell<Vec<Request>>>,
}

impl ScriptedChannel {
    pub(crate) fn new() -> Self {
        Self {
            script: VecDeque::new(),
            log: Rc::default(),
            requests: Rc::default(),
        }
    }

    pub(crate) fn then(mut self, result: Result<Response, ChannelError>) -> Self {
        self.script.push_back(result);
        self
    }

    pub(crate) fn log(&self) -> DispatchLog {
        Rc::clone(&self.log)
    }

    pub(crate) fn requests(&self) -> Rc<RefCell<Vec<Request>>> {
        Rc::clone(&self.requests)
    }
}

impl Channel for ScriptedChannel {
    fn dispatch(&mut self, request: &Request) -> Result<Response, ChannelError> {
        self.log.borrow_mut().push(Instant::now());
        self.requests.borrow_mut().push(request.clone());
        self.script
            .pop_front()
            .unwrap_or_else(|| Ok(Response::new(200, "ok")))
    }
}

pub(crate) fn reset() -> ChannelError {
    ChannelError::Io(io::Error::from(io::ErrorKind::ConnectionReset))
}

pub(crate) fn status(url: &str, status: u32) -> ChannelError {
    ChannelError::Status {
        url: url.to_string(),
        status,
    }
}

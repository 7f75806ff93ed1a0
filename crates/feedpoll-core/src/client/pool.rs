//! Health-aware selection over a fixed set of clients.

use std::time::{Duration, Instant};

use anyhow::Result;
use rand::Rng;

use super::Client;
use crate::channel::{Channel, ChannelError, Request, Response};

/// How long a client stays out of normal selection after `backoff_last`.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30 * 60);

/// Fixed, non-empty set of clients with per-client cool-down tracking.
///
/// Not synchronized: the pool is meant to be driven by one sequential loop.
#[derive(Debug)]
pub struct Pool {
    clients: Vec<Client>,
    /// Index-aligned with `clients`; `None` = never backed off.
    backed_off_until: Vec<Option<Instant>>,
    last: usize,
    cooldown: Duration,
}

impl Pool {
    /// Panics if `clients` is empty.
    pub fn new(clients: Vec<Client>) -> Self {
        assert!(!clients.is_empty(), "Pool::new: no clients provided");
        let backed_off_until = vec![None; clients.len()];
        Self {
            clients,
            backed_off_until,
            last: 0,
            cooldown: DEFAULT_COOLDOWN,
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    /// Index recorded by the most recent `select`.
    pub fn last_selected(&self) -> usize {
        self.last
    }

    /// Whether the client at `idx` is currently cooling down.
    pub fn is_backed_off(&self, idx: usize) -> bool {
        self.backed_off_at(idx, Instant::now())
    }

    fn backed_off_at(&self, idx: usize, now: Instant) -> bool {
        self.backed_off_until[idx].is_some_and(|until| now <= until)
    }

    /// Pick a client, preferring ones that are not cooling down.
    ///
    /// A single client is always returned as is. Otherwise up to `len()`
    /// uniform draws *with replacement* look for a healthy client; if all of
    /// them hit backed-off clients, one more draw ignores cool-downs. The
    /// probe is not exhaustive, so a backed-off client can be returned while a
    /// healthy one exists elsewhere in the pool.
    pub fn select(&mut self) -> &mut Client {
        let idx = self.select_index();
        &mut self.clients[idx]
    }

    fn select_index(&mut self) -> usize {
        let n = self.clients.len();
        if n == 1 {
            return 0;
        }

        let now = Instant::now();
        let mut rng = rand::thread_rng();
        for _ in 0..n {
            let idx = rng.gen_range(0..n);
            if !self.backed_off_at(idx, now) {
                self.last = idx;
                return idx;
            }
        }

        tracing::warn!("failed to select a non-backed-off client for the request");
        let idx = rng.gen_range(0..n);
        self.last = idx;
        idx
    }

    /// Take the most recently selected client out of normal selection for the
    /// cool-down window. Only meaningful after a `select`.
    pub fn backoff_last(&mut self) {
        let until = Instant::now() + self.cooldown;
        self.backed_off_until[self.last] = Some(until);
        tracing::warn!(
            client = %self.clients[self.last].label(),
            cooldown_secs = self.cooldown.as_secs(),
            "backing off client"
        );
    }

    /// Close every client in order. A failing teardown does not stop the
    /// remaining ones; all failures are reported together.
    pub fn close(&mut self) -> Result<()> {
        let mut failures = Vec::new();
        for client in &mut self.clients {
            if let Err(e) = client.close() {
                tracing::warn!(client = %client.label(), "client teardown failed: {:#}", e);
                failures.push(format!("{}: {:#}", client.label(), e));
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "failed to tear down {} client(s): {}",
                failures.len(),
                failures.join("; ")
            )
        }
    }
}

impl Channel for Pool {
    fn dispatch(&mut self, request: &Request) -> Result<Response, ChannelError> {
        self.select().dispatch(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedChannel;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn pool_of(n: usize) -> Pool {
        let clients = (0..n)
            .map(|i| Client::new(format!("key-{i}"), ScriptedChannel::new()))
            .collect();
        Pool::new(clients)
    }

    /// Select until `target` comes up, then back it off.
    fn back_off(pool: &mut Pool, target: usize) {
        loop {
            pool.select();
            if pool.last_selected() == target {
                break;
            }
        }
        pool.backoff_last();
    }

    #[test]
    #[should_panic(expected = "no clients")]
    fn empty_pool_panics() {
        let _ = Pool::new(Vec::new());
    }

    #[test]
    fn select_returns_member() {
        for n in 1..=5 {
            let mut pool = pool_of(n);
            let keys: Vec<String> = (0..n).map(|i| format!("key-{i}")).collect();
            for _ in 0..50 {
                let key = pool.select().key().to_string();
                assert!(keys.contains(&key));
                assert_eq!(key, keys[pool.last_selected()]);
            }
        }
    }

    #[test]
    fn single_client_returned_even_when_backed_off() {
        let mut pool = pool_of(1).with_cooldown(Duration::from_secs(365 * 24 * 3600));
        pool.select();
        pool.backoff_last();
        assert!(pool.is_backed_off(0));
        for _ in 0..10 {
            assert_eq!(pool.select().key(), "key-0");
        }
    }

    #[test]
    fn backoff_last_marks_only_last_selected() {
        let mut pool = pool_of(3);
        back_off(&mut pool, 1);
        assert!(!pool.is_backed_off(0));
        assert!(pool.is_backed_off(1));
        assert!(!pool.is_backed_off(2));
    }

    #[test]
    fn cooldown_expires() {
        let mut pool = pool_of(2).with_cooldown(Duration::from_millis(20));
        back_off(&mut pool, 0);
        assert!(pool.is_backed_off(0));
        std::thread::sleep(Duration::from_millis(30));
        assert!(!pool.is_backed_off(0));
    }

    #[test]
    fn backed_off_client_is_rare_but_possible() {
        let mut pool = pool_of(2);
        back_off(&mut pool, 0);

        let trials = 4000;
        let mut backed_off_hits = 0;
        for _ in 0..trials {
            if pool.select().key() == "key-0" {
                backed_off_hits += 1;
            }
        }
        // Expected rate is (1/2)^2 * 1/2 = 1/8.
        assert!(backed_off_hits > 0, "random probing should leak occasionally");
        assert!(
            trials - backed_off_hits > trials * 3 / 4,
            "healthy client should dominate: {backed_off_hits} of {trials} hit the backed-off one"
        );
    }

    #[test]
    fn close_runs_every_teardown_in_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let clients = (0..3)
            .map(|i| {
                let order = Rc::clone(&order);
                Client::new(format!("key-{i}"), ScriptedChannel::new())
                    .with_label(format!("c{i}"))
                    .with_teardown(move || {
                        order.borrow_mut().push(i);
                        if i == 1 {
                            anyhow::bail!("device busy");
                        }
                        Ok(())
                    })
            })
            .collect();
        let mut pool = Pool::new(clients);

        let err = pool.close().unwrap_err().to_string();
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
        assert!(err.contains("1 client(s)"), "{err}");
        assert!(err.contains("c1: device busy"), "{err}");

        // Teardowns are consumed; a second close is clean.
        pool.close().unwrap();
        assert_eq!(order.borrow().len(), 3);
    }

    #[test]
    fn pool_is_a_channel() {
        let mut pool = pool_of(3);
        let resp = pool.dispatch(&Request::get("http://127.0.0.1/")).unwrap();
        assert_eq!(resp.status, 200);
    }
}

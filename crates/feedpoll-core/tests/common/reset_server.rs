//! TCP server that resets every connection once the client has spoken.
//!
//! The first bytes of the request (an HTTP request head, or a TLS
//! ClientHello) are read, then the socket is closed with `SO_LINGER = 0`,
//! which makes the kernel send RST instead of FIN.

use std::io::Read;
use std::net::{TcpListener, TcpStream};
use std::os::unix::io::AsRawFd;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub struct ResetServer {
    pub port: u16,
    resets: Arc<AtomicUsize>,
}

impl ResetServer {
    /// `scheme://127.0.0.1:<port>/operations`
    pub fn url(&self, scheme: &str) -> String {
        format!("{}://127.0.0.1:{}/operations", scheme, self.port)
    }

    /// Connections reset so far.
    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

/// Starts a server in a background thread. The server runs until the process exits.
pub fn start() -> ResetServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let resets = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&resets);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            reset(stream, &counter);
        }
    });

    ResetServer { port, resets }
}

fn reset(mut stream: TcpStream, counter: &AtomicUsize) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 4096];
    let _ = stream.read(&mut buf);

    let linger = libc::linger {
        l_onoff: 1,
        l_linger: 0,
    };
    let r = unsafe {
        libc::setsockopt(
            stream.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_LINGER,
            &linger as *const libc::linger as *const libc::c_void,
            std::mem::size_of::<libc::linger>() as libc::socklen_t,
        )
    };
    assert_eq!(r, 0, "setsockopt(SO_LINGER): {}", std::io::Error::last_os_error());
    // Counted before the RST goes out, so clients never observe it first.
    counter.fetch_add(1, Ordering::SeqCst);
    drop(stream);
}

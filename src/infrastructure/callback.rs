//! Local OAuth callback server for the hosted Link flow.
//!
//! Plaid redirects the browser to `http://<host>:<port>/oauth-callback` once the
//! user finished authorizing an institution. The server runs on a background
//! thread and flips a shared flag when that request arrives.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::infrastructure::http::{read_request, write_response, HttpResponse};

/// Path Plaid redirects to after authorization.
pub const CALLBACK_PATH: &str = "/oauth-callback";

/// Default interval between completion checks while waiting.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

const ACCEPT_POLL: Duration = Duration::from_millis(25);
const CLIENT_READ_TIMEOUT: Duration = Duration::from_secs(5);

const AUTHORIZATION_COMPLETE: &str = r#"<!DOCTYPE html>
<html>
  <head><meta charset="utf-8"><title>TTYF - Authorization complete</title></head>
  <body style="font-family: sans-serif; text-align: center; margin-top: 4em;">
    <h1>Authorization complete</h1>
    <p>Your institution is connected. You can close this window and return to the terminal.</p>
  </body>
</html>
"#;

/// An authorization the CLI is waiting for. Dropping it stops listening.
pub trait PendingAuthorization: Send {
    /// Block until the callback arrived or `timeout` elapsed. Returns `true` on callback.
    fn wait(&self, timeout: Duration) -> bool;

    fn is_complete(&self) -> bool;
}

/// Starts listening for an authorization callback.
pub trait AuthorizationListener: Send + Sync {
    fn listen(&self) -> io::Result<Box<dyn PendingAuthorization>>;
}

/// Binds a `CallbackServer` on the configured address for every `listen`.
#[derive(Debug, Clone)]
pub struct LocalCallbackListener {
    host: String,
    port: u16,
    poll_interval: Duration,
}

impl LocalCallbackListener {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl AuthorizationListener for LocalCallbackListener {
    fn listen(&self) -> io::Result<Box<dyn PendingAuthorization>> {
        let server = CallbackServer::bind(&self.host, self.port)?.with_poll_interval(self.poll_interval);
        Ok(Box::new(server))
    }
}

/// HTTP server answering the OAuth redirect.
pub struct CallbackServer {
    addr: SocketAddr,
    complete: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    poll_interval: Duration,
}

impl CallbackServer {
    /// Bind and start serving on a background thread. Port 0 picks a free port.
    pub fn bind(host: &str, port: u16) -> io::Result<Self> {
        let listener = TcpListener::bind((host, port))?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;
        debug!("callback server listening on {}", addr);

        let complete = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(AtomicBool::new(false));

        let handle = {
            let complete = Arc::clone(&complete);
            let shutdown = Arc::clone(&shutdown);
            thread::Builder::new()
                .name("ttyf-callback".into())
                .spawn(move || serve(listener, complete, shutdown))?
        };

        Ok(Self {
            addr,
            complete,
            shutdown,
            handle: Some(handle),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop the server thread. Idempotent.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("callback server thread panicked");
            }
            debug!("callback server on {} stopped", self.addr);
        }
    }
}

impl PendingAuthorization for CallbackServer {
    fn wait(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        loop {
            if self.is_complete() {
                return true;
            }
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return false;
            }
            thread::sleep(self.poll_interval.min(timeout - elapsed));
        }
    }

    fn is_complete(&self) -> bool {
        self.complete.load(Ordering::SeqCst)
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn serve(listener: TcpListener, complete: Arc<AtomicBool>, shutdown: Arc<AtomicBool>) {
    while !shutdown.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                debug!("callback connection from {}", peer);
                if let Err(e) = handle_connection(stream, &complete) {
                    warn!("callback connection failed: {}", e);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
            Err(e) => {
                warn!("callback accept failed: {}", e);
                thread::sleep(ACCEPT_POLL);
            }
        }
    }
}

fn handle_connection(mut stream: TcpStream, complete: &AtomicBool) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(CLIENT_READ_TIMEOUT))?;

    let response = match read_request(&mut stream) {
        None => return Ok(()),
        Some(Err(e)) => {
            debug!("bad callback request: {}", e);
            HttpResponse::empty(400)
        }
        Some(Ok(request)) => match (request.method.as_str(), request.path()) {
            ("GET", CALLBACK_PATH) => {
                complete.store(true, Ordering::SeqCst);
                debug!("authorization callback received: {:?}", request.query());
                HttpResponse::html(200, AUTHORIZATION_COMPLETE)
            }
            (_, CALLBACK_PATH) => HttpResponse::empty(405),
            _ => HttpResponse::empty(404),
        },
    };
    write_response(&mut stream, &response);
    Ok(())
}

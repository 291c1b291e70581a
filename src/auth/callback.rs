use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use tiny_http::{Header, Response, Server};
use url::Url;

const POLL_INTERVAL: Duration = Duration::from_secs(1);
const ACCEPT_TIMEOUT: Duration = Duration::from_millis(500);

const CONFIRMATION_PAGE: &str = "<html><body>\
<h2>Authorization received.</h2>\
<p>You can close this tab and return to the terminal.</p>\
</body></html>";

/// Local HTTP server that catches the authorization redirect and hands the
/// `oauth_verifier` query value to the main flow.
///
/// The accept loop runs on a background thread; the main flow polls
/// [`wait_for_verifier`](Self::wait_for_verifier). Only the first captured
/// value is kept. Dropping the listener stops the thread and closes the
/// socket.
pub struct CallbackListener {
    port: u16,
    verifier: Arc<OnceLock<String>>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl CallbackListener {
    /// Bind the callback server and start serving. Binding happens before
    /// the authorize URL is shown to the user, so the redirect cannot race
    /// the listener. Port 0 asks the OS for a free port.
    pub fn bind(port: u16) -> Result<Self> {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
        let server = Server::http(addr)
            .map_err(|e| anyhow!("Failed to bind callback server on {addr}: {e:?}"))?;
        let port = server.server_addr().port();

        let verifier = Arc::new(OnceLock::new());
        let stop = Arc::new(AtomicBool::new(false));
        let worker = thread::spawn({
            let verifier = Arc::clone(&verifier);
            let stop = Arc::clone(&stop);
            move || serve(server, port, &verifier, &stop)
        });

        Ok(Self {
            port,
            verifier,
            stop,
            worker: Some(worker),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Poll once per second until a verifier shows up or `timeout` passes.
    pub fn wait_for_verifier(&self, timeout: Duration) -> Option<String> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(code) = self.verifier.get() {
                return Some(code.clone());
            }
            if Instant::now() >= deadline {
                return None;
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Stop the accept loop and join the thread. Idempotent.
    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for CallbackListener {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn serve(server: Server, port: u16, verifier: &OnceLock<String>, stop: &AtomicBool) {
    while !stop.load(Ordering::SeqCst) {
        let request = match server.recv_timeout(ACCEPT_TIMEOUT) {
            Ok(Some(request)) => request,
            Ok(None) => continue,
            Err(e) => {
                log::warn!("callback server accept failed: {e}");
                break;
            }
        };

        // request.url() is path+query, e.g. "/?oauth_verifier=...". Anything
        // without a verifier gets a bland acknowledgment and the wait goes on.
        let full = format!("http://localhost:{port}{}", request.url());
        let code = Url::parse(&full).ok().and_then(|parsed| {
            parsed
                .query_pairs()
                .find(|(key, value)| key == "oauth_verifier" && !value.is_empty())
                .map(|(_, value)| value.into_owned())
        });

        match code {
            Some(code) => {
                // First capture wins; later redirects still get the page.
                let _ = verifier.set(code);
                let mut response = Response::from_string(CONFIRMATION_PAGE);
                if let Ok(header) =
                    Header::from_bytes(&b"Content-Type"[..], &b"text/html; charset=utf-8"[..])
                {
                    response = response.with_header(header);
                }
                let _ = request.respond(response);
            }
            None => {
                let _ = request.respond(Response::from_string("Waiting for authorization..."));
            }
        }
    }
}

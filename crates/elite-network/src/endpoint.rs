use std::io::{self, Read};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use elite_utils::{DriverError, DriverResult, spawn_named};
use tracing::{debug, trace, warn};

use crate::socket_opts::apply_standard_socket_options;

/// How long the accept loop sleeps between polls of a non-blocking listener
/// while waiting for either a connection or a teardown request.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// A TCP listener that accepts one peer at a time and hands each freshly
/// accepted stream to a connect callback.
///
/// At most one robot-side client is ever meaningfully connected to a given
/// listening port (shared by C2–C5). `FramedEndpoint` itself does not
/// decide what to do with a superseding connection — that's left to the
/// callback, which typically closes whatever peer it already holds before
/// adopting the new one.
pub struct FramedEndpoint {
    shutdown: Arc<AtomicBool>,
    accept_thread: Option<JoinHandle<()>>,
}

impl FramedEndpoint {
    /// Binds `port` and starts the accept loop on a named background
    /// thread. Bind failure is fatal and returned synchronously.
    pub fn bind<F>(port: u16, channel_name: &'static str, on_connect: F) -> DriverResult<Self>
    where
        F: Fn(TcpStream, SocketAddr) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind(("0.0.0.0", port)).map_err(|e| DriverError::SocketFail(format!("bind :{port} ({channel_name}): {e}")))?;
        listener.set_nonblocking(true).map_err(|e| DriverError::SocketFail(e.to_string()))?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let thread_name = format!("elite-{channel_name}-accept");
        let accept_thread = spawn_named(&thread_name, move || accept_loop(listener, &shutdown_clone, &on_connect, channel_name))
            .map_err(|e| DriverError::SocketFail(e.to_string()))?;

        Ok(Self { shutdown, accept_thread: Some(accept_thread) })
    }
}

impl Drop for FramedEndpoint {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.accept_thread.take() {
            let _ = handle.join();
        }
    }
}

fn accept_loop<F>(listener: TcpListener, shutdown: &AtomicBool, on_connect: &F, channel_name: &str)
where
    F: Fn(TcpStream, SocketAddr) + Send + Sync + 'static,
{
    loop {
        if shutdown.load(Ordering::SeqCst) {
            debug!(channel = channel_name, "accept loop stopping");
            return;
        }
        match listener.accept() {
            Ok((stream, addr)) => {
                if let Err(e) = apply_standard_socket_options(&stream) {
                    warn!(channel = channel_name, peer = %addr, error = %e, "failed to set socket options on accepted stream");
                }
                debug!(channel = channel_name, peer = %addr, "accepted connection");
                on_connect(stream, addr);
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                std::thread::sleep(ACCEPT_POLL_INTERVAL);
            }
            Err(e) => {
                warn!(channel = channel_name, error = %e, "accept failed, retrying");
                std::thread::sleep(ACCEPT_POLL_INTERVAL);
            }
        }
    }
}

/// Runs a blocking read loop over `stream` that discards any bytes it
/// receives and calls `on_disconnect` exactly once when the peer closes the
/// connection or the socket errors, then returns.
///
/// This read exists only to detect connection loss, not to consume
/// application data — C3 and C5 never expect inbound bytes from the robot.
pub fn run_liveness_loop(mut stream: TcpStream, channel_name: &'static str, on_disconnect: impl FnOnce() + Send + 'static) -> io::Result<JoinHandle<()>> {
    spawn_named(&format!("elite-{channel_name}-liveness"), move || {
        let mut buf = [0_u8; 4];
        loop {
            match stream.read(&mut buf) {
                Ok(0) => {
                    trace!(channel = channel_name, "peer closed connection");
                    break;
                }
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    trace!(channel = channel_name, error = %e, "liveness read failed");
                    break;
                }
            }
        }
        on_disconnect();
    })
}

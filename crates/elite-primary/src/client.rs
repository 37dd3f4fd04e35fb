use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use elite_network::apply_standard_socket_options;
use elite_utils::{DriverError, DriverResult, spawn_named};
use tracing::{debug, trace, warn};

use crate::frame::{ROBOT_STATE_MSG_TYPE, read_message, split_sub_packages};
use crate::waiter::WaiterRegistry;

/// Conventional robot primary interface port.
pub const PRIMARY_PORT: u16 = 30001;

/// Budget for the initial TCP handshake; a handshake that doesn't
/// complete in time reports a connect failure rather than blocking
/// indefinitely.
const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

/// Client for the robot's primary telemetry/control port.
///
/// Used two ways by the facade: to upload the external-control script in
/// headless mode (in place of the separate script-sender channel), and to
/// let callers wait on a specific robot-state sub-package by type.
pub struct PrimaryClient {
    write_stream: Mutex<Option<TcpStream>>,
    waiters: Arc<WaiterRegistry>,
    shutdown: Arc<AtomicBool>,
    recv_thread: Mutex<Option<JoinHandle<()>>>,
}

impl PrimaryClient {
    /// Connects to the robot's primary port at `robot_ip:30001` and starts
    /// the background receive/demultiplex loop.
    pub fn connect(robot_ip: &str) -> DriverResult<Self> {
        Self::connect_to(robot_ip, PRIMARY_PORT)
    }

    /// Same as [`Self::connect`] against an arbitrary port, for tests that
    /// stand in a loopback listener instead of a real robot.
    pub fn connect_to(robot_ip: &str, port: u16) -> DriverResult<Self> {
        let addr = (robot_ip, port)
            .to_socket_addrs()
            .map_err(|e| DriverError::SocketConnectFail { addr: robot_ip.to_owned(), reason: e.to_string() })?
            .next()
            .ok_or_else(|| DriverError::SocketConnectFail { addr: robot_ip.to_owned(), reason: "no address resolved".into() })?;

        let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)
            .map_err(|e| DriverError::SocketConnectFail { addr: addr.to_string(), reason: e.to_string() })?;
        apply_standard_socket_options(&stream).map_err(|e| DriverError::SocketFail(e.to_string()))?;

        let read_stream = stream.try_clone().map_err(|e| DriverError::SocketFail(e.to_string()))?;
        let waiters = Arc::new(WaiterRegistry::new());
        let shutdown = Arc::new(AtomicBool::new(false));

        let waiters_clone = waiters.clone();
        let shutdown_clone = shutdown.clone();
        let recv_thread = spawn_named("elite-primary-recv", move || recv_loop(read_stream, &waiters_clone, &shutdown_clone))
            .map_err(|e| DriverError::SocketFail(e.to_string()))?;

        debug!(peer = %addr, "primary port connected");
        Ok(Self { write_stream: Mutex::new(Some(stream)), waiters, shutdown, recv_thread: Mutex::new(Some(recv_thread)) })
    }

    /// Uploads a script body, used in headless mode instead of the
    /// request/response script sender channel. A trailing newline is always
    /// appended, matching the robot controller's line-based script reader.
    pub fn send_script(&self, script: &str) -> bool {
        let mut guard = self.write_stream.lock().unwrap();
        let Some(stream) = guard.as_mut() else { return false };
        let result = stream.write_all(script.as_bytes()).and_then(|()| stream.write_all(b"\n"));
        if let Err(e) = result {
            warn!(error = %e, "failed to send script over primary port");
            *guard = None;
            return false;
        }
        true
    }

    /// Blocks up to `timeout` for a fresh delivery of robot-state
    /// sub-package `sub_type`, returning its raw payload.
    pub fn get_package(&self, sub_type: u8, timeout: Duration) -> Option<Vec<u8>> {
        self.waiters.wait_for(sub_type, timeout)
    }

    pub fn is_connected(&self) -> bool {
        self.write_stream.lock().unwrap().is_some()
    }

    pub fn disconnect(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(stream) = self.write_stream.lock().unwrap().take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
        if let Some(handle) = self.recv_thread.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PrimaryClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn recv_loop(mut stream: TcpStream, waiters: &WaiterRegistry, shutdown: &AtomicBool) {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            return;
        }
        match read_message(&mut stream) {
            Ok(Some((msg_type, body))) => {
                if msg_type == ROBOT_STATE_MSG_TYPE {
                    for (sub_type, sub_payload) in split_sub_packages(&body) {
                        waiters.deliver(sub_type, sub_payload);
                    }
                } else {
                    trace!(msg_type, len = body.len(), "ignoring non robot-state primary message");
                }
            }
            Ok(None) => {
                debug!("primary port closed by peer");
                return;
            }
            Err(e) => {
                warn!(error = %e, "primary recv loop error");
                return;
            }
        }
    }
}

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::{Arc, Mutex};

use elite_network::FramedEndpoint;
use elite_utils::{DriverResult, POS_ZOOM_RATIO, TIME_ZOOM_RATIO, spawn_named};
use tracing::{debug, trace, warn};

/// Frame length in `i32` words for outbound waypoints (spec.md §6.2). The
/// inbound result frame is a single `i32`.
pub const FRAME_LEN: usize = 21;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum MotionType {
    Joint = 0,
    Cartesian = 1,
    Spline = 2,
}

/// Decoded inbound result frame. An unrecognized code is logged and
/// treated as [`MotionResult::Failure`] rather than panicking — the
/// channel has no way to ask the robot to resend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotionResult {
    Success,
    Canceled,
    Failure,
}

impl MotionResult {
    fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Self::Success,
            1 => Self::Canceled,
            2 => Self::Failure,
            other => {
                warn!(raw = other, "unrecognized trajectory motion result, treating as failure");
                Self::Failure
            }
        }
    }
}

type ResultCallback = dyn FnMut(MotionResult) + Send;

/// The trajectory channel (C4): outbound 21×`i32` waypoint frames,
/// inbound 1×`i32` motion-result frames.
///
/// Per spec.md §5, the result callback runs directly on the receive
/// thread and must not perform blocking work; callers that need to do
/// more should hand the result off to a queue instead of acting on it
/// inline (spec.md §9 Open Question — this crate documents the
/// constraint rather than resolving it by adding an internal queue no
/// caller asked for).
pub struct TrajectoryChannel {
    client: Arc<Mutex<Option<TcpStream>>>,
    write_lock: Mutex<()>,
    result_callback: Arc<Mutex<Option<Box<ResultCallback>>>>,
    _endpoint: FramedEndpoint,
}

impl TrajectoryChannel {
    pub fn bind(port: u16) -> DriverResult<Self> {
        let client: Arc<Mutex<Option<TcpStream>>> = Arc::new(Mutex::new(None));
        let result_callback: Arc<Mutex<Option<Box<ResultCallback>>>> = Arc::new(Mutex::new(None));

        let client_for_accept = client.clone();
        let callback_for_accept = result_callback.clone();
        let endpoint = FramedEndpoint::bind(port, "trajectory", move |stream, addr| {
            adopt(&client_for_accept, &callback_for_accept, stream, addr);
        })?;

        Ok(Self { client, write_lock: Mutex::new(()), result_callback, _endpoint: endpoint })
    }

    pub fn is_connected(&self) -> bool {
        self.client.lock().unwrap().is_some()
    }

    /// Registers the callback invoked with each decoded motion result.
    /// Replaces any previously registered callback.
    pub fn set_result_callback<F>(&self, callback: F)
    where
        F: FnMut(MotionResult) + Send + 'static,
    {
        *self.result_callback.lock().unwrap() = Some(Box::new(callback));
    }

    pub fn write_waypoint(&self, point: [f64; 6], time: f64, blend_radius: f64, motion_type: MotionType) -> bool {
        let mut frame = [0_i32; FRAME_LEN];
        for (slot, value) in frame[0..6].iter_mut().zip(point) {
            *slot = elite_utils::scale_to_i32(value, POS_ZOOM_RATIO);
        }
        // slots 6..18 are reserved padding, left at zero.
        frame[18] = elite_utils::scale_to_i32(time, TIME_ZOOM_RATIO);
        frame[19] = elite_utils::scale_to_i32(blend_radius, POS_ZOOM_RATIO);
        frame[20] = motion_type as i32;

        let _serialize = self.write_lock.lock().unwrap();
        let mut guard = self.client.lock().unwrap();
        let Some(stream) = guard.as_mut() else { return false };
        let mut bytes = Vec::with_capacity(FRAME_LEN * 4);
        for word in frame {
            bytes.extend_from_slice(&word.to_be_bytes());
        }
        if let Err(e) = stream.write_all(&bytes) {
            warn!(error = %e, "trajectory channel write failed, releasing client");
            *guard = None;
            return false;
        }
        true
    }
}

fn adopt(client: &Arc<Mutex<Option<TcpStream>>>, callback: &Arc<Mutex<Option<Box<ResultCallback>>>>, stream: TcpStream, addr: SocketAddr) {
    let write_clone = stream.try_clone().ok();
    {
        let mut guard = client.lock().unwrap();
        if let Some(prior) = guard.take() {
            let _ = prior.shutdown(std::net::Shutdown::Both);
        }
        *guard = write_clone;
    }
    debug!(peer = %addr, "trajectory channel client adopted");

    let client_for_recv = client.clone();
    let callback_for_recv = callback.clone();
    if let Err(e) = spawn_named("elite-trajectory-recv", move || recv_loop(stream, &client_for_recv, &callback_for_recv)) {
        warn!(error = %e, "failed to start trajectory channel receive loop");
    }
}

fn recv_loop(mut stream: TcpStream, client: &Mutex<Option<TcpStream>>, callback: &Mutex<Option<Box<ResultCallback>>>) {
    loop {
        let mut buf = [0_u8; 4];
        match stream.read_exact(&mut buf) {
            Ok(()) => {
                let result = MotionResult::from_raw(i32::from_be_bytes(buf));
                trace!(?result, "trajectory motion result received");
                if let Some(cb) = callback.lock().unwrap().as_mut() {
                    cb(result);
                }
            }
            Err(e) => {
                debug!(error = %e, "trajectory channel read ended, releasing client");
                *client.lock().unwrap() = None;
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::time::Duration;

    fn free_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        port
    }

    #[test]
    fn write_waypoint_encodes_fields() {
        let port = free_port();
        let channel = TrajectoryChannel::bind(port).unwrap();
        let mut client = TcpStream::connect(("127.0.0.1", port)).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        assert!(channel.write_waypoint([1.0, 0.0, 0.0, 0.0, 0.0, 0.0], 2.0, 0.01, MotionType::Joint));

        let mut buf = [0_u8; FRAME_LEN * 4];
        client.read_exact(&mut buf).unwrap();
        let words: Vec<i32> = buf.chunks_exact(4).map(|c| i32::from_be_bytes(c.try_into().unwrap())).collect();
        assert_eq!(words[0], 100_000);
        assert_eq!(words[18], 2000);
        assert_eq!(words[19], 1000);
        assert_eq!(words[20], MotionType::Joint as i32);
    }

    #[test]
    fn result_callback_fires_on_inbound_frame_scenario_3() {
        let port = free_port();
        let channel = TrajectoryChannel::bind(port).unwrap();
        let (tx, rx) = mpsc::channel();
        channel.set_result_callback(move |result| {
            let _ = tx.send(result);
        });

        let mut client = TcpStream::connect(("127.0.0.1", port)).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        client.write_all(&0_i32.to_be_bytes()).unwrap();

        let result = rx.recv_timeout(Duration::from_millis(50)).expect("callback should fire within 50ms");
        assert_eq!(result, MotionResult::Success);
    }

    #[test]
    fn disconnect_releases_client() {
        let port = free_port();
        let channel = TrajectoryChannel::bind(port).unwrap();
        let client = TcpStream::connect(("127.0.0.1", port)).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        assert!(channel.is_connected());

        drop(client);
        std::thread::sleep(Duration::from_millis(80));
        assert!(!channel.is_connected());
    }
}

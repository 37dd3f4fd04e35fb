use std::io::Write;
use std::net::{SocketAddr, TcpStream};
use std::sync::{Arc, Mutex};

use elite_network::{FramedEndpoint, run_liveness_loop};
use elite_utils::{DriverResult, POS_ZOOM_RATIO, scale_to_i32};
use tracing::{debug, warn};

/// Frame length in `i32` words (spec.md §6.2).
pub const FRAME_LEN: usize = 8;

/// Control mode tag carried in the last slot of every reverse frame.
/// Ordering follows spec.md §3's listing. The numeric tag values are this
/// crate's own contract with its script template (kept in sync with
/// `resources/external_control.script.template`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum ControlMode {
    Idle = 0,
    Stopped = 1,
    Servoj = 2,
    Speedj = 3,
    Speedl = 4,
    Trajectory = 5,
    Forward = 6,
}

/// Action selector for a [`ControlMode::Trajectory`] frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum TrajectoryControlAction {
    Noop = 0,
    Start = 1,
    Cancel = 2,
}

/// The reverse channel (C3): fixed 8×`i32` command frames carrying servo
/// setpoints, stop, and trajectory start/cancel actions.
///
/// One live peer at a time, same supersession contract as every other
/// listener in this driver (spec.md Invariant 1). The accept callback
/// below never holds a reference back to `ReverseChannel` itself — only
/// to the `client` socket slot — avoiding the endpoint/owner ownership
/// cycle spec.md §9 calls out.
pub struct ReverseChannel {
    client: Arc<Mutex<Option<TcpStream>>>,
    write_lock: Mutex<()>,
    _endpoint: FramedEndpoint,
}

impl ReverseChannel {
    /// Binds the reverse port and starts accepting. Send calls are no-ops
    /// (return `false`) until the robot-side script connects.
    pub fn bind(port: u16) -> DriverResult<Self> {
        let client: Arc<Mutex<Option<TcpStream>>> = Arc::new(Mutex::new(None));
        let client_for_accept = client.clone();
        let endpoint = FramedEndpoint::bind(port, "reverse", move |stream, addr| {
            adopt(&client_for_accept, stream, addr);
        })?;
        Ok(Self { client, write_lock: Mutex::new(()), _endpoint: endpoint })
    }

    pub fn is_connected(&self) -> bool {
        self.client.lock().unwrap().is_some()
    }

    /// Sends a servoj/speedj/speedl/idle setpoint. `values` is `None` only
    /// for [`ControlMode::Idle`]/[`ControlMode::Stopped`], which carry a
    /// zero payload (spec.md §4.3).
    pub fn write_joint_command(&self, values: Option<[f64; 6]>, mode: ControlMode, read_timeout_ms: i32) -> bool {
        let mut frame = [0_i32; FRAME_LEN];
        frame[0] = read_timeout_ms;
        if let Some(values) = values {
            for (slot, value) in frame[1..7].iter_mut().zip(values) {
                *slot = scale_to_i32(value, POS_ZOOM_RATIO);
            }
        }
        frame[7] = mode as i32;
        self.send_frame(&frame)
    }

    pub fn write_trajectory_control(&self, action: TrajectoryControlAction, point_count: i32, read_timeout_ms: i32) -> bool {
        let mut frame = [0_i32; FRAME_LEN];
        frame[0] = read_timeout_ms;
        frame[1] = action as i32;
        frame[2] = point_count;
        frame[7] = ControlMode::Trajectory as i32;
        self.send_frame(&frame)
    }

    pub fn stop_control(&self) -> bool {
        let mut frame = [0_i32; FRAME_LEN];
        frame[7] = ControlMode::Stopped as i32;
        self.send_frame(&frame)
    }

    fn send_frame(&self, frame: &[i32; FRAME_LEN]) -> bool {
        let _serialize = self.write_lock.lock().unwrap();
        let mut guard = self.client.lock().unwrap();
        let Some(stream) = guard.as_mut() else { return false };
        let mut bytes = Vec::with_capacity(FRAME_LEN * 4);
        for word in frame {
            bytes.extend_from_slice(&word.to_be_bytes());
        }
        if let Err(e) = stream.write_all(&bytes) {
            warn!(error = %e, "reverse channel write failed, releasing client");
            *guard = None;
            return false;
        }
        true
    }
}

fn adopt(client: &Arc<Mutex<Option<TcpStream>>>, stream: TcpStream, addr: SocketAddr) {
    let write_clone = stream.try_clone().ok();
    {
        let mut guard = client.lock().unwrap();
        if let Some(prior) = guard.take() {
            let _ = prior.shutdown(std::net::Shutdown::Both);
        }
        *guard = write_clone;
    }
    debug!(peer = %addr, "reverse channel client adopted");

    let client_for_disconnect = client.clone();
    if let Err(e) = run_liveness_loop(stream, "reverse", move || {
        let mut guard = client_for_disconnect.lock().unwrap();
        *guard = None;
    }) {
        warn!(error = %e, "failed to start reverse channel liveness loop");
    }
}

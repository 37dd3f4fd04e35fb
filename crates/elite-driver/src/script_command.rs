use std::io::Write;
use std::net::{SocketAddr, TcpStream};
use std::sync::{Arc, Mutex};

use elite_network::{FramedEndpoint, run_liveness_loop};
use elite_utils::{COMMON_ZOOM_RATIO, DriverResult, scale_to_i32};
use tracing::{debug, warn};

/// Frame length in `i32` words (spec.md §6.2), sized for the widest
/// payload (`START_FORCE_MODE`'s 6+6+6+1+6 = 25 slots plus the tag).
pub const FRAME_LEN: usize = 26;

/// Command tag carried in slot 0 of every script-command frame
/// (spec.md §4.5).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum CommandTag {
    ZeroFtSensor = 0,
    SetPayload = 1,
    SetToolVoltage = 2,
    StartForceMode = 3,
    EndForceMode = 4,
}

/// The script-command channel (C5): 26×`i32` frames for non-servo
/// side-band commands — zeroing the F/T sensor, updating the payload,
/// setting tool voltage, and entering/exiting force mode.
pub struct ScriptCommandChannel {
    client: Arc<Mutex<Option<TcpStream>>>,
    write_lock: Mutex<()>,
    _endpoint: FramedEndpoint,
}

impl ScriptCommandChannel {
    pub fn bind(port: u16) -> DriverResult<Self> {
        let client: Arc<Mutex<Option<TcpStream>>> = Arc::new(Mutex::new(None));
        let client_for_accept = client.clone();
        let endpoint = FramedEndpoint::bind(port, "script-command", move |stream, addr| {
            adopt(&client_for_accept, stream, addr);
        })?;
        Ok(Self { client, write_lock: Mutex::new(()), _endpoint: endpoint })
    }

    pub fn is_connected(&self) -> bool {
        self.client.lock().unwrap().is_some()
    }

    pub fn zero_ft_sensor(&self) -> bool {
        let mut frame = [0_i32; FRAME_LEN];
        frame[0] = CommandTag::ZeroFtSensor as i32;
        self.send_frame(&frame)
    }

    pub fn set_payload(&self, mass: f64, cog: [f64; 3]) -> bool {
        let mut frame = [0_i32; FRAME_LEN];
        frame[0] = CommandTag::SetPayload as i32;
        frame[1] = scale_to_i32(mass, COMMON_ZOOM_RATIO);
        for (slot, value) in frame[2..5].iter_mut().zip(cog) {
            *slot = scale_to_i32(value, COMMON_ZOOM_RATIO);
        }
        self.send_frame(&frame)
    }

    pub fn set_tool_voltage(&self, voltage_enum: i32) -> bool {
        let mut frame = [0_i32; FRAME_LEN];
        frame[0] = CommandTag::SetToolVoltage as i32;
        frame[1] = scale_to_i32(f64::from(voltage_enum), COMMON_ZOOM_RATIO);
        self.send_frame(&frame)
    }

    /// `selection` marks which of the 6 task-frame axes are
    /// force-compliant; encoded as 0/1 (spec.md §4.5).
    pub fn start_force_mode(&self, task_frame: [f64; 6], selection: [bool; 6], wrench: [f64; 6], mode: i32, limits: [f64; 6]) -> bool {
        let mut frame = [0_i32; FRAME_LEN];
        frame[0] = CommandTag::StartForceMode as i32;
        for (slot, value) in frame[1..7].iter_mut().zip(task_frame) {
            *slot = scale_to_i32(value, COMMON_ZOOM_RATIO);
        }
        for (slot, flag) in frame[7..13].iter_mut().zip(selection) {
            *slot = i32::from(flag);
        }
        for (slot, value) in frame[13..19].iter_mut().zip(wrench) {
            *slot = scale_to_i32(value, COMMON_ZOOM_RATIO);
        }
        frame[19] = mode;
        for (slot, value) in frame[20..26].iter_mut().zip(limits) {
            *slot = scale_to_i32(value, COMMON_ZOOM_RATIO);
        }
        self.send_frame(&frame)
    }

    pub fn end_force_mode(&self) -> bool {
        let mut frame = [0_i32; FRAME_LEN];
        frame[0] = CommandTag::EndForceMode as i32;
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
            warn!(error = %e, "script-command channel write failed, releasing client");
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
    debug!(peer = %addr, "script-command channel client adopted");

    let client_for_disconnect = client.clone();
    if let Err(e) = run_liveness_loop(stream, "script-command", move || {
        let mut guard = client_for_disconnect.lock().unwrap();
        *guard = None;
    }) {
        warn!(error = %e, "failed to start script-command channel liveness loop");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;
    use std::time::Duration;

    fn free_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        port
    }

    fn read_frame(client: &mut TcpStream) -> Vec<i32> {
        let mut buf = [0_u8; FRAME_LEN * 4];
        client.read_exact(&mut buf).unwrap();
        buf.chunks_exact(4).map(|c| i32::from_be_bytes(c.try_into().unwrap())).collect()
    }

    #[test]
    fn zero_ft_sensor_is_tag_only() {
        let port = free_port();
        let channel = ScriptCommandChannel::bind(port).unwrap();
        let mut client = TcpStream::connect(("127.0.0.1", port)).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        assert!(channel.zero_ft_sensor());
        let words = read_frame(&mut client);
        assert_eq!(words[0], CommandTag::ZeroFtSensor as i32);
        assert!(words[1..].iter().all(|&w| w == 0));
    }

    #[test]
    fn set_payload_encodes_mass_and_cog() {
        let port = free_port();
        let channel = ScriptCommandChannel::bind(port).unwrap();
        let mut client = TcpStream::connect(("127.0.0.1", port)).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        assert!(channel.set_payload(1.5, [0.01, 0.0, 0.02]));
        let words = read_frame(&mut client);
        assert_eq!(words[0], CommandTag::SetPayload as i32);
        assert_eq!(words[1], 1_500_000);
        assert_eq!(words[2], 10_000);
        assert_eq!(words[3], 0);
        assert_eq!(words[4], 20_000);
    }

    #[test]
    fn start_force_mode_encodes_all_fields() {
        let port = free_port();
        let channel = ScriptCommandChannel::bind(port).unwrap();
        let mut client = TcpStream::connect(("127.0.0.1", port)).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        let task_frame = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let selection = [false, false, true, false, false, false];
        let wrench = [0.0, 0.0, 10.0, 0.0, 0.0, 0.0];
        let limits = [0.0, 0.0, 0.05, 0.0, 0.0, 0.0];
        assert!(channel.start_force_mode(task_frame, selection, wrench, 2, limits));

        let words = read_frame(&mut client);
        assert_eq!(words[0], CommandTag::StartForceMode as i32);
        assert_eq!(&words[7..13], [0, 0, 1, 0, 0, 0]);
        assert_eq!(words[15], 10_000_000);
        assert_eq!(words[19], 2);
        assert_eq!(words[22], 50_000);
    }

    #[test]
    fn end_force_mode_is_tag_only() {
        let port = free_port();
        let channel = ScriptCommandChannel::bind(port).unwrap();
        let mut client = TcpStream::connect(("127.0.0.1", port)).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        assert!(channel.end_force_mode());
        let words = read_frame(&mut client);
        assert_eq!(words[0], CommandTag::EndForceMode as i32);
        assert!(words[1..].iter().all(|&w| w == 0));
    }

    #[test]
    fn send_fails_with_no_client_connected() {
        let port = free_port();
        let channel = ScriptCommandChannel::bind(port).unwrap();
        assert!(!channel.zero_ft_sensor());
    }
}

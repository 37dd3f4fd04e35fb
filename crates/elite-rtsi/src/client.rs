use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Mutex;
use std::time::Duration;

use elite_network::apply_standard_socket_options;
use elite_utils::{DriverError, DriverResult};
use tracing::{debug, trace, warn};

use crate::message::{HEADER_SIZE, PackageType, encode_frame};
use crate::recipe::{ElementType, RtsiRecipe};

/// Conventional RTSI pub/sub port.
pub const RTSI_PORT: u16 = 30004;

const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

/// Session lifecycle (spec.md §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    Started,
    Stopped,
}

pub struct ControllerVersion {
    pub major: u32,
    pub minor: u32,
    pub bugfix: u32,
    pub build: u32,
}

/// Thin synchronous wrapper over the RTSI wire protocol: version
/// negotiation, recipe setup, session start/pause, and frame-level
/// send/receive. The streaming poll loop lives one layer up in
/// [`crate::io_interface::RtsiIoInterface`]; this type only speaks frames.
pub struct RtsiClient {
    stream: Mutex<TcpStream>,
    state: Mutex<SessionState>,
}

impl RtsiClient {
    pub fn connect(robot_ip: &str) -> DriverResult<Self> {
        let addr = (robot_ip, RTSI_PORT)
            .to_socket_addrs()
            .map_err(|e| DriverError::SocketConnectFail { addr: robot_ip.to_owned(), reason: e.to_string() })?
            .next()
            .ok_or_else(|| DriverError::SocketConnectFail { addr: robot_ip.to_owned(), reason: "no address resolved".into() })?;
        Self::connect_addr(addr)
    }

    pub fn connect_to(robot_ip: &str, port: u16) -> DriverResult<Self> {
        let addr = (robot_ip, port)
            .to_socket_addrs()
            .map_err(|e| DriverError::SocketConnectFail { addr: robot_ip.to_owned(), reason: e.to_string() })?
            .next()
            .ok_or_else(|| DriverError::SocketConnectFail { addr: robot_ip.to_owned(), reason: "no address resolved".into() })?;
        Self::connect_addr(addr)
    }

    fn connect_addr(addr: std::net::SocketAddr) -> DriverResult<Self> {
        let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)
            .map_err(|e| DriverError::SocketConnectFail { addr: addr.to_string(), reason: e.to_string() })?;
        apply_standard_socket_options(&stream).map_err(|e| DriverError::SocketFail(e.to_string()))?;
        debug!(peer = %addr, "rtsi connected");
        Ok(Self { stream: Mutex::new(stream), state: Mutex::new(SessionState::Connected) })
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    pub fn negotiate_protocol_version(&self, version: u16) -> DriverResult<bool> {
        let (_, payload) = self.request(PackageType::RequestProtocolVersion, &version.to_be_bytes(), None)?;
        Ok(payload.first().copied().unwrap_or(0) != 0)
    }

    pub fn get_controller_version(&self) -> DriverResult<ControllerVersion> {
        let (_, payload) = self.request(PackageType::GetUrcontrolVersion, &[], None)?;
        if payload.len() < 16 {
            return Err(DriverError::RtsiRecipeParseFail("controller version reply shorter than 16 bytes".into()));
        }
        let word = |i: usize| u32::from_be_bytes(payload[i * 4..i * 4 + 4].try_into().unwrap());
        Ok(ControllerVersion { major: word(0), minor: word(1), bugfix: word(2), build: word(3) })
    }

    pub fn setup_output_recipe(&self, variables: &[String], frequency: f64) -> DriverResult<RtsiRecipe> {
        let mut payload = frequency.to_be_bytes().to_vec();
        payload.extend_from_slice(variables.join(",").as_bytes());
        let (_, reply) = self.request(PackageType::ControlPackageSetupOutputs, &payload, None)?;
        Self::parse_recipe_reply(variables, &reply)
    }

    pub fn setup_input_recipe(&self, variables: &[String]) -> DriverResult<RtsiRecipe> {
        let payload = variables.join(",").into_bytes();
        let (_, reply) = self.request(PackageType::ControlPackageSetupInputs, &payload, None)?;
        Self::parse_recipe_reply(variables, &reply)
    }

    fn parse_recipe_reply(variables: &[String], reply: &[u8]) -> DriverResult<RtsiRecipe> {
        if reply.is_empty() {
            return Err(DriverError::RtsiRecipeParseFail("empty recipe setup reply".into()));
        }
        let id = reply[0];
        let types_csv = std::str::from_utf8(&reply[1..]).map_err(|e| DriverError::RtsiRecipeParseFail(e.to_string()))?;
        let tokens: Vec<&str> = types_csv.split(',').collect();
        if tokens.len() != variables.len() {
            return Err(DriverError::RtsiRecipeParseFail(format!("reply listed {} types for {} requested variables", tokens.len(), variables.len())));
        }
        let mut out = Vec::with_capacity(variables.len());
        for (name, token) in variables.iter().zip(tokens) {
            let Some(ty) = ElementType::from_token(token.trim()) else {
                return Err(DriverError::RtsiUnknownVariableType { variable: name.clone(), type_token: token.to_owned() });
            };
            out.push((name.clone(), ty));
        }
        Ok(RtsiRecipe { id, variables: out })
    }

    pub fn start(&self) -> DriverResult<bool> {
        let (_, payload) = self.request(PackageType::ControlPackageStart, &[], None)?;
        let accepted = payload.first().copied().unwrap_or(0) != 0;
        if accepted {
            *self.state.lock().unwrap() = SessionState::Started;
        }
        Ok(accepted)
    }

    pub fn pause(&self) -> DriverResult<bool> {
        let (_, payload) = self.request(PackageType::ControlPackagePause, &[], None)?;
        let accepted = payload.first().copied().unwrap_or(0) != 0;
        if accepted {
            *self.state.lock().unwrap() = SessionState::Stopped;
        }
        Ok(accepted)
    }

    /// Sends a frame with no reply expected, used for input recipe updates
    /// once streaming has started.
    pub fn send_all(&self, msg_type: PackageType, payload: &[u8]) -> DriverResult<()> {
        let frame = encode_frame(msg_type, payload);
        let mut stream = self.stream.lock().unwrap();
        stream.write_all(&frame).map_err(|e| DriverError::SocketFail(e.to_string()))
    }

    /// Reads one frame with `timeout`, returning `(type, payload)`. A timed
    /// out read is treated as a disconnect rather than waiting
    /// indefinitely for a wedged controller.
    pub fn read_frame(&self, timeout: Duration) -> DriverResult<(u8, Vec<u8>)> {
        let mut stream = self.stream.lock().unwrap();
        stream.set_read_timeout(Some(timeout)).map_err(|e| DriverError::SocketFail(e.to_string()))?;
        Self::read_frame_locked(&mut stream).map_err(|e| DriverError::SocketFail(e.to_string()))
    }

    /// Like [`Self::read_frame`] but returns `Ok(None)` on timeout instead
    /// of erroring, for the io interface's opportunistic "drain to newest"
    /// pass.
    pub fn try_read_frame(&self, timeout: Duration) -> DriverResult<Option<(u8, Vec<u8>)>> {
        let mut stream = self.stream.lock().unwrap();
        stream.set_read_timeout(Some(timeout)).map_err(|e| DriverError::SocketFail(e.to_string()))?;
        match Self::read_frame_locked(&mut stream) {
            Ok(frame) => Ok(Some(frame)),
            Err(e) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => Ok(None),
            Err(e) => Err(DriverError::SocketFail(e.to_string())),
        }
    }

    /// Reads frames until one of type [`PackageType::DataPackage`] arrives,
    /// discarding any other frame type in between (the controller
    /// interleaves `TEXT_MESSAGE` packages with data streaming). When
    /// `read_newest` is set, keeps draining immediately-available data
    /// frames and returns only the last one, logging how many were
    /// discarded — the same effect falls out of repeatedly reading whole
    /// frames off a blocking socket with a shrinking deadline (see
    /// DESIGN.md).
    ///
    /// Returns `Ok(None)` if `budget` elapses with no data frame observed.
    pub fn recv_data_frame(&self, budget: Duration, read_newest: bool) -> DriverResult<Option<Vec<u8>>> {
        // `set_read_timeout` rejects a zero Duration, so the "is anything
        // else already buffered" peek after the first hit uses the
        // smallest representable nonzero timeout instead of a true 0.
        const PEEK: Duration = Duration::from_micros(1);
        let deadline = std::time::Instant::now() + budget;
        let mut latest: Option<Vec<u8>> = None;
        let mut stale_count = 0_u32;
        loop {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() && latest.is_some() {
                break;
            }
            let poll_budget = if latest.is_some() { PEEK } else { remaining.max(PEEK) };
            let Some((msg_type, payload)) = self.try_read_frame(poll_budget)? else {
                break;
            };
            if msg_type == PackageType::DataPackage.code() {
                if latest.is_some() {
                    stale_count += 1;
                }
                latest = Some(payload);
                if !read_newest {
                    break;
                }
            } else {
                trace!(msg_type, "discarding non-data rtsi frame while awaiting data package");
            }
        }
        if stale_count > 0 {
            debug!(stale_count, "rtsi read_newest drained stale data frames");
        }
        Ok(latest)
    }

    fn read_frame_locked(stream: &mut TcpStream) -> std::io::Result<(u8, Vec<u8>)> {
        let mut header = [0_u8; HEADER_SIZE];
        stream.read_exact(&mut header)?;
        let total_len = u16::from_be_bytes([header[0], header[1]]) as usize;
        if total_len < HEADER_SIZE {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, format!("rtsi frame length {total_len} shorter than header")));
        }
        let msg_type = header[2];
        let mut payload = vec![0_u8; total_len - HEADER_SIZE];
        stream.read_exact(&mut payload)?;
        Ok((msg_type, payload))
    }

    fn request(&self, msg_type: PackageType, payload: &[u8], timeout: Option<Duration>) -> DriverResult<(u8, Vec<u8>)> {
        let frame = encode_frame(msg_type, payload);
        let mut stream = self.stream.lock().unwrap();
        stream.set_read_timeout(Some(timeout.unwrap_or(CONNECT_TIMEOUT))).map_err(|e| DriverError::SocketFail(e.to_string()))?;
        stream.write_all(&frame).map_err(|e| DriverError::SocketFail(e.to_string()))?;
        Self::read_frame_locked(&mut stream).map_err(|e| DriverError::SocketFail(e.to_string()))
    }

    pub fn disconnect(&self) {
        let mut state = self.state.lock().unwrap();
        if *state == SessionState::Disconnected {
            return;
        }
        if let Ok(stream) = self.stream.lock() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
        *state = SessionState::Disconnected;
    }
}

impl Drop for RtsiClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use elite_utils::{DriverError, DriverResult};
use serde::{Deserialize, Serialize};

use crate::template::ServojParams;

/// Conventional default ports, distinct from each other and from the
/// primary (30001) and RTSI (30004) ports so a default-configured driver
/// and a default-configured robot controller can talk without the caller
/// picking ports by hand.
const DEFAULT_REVERSE_PORT: u16 = 50001;
const DEFAULT_TRAJECTORY_PORT: u16 = 50003;
const DEFAULT_SCRIPT_COMMAND_PORT: u16 = 50004;
const DEFAULT_SCRIPT_SENDER_PORT: u16 = 50002;

/// Everything [`crate::facade::EliteDriver::new`] needs, gathered into one
/// `serde`-deserializable struct per spec.md §4.8 item 1. Constructible
/// literally or loaded from JSON via [`Self::from_file`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub robot_ip: String,
    pub local_ip: String,
    pub script_template_path: PathBuf,
    pub headless: bool,
    pub reverse_port: u16,
    pub trajectory_port: u16,
    pub script_command_port: u16,
    pub script_sender_port: u16,
    pub servoj_time: f64,
    pub servoj_lookahead_time: f64,
    pub servoj_gain: f64,
    /// Deceleration used by the robot-side script when the driver goes
    /// idle or the reverse connection drops; substituted nowhere in the
    /// shipped template today but carried through so a caller's own
    /// template can reference it.
    pub stop_acceleration: f64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            robot_ip: String::new(),
            local_ip: String::new(),
            script_template_path: PathBuf::new(),
            headless: false,
            reverse_port: DEFAULT_REVERSE_PORT,
            trajectory_port: DEFAULT_TRAJECTORY_PORT,
            script_command_port: DEFAULT_SCRIPT_COMMAND_PORT,
            script_sender_port: DEFAULT_SCRIPT_SENDER_PORT,
            servoj_time: 0.008,
            servoj_lookahead_time: 0.08,
            servoj_gain: 300.0,
            stop_acceleration: 4.0,
        }
    }
}

impl DriverConfig {
    /// Loads a configuration from a JSON file. Fields absent from the file
    /// fall back to [`Default::default`], so a caller's config only needs
    /// to name what differs from the defaults.
    pub fn from_file(path: &Path) -> DriverResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| DriverError::FileOpenFail { path: path.to_owned(), source })?;
        Self::from_json(&text).map_err(|e| DriverError::FileOpenFail { path: path.to_owned(), source: std::io::Error::new(std::io::ErrorKind::InvalidData, e) })
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub(crate) fn servoj_params(&self) -> ServojParams {
        ServojParams { time: self.servoj_time, lookahead_time: self.servoj_lookahead_time, gain: self.servoj_gain }
    }
}

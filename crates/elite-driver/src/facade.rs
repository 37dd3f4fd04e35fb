use std::path::Path;
use std::time::Duration;

use elite_primary::PrimaryClient;
use elite_rtsi::IoInterface;
use elite_utils::DriverResult;
use tracing::{info, warn};

use crate::config::DriverConfig;
use crate::reverse::{ControlMode, ReverseChannel, TrajectoryControlAction};
use crate::script_command::ScriptCommandChannel;
use crate::script_sender::ScriptSender;
use crate::template::{TemplateParams, load_template, materialize, wrap_as_program};
use crate::trajectory::{MotionResult, MotionType, TrajectoryChannel};

/// Name the headless script is wrapped under before being sent over the
/// primary port (spec.md §4.8 item 5). Matches the function name the
/// robot controller's external-control support looks for.
const HEADLESS_PROGRAM_NAME: &str = "externalControl";

/// Top-level driver (C8): owns the reverse/trajectory/script-command
/// listeners, the primary client, and — in non-headless mode — the
/// script-sender listener. Constructed once per robot session; `new`
/// performs every step spec.md §4.8 lists, in order, and logs (rather
/// than fails) a primary-connect failure so a caller can still bring the
/// robot side up and retry via [`Self::primary_reconnect`].
pub struct EliteDriver {
    reverse: ReverseChannel,
    trajectory: TrajectoryChannel,
    script_command: ScriptCommandChannel,
    script_sender: Option<ScriptSender>,
    primary: Option<PrimaryClient>,
    config: DriverConfig,
    script: String,
}

impl EliteDriver {
    pub fn new(config: DriverConfig) -> DriverResult<Self> {
        let template = load_template(&config.script_template_path)?;
        let params = TemplateParams {
            server_ip: config.local_ip.clone(),
            reverse_port: config.reverse_port,
            trajectory_port: config.trajectory_port,
            script_command_port: config.script_command_port,
            servoj: config.servoj_params(),
        };
        let script = materialize(&template, &params)?;

        let reverse = ReverseChannel::bind(config.reverse_port)?;
        let trajectory = TrajectoryChannel::bind(config.trajectory_port)?;
        let script_command = ScriptCommandChannel::bind(config.script_command_port)?;

        let primary = match PrimaryClient::connect(&config.robot_ip) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(error = %e, "primary port connect failed at construction, continuing without it");
                None
            }
        };

        let script_sender = if config.headless {
            if let Some(client) = &primary {
                let program = wrap_as_program(HEADLESS_PROGRAM_NAME, &script);
                if !client.send_script(&program) {
                    warn!("headless script send over primary port failed at construction");
                }
            } else {
                warn!("headless mode requested but primary port is not connected, script was not sent");
            }
            None
        } else {
            Some(ScriptSender::bind(config.script_sender_port, script.clone())?)
        };

        info!(robot_ip = %config.robot_ip, headless = config.headless, "elite driver constructed");
        Ok(Self { reverse, trajectory, script_command, script_sender, primary, config, script })
    }

    // -- C3 Reverse channel --

    pub fn write_joint_command(&self, values: Option<[f64; 6]>, mode: ControlMode, read_timeout_ms: i32) -> bool {
        self.reverse.write_joint_command(values, mode, read_timeout_ms)
    }

    pub fn write_trajectory_control(&self, action: TrajectoryControlAction, point_count: i32, read_timeout_ms: i32) -> bool {
        self.reverse.write_trajectory_control(action, point_count, read_timeout_ms)
    }

    pub fn stop_control(&self) -> bool {
        self.reverse.stop_control()
    }

    // -- C4 Trajectory channel --

    pub fn write_waypoint(&self, point: [f64; 6], time: f64, blend_radius: f64, motion_type: MotionType) -> bool {
        self.trajectory.write_waypoint(point, time, blend_radius, motion_type)
    }

    /// See [`TrajectoryChannel::set_result_callback`]: the callback runs on
    /// the trajectory receive thread and must not block.
    pub fn set_trajectory_result_callback<F>(&self, callback: F)
    where
        F: FnMut(MotionResult) + Send + 'static,
    {
        self.trajectory.set_result_callback(callback);
    }

    // -- C5 Script-command channel --

    pub fn zero_ft_sensor(&self) -> bool {
        self.script_command.zero_ft_sensor()
    }

    pub fn set_payload(&self, mass: f64, cog: [f64; 3]) -> bool {
        self.script_command.set_payload(mass, cog)
    }

    pub fn set_tool_voltage(&self, voltage_enum: i32) -> bool {
        self.script_command.set_tool_voltage(voltage_enum)
    }

    pub fn start_force_mode(&self, task_frame: [f64; 6], selection: [bool; 6], wrench: [f64; 6], mode: i32, limits: [f64; 6]) -> bool {
        self.script_command.start_force_mode(task_frame, selection, wrench, mode, limits)
    }

    pub fn end_force_mode(&self) -> bool {
        self.script_command.end_force_mode()
    }

    // -- C6 Primary client / C8 extras --

    pub fn send_script(&self, script: &str) -> bool {
        self.primary.as_ref().is_some_and(|client| client.send_script(script))
    }

    /// Wraps and sends the driver's own materialized script over the
    /// primary port, regardless of `headless` — used when a caller wants
    /// to (re-)push the control program without restarting the driver.
    pub fn send_external_control_script(&self) -> bool {
        let program = wrap_as_program(HEADLESS_PROGRAM_NAME, &self.script);
        self.send_script(&program)
    }

    pub fn get_primary_package(&self, sub_type: u8, timeout: Duration) -> Option<Vec<u8>> {
        self.primary.as_ref().and_then(|client| client.get_package(sub_type, timeout))
    }

    /// Drops and re-establishes the primary port connection. Used after
    /// `is_robot_connected()` reports false on the primary side (spec.md
    /// §7 "User-visible behavior").
    pub fn primary_reconnect(&mut self) -> bool {
        if let Some(client) = self.primary.take() {
            client.disconnect();
        }
        match PrimaryClient::connect(&self.config.robot_ip) {
            Ok(client) => {
                self.primary = Some(client);
                true
            }
            Err(e) => {
                warn!(error = %e, "primary reconnect failed");
                false
            }
        }
    }

    /// `true` iff both the reverse and trajectory channels have a live
    /// robot-side peer (spec.md §4.8: `C3.connected ∧ C4.connected`).
    pub fn is_robot_connected(&self) -> bool {
        self.reverse.is_connected() && self.trajectory.is_connected()
    }

    pub fn is_primary_connected(&self) -> bool {
        self.primary.as_ref().is_some_and(PrimaryClient::is_connected)
    }

    pub fn is_script_sender_connected(&self) -> bool {
        self.script_sender.as_ref().is_some_and(ScriptSender::is_connected)
    }

    // -- C7 RTSI (opt-in) --

    /// RTSI is not part of the base construction parameter list in
    /// spec.md §4.8 item 1; a caller that wants the recipe overlay opts in
    /// separately once the driver is up.
    pub fn connect_rtsi(&self, output_recipe_file: &Path, input_recipe_file: &Path, frequency: f64, read_newest: bool) -> DriverResult<IoInterface> {
        IoInterface::connect(&self.config.robot_ip, output_recipe_file, input_recipe_file, frequency, read_newest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::{TcpListener, TcpStream};

    fn free_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        port
    }

    fn write_template(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("template.script");
        std::fs::write(&path, crate::template::DEFAULT_TEMPLATE).unwrap();
        path
    }

    fn test_config(dir: &tempfile::TempDir, robot_ip: &str) -> DriverConfig {
        DriverConfig {
            robot_ip: robot_ip.to_owned(),
            local_ip: "127.0.0.1".to_owned(),
            script_template_path: write_template(dir),
            headless: false,
            reverse_port: free_port(),
            trajectory_port: free_port(),
            script_command_port: free_port(),
            script_sender_port: free_port(),
            ..DriverConfig::default()
        }
    }

    #[test]
    fn construction_continues_when_primary_port_is_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, "127.0.0.1:1");
        let driver = EliteDriver::new(config).unwrap();
        assert!(!driver.is_primary_connected());
        assert!(!driver.is_script_sender_connected());
    }

    #[test]
    fn non_headless_mode_serves_script_sender() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(&dir, "127.0.0.1:1");
        config.headless = false;
        let port = config.script_sender_port;
        let driver = EliteDriver::new(config).unwrap();

        let mut client = TcpStream::connect(("127.0.0.1", port)).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        client.write_all(b"request_program\n").unwrap();
        let mut buf = vec![0_u8; driver.script.len()];
        std::io::Read::read_exact(&mut client, &mut buf).unwrap();
        assert_eq!(buf, driver.script.as_bytes());
    }

    #[test]
    fn headless_mode_skips_script_sender() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(&dir, "127.0.0.1:1");
        config.headless = true;
        let driver = EliteDriver::new(config).unwrap();
        assert!(!driver.is_script_sender_connected());
    }

    #[test]
    fn is_robot_connected_requires_both_reverse_and_trajectory() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, "127.0.0.1:1");
        let reverse_port = config.reverse_port;
        let driver = EliteDriver::new(config).unwrap();
        assert!(!driver.is_robot_connected());

        let _reverse_peer = TcpStream::connect(("127.0.0.1", reverse_port)).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        assert!(!driver.is_robot_connected(), "trajectory peer still missing");
    }
}

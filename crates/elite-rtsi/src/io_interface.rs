use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use elite_utils::{DriverError, DriverResult, Repeater, read_recipe_lines, spawn_named};
use tracing::{debug, warn};

use crate::client::{ControllerVersion, RtsiClient};
use crate::message::PackageType;
use crate::recipe::{ElementType, RecipeValue, RtsiRecipe};
use crate::types::{JointMode, RobotMode, SafetyMode, TaskStatus, ToolDigitalMode, ToolDigitalOutputMode, ToolMode};

/// Protocol version this driver negotiates. The controller accepts or
/// rejects it; there is currently only one version this crate speaks.
const PROTOCOL_VERSION: u16 = 2;

fn default_value(ty: ElementType) -> RecipeValue {
    match ty {
        ElementType::Bool => RecipeValue::Bool(false),
        ElementType::Uint8 => RecipeValue::Uint8(0),
        ElementType::Int8 => RecipeValue::Int8(0),
        ElementType::Uint16 => RecipeValue::Uint16(0),
        ElementType::Int16 => RecipeValue::Int16(0),
        ElementType::Int32 => RecipeValue::Int32(0),
        ElementType::Uint32 => RecipeValue::Uint32(0),
        ElementType::Int64 => RecipeValue::Int64(0),
        ElementType::Uint64 => RecipeValue::Uint64(0),
        ElementType::Double => RecipeValue::Double(0.0),
        ElementType::Vector3D => RecipeValue::Vector3D([0.0; 3]),
        ElementType::Vector6D => RecipeValue::Vector6D([0.0; 6]),
        ElementType::Vector6Int32 => RecipeValue::Vector6Int32([0; 6]),
        ElementType::Vector6Uint32 => RecipeValue::Vector6Uint32([0; 6]),
    }
}

/// High-level recipe overlay on top of [`RtsiClient`]: owns the subscribed
/// output recipe, polled by a background thread at the configured
/// frequency, and the subscribed input recipe, flushed once per cycle when
/// a `set_*` call has dirtied it.
///
/// `connect()` negotiates the protocol version, fetches the controller
/// version, subscribes both recipes, starts streaming, and only then
/// spawns the poll thread — it must start after recipe setup, since it
/// reads the output recipe's shape.
pub struct IoInterface {
    client: Arc<RtsiClient>,
    output_recipe: RtsiRecipe,
    input_recipe: RtsiRecipe,
    output_values: Arc<Mutex<HashMap<String, RecipeValue>>>,
    input_values: Arc<Mutex<HashMap<String, RecipeValue>>>,
    input_dirty: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    poll_thread: Mutex<Option<JoinHandle<()>>>,
    controller_version: ControllerVersion,
}

impl IoInterface {
    /// Connects to `robot_ip`'s RTSI port, subscribes the recipes named in
    /// `output_recipe_file`/`input_recipe_file` (spec.md §6.3: one
    /// variable name per line) at `frequency` Hz, and starts streaming.
    ///
    /// `read_newest` controls whether the poll thread drains to the most
    /// recent buffered output frame each cycle (discarding older ones) or
    /// consumes the oldest undelivered frame in order — spec.md §9's open
    /// question, left as a caller choice rather than resolved one way.
    pub fn connect(robot_ip: &str, output_recipe_file: &Path, input_recipe_file: &Path, frequency: f64, read_newest: bool) -> DriverResult<Self> {
        let output_vars = read_recipe_lines(output_recipe_file)?;
        let input_vars = read_recipe_lines(input_recipe_file)?;

        let client = RtsiClient::connect(robot_ip)?;
        if !client.negotiate_protocol_version(PROTOCOL_VERSION)? {
            return Err(DriverError::SocketFail("rtsi controller rejected protocol version".into()));
        }
        let controller_version = client.get_controller_version()?;

        let output_recipe = client.setup_output_recipe(&output_vars, frequency)?;
        let input_recipe = client.setup_input_recipe(&input_vars)?;

        let input_values = Arc::new(Mutex::new(input_recipe.variables.iter().map(|(name, ty)| (name.clone(), default_value(*ty))).collect()));
        let output_values = Arc::new(Mutex::new(HashMap::new()));
        let input_dirty = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(AtomicBool::new(false));

        if !client.start()? {
            return Err(DriverError::SocketFail("rtsi controller refused start signal".into()));
        }

        let client = Arc::new(client);
        let poll_thread = spawn_named("elite-rtsi-poll", {
            let client = client.clone();
            let output_recipe = output_recipe.clone();
            let input_recipe = input_recipe.clone();
            let output_values = output_values.clone();
            let input_values = input_values.clone();
            let input_dirty = input_dirty.clone();
            let shutdown = shutdown.clone();
            move || poll_loop(&client, &output_recipe, &input_recipe, &output_values, &input_values, &input_dirty, &shutdown, frequency, read_newest)
        })
        .map_err(|e| DriverError::SocketFail(e.to_string()))?;

        debug!(frequency, read_newest, "rtsi io interface streaming started");
        Ok(Self { client, output_recipe, input_recipe, output_values, input_values, input_dirty, shutdown, poll_thread: Mutex::new(Some(poll_thread)), controller_version })
    }

    pub fn controller_version(&self) -> &ControllerVersion {
        &self.controller_version
    }

    pub fn is_started(&self) -> bool {
        self.client.state() == crate::client::SessionState::Started
    }

    pub fn disconnect(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.poll_thread.lock().unwrap().take() {
            let _ = handle.join();
        }
        self.client.disconnect();
    }

    fn get(&self, name: &str) -> Option<RecipeValue> {
        self.output_values.lock().unwrap().get(name).cloned()
    }

    /// Marks the input recipe dirty with `value` for `name`, provided
    /// `name` was actually subscribed with a matching element type.
    /// Returns `false` (and logs) otherwise, mirroring the `bool`-return
    /// failure contract the rest of this driver uses for recoverable
    /// per-call errors.
    fn set(&self, name: &str, value: RecipeValue) -> bool {
        let subscribed = self.input_recipe.variables.iter().any(|(n, ty)| n == name && *ty == value.element_type());
        if !subscribed {
            warn!(variable = name, "rtsi set ignored: not present in input recipe with matching type");
            return false;
        }
        self.input_values.lock().unwrap().insert(name.to_owned(), value);
        self.input_dirty.store(true, Ordering::Release);
        true
    }

    // --- named getters (curated subset of RtsiIOInterface's ~70) ---

    pub fn get_timestamp(&self) -> f64 {
        RecipeValue::as_f64(self.get("timestamp").as_ref())
    }

    pub fn get_payload_mass(&self) -> f64 {
        RecipeValue::as_f64(self.get("payload_mass").as_ref())
    }

    pub fn get_payload_cog(&self) -> [f64; 3] {
        RecipeValue::as_vector3d(self.get("payload_cog").as_ref())
    }

    pub fn get_target_joint_positions(&self) -> [f64; 6] {
        RecipeValue::as_vector6d(self.get("target_joint_positions").as_ref())
    }

    pub fn get_target_joint_speeds(&self) -> [f64; 6] {
        RecipeValue::as_vector6d(self.get("target_joint_speeds").as_ref())
    }

    pub fn get_actual_joint_positions(&self) -> [f64; 6] {
        RecipeValue::as_vector6d(self.get("actual_joint_positions").as_ref())
    }

    pub fn get_actual_joint_speeds(&self) -> [f64; 6] {
        RecipeValue::as_vector6d(self.get("actual_joint_speeds").as_ref())
    }

    pub fn get_actual_joint_torques(&self) -> [f64; 6] {
        RecipeValue::as_vector6d(self.get("actual_joint_torques").as_ref())
    }

    pub fn get_actual_joint_current(&self) -> [f64; 6] {
        RecipeValue::as_vector6d(self.get("actual_joint_current").as_ref())
    }

    pub fn get_joint_temperatures(&self) -> [f64; 6] {
        RecipeValue::as_vector6d(self.get("joint_temperatures").as_ref())
    }

    pub fn get_actual_tcp_pose(&self) -> [f64; 6] {
        RecipeValue::as_vector6d(self.get("actual_TCP_pose").as_ref())
    }

    pub fn get_actual_tcp_speed(&self) -> [f64; 6] {
        RecipeValue::as_vector6d(self.get("actual_TCP_speed").as_ref())
    }

    pub fn get_actual_tcp_force(&self) -> [f64; 6] {
        RecipeValue::as_vector6d(self.get("actual_TCP_force").as_ref())
    }

    pub fn get_target_tcp_pose(&self) -> [f64; 6] {
        RecipeValue::as_vector6d(self.get("target_TCP_pose").as_ref())
    }

    pub fn get_target_tcp_speed(&self) -> [f64; 6] {
        RecipeValue::as_vector6d(self.get("target_TCP_speed").as_ref())
    }

    pub fn get_digital_input_bits(&self) -> u32 {
        RecipeValue::as_u32(self.get("actual_digital_input_bits").as_ref())
    }

    pub fn get_digital_output_bits(&self) -> u32 {
        RecipeValue::as_u32(self.get("actual_digital_output_bits").as_ref())
    }

    pub fn get_robot_mode(&self) -> RobotMode {
        RobotMode::from_raw(RecipeValue::as_i32(self.get("robot_mode").as_ref()))
    }

    pub fn get_joint_mode(&self) -> [JointMode; 6] {
        JointMode::decode_all(RecipeValue::as_vector6i32(self.get("joint_mode").as_ref()))
    }

    pub fn get_safety_status(&self) -> SafetyMode {
        SafetyMode::from_raw(RecipeValue::as_i32(self.get("safety_status").as_ref()))
    }

    pub fn get_actual_speed_scaling(&self) -> f64 {
        RecipeValue::as_f64(self.get("speed_scaling").as_ref())
    }

    pub fn get_target_speed_scaling(&self) -> f64 {
        RecipeValue::as_f64(self.get("target_speed_fraction").as_ref())
    }

    pub fn get_robot_voltage(&self) -> f64 {
        RecipeValue::as_f64(self.get("actual_robot_voltage").as_ref())
    }

    pub fn get_robot_current(&self) -> f64 {
        RecipeValue::as_f64(self.get("actual_robot_current").as_ref())
    }

    pub fn get_runtime_state(&self) -> TaskStatus {
        TaskStatus::from_raw(RecipeValue::as_u32(self.get("runtime_state").as_ref()))
    }

    pub fn get_script_control_line(&self) -> u32 {
        RecipeValue::as_u32(self.get("script_control_line").as_ref())
    }

    pub fn get_elbow_position(&self) -> [f64; 3] {
        RecipeValue::as_vector3d(self.get("elbow_position").as_ref())
    }

    pub fn get_elbow_velocity(&self) -> [f64; 3] {
        RecipeValue::as_vector3d(self.get("elbow_velocity").as_ref())
    }

    pub fn get_analog_input(&self, index: u8) -> f64 {
        let name = if index == 0 { "standard_analog_input0" } else { "standard_analog_input1" };
        RecipeValue::as_f64(self.get(name).as_ref())
    }

    pub fn get_analog_output(&self, index: u8) -> f64 {
        let name = if index == 0 { "standard_analog_output0" } else { "standard_analog_output1" };
        RecipeValue::as_f64(self.get(name).as_ref())
    }

    pub fn get_tool_mode(&self) -> ToolMode {
        ToolMode::from_raw(RecipeValue::as_u32(self.get("tool_mode").as_ref()))
    }

    pub fn get_tool_analog_input(&self) -> f64 {
        RecipeValue::as_f64(self.get("tool_analog_input").as_ref())
    }

    pub fn get_tool_analog_output(&self) -> f64 {
        RecipeValue::as_f64(self.get("tool_analog_output").as_ref())
    }

    pub fn get_tool_output_voltage(&self) -> f64 {
        RecipeValue::as_f64(self.get("tool_output_voltage").as_ref())
    }

    pub fn get_tool_output_current(&self) -> f64 {
        RecipeValue::as_f64(self.get("tool_output_current").as_ref())
    }

    pub fn get_tool_output_temperature(&self) -> f64 {
        RecipeValue::as_f64(self.get("tool_temperature").as_ref())
    }

    pub fn get_tool_digital_mode(&self) -> ToolDigitalMode {
        ToolDigitalMode::from_raw(RecipeValue::as_u8(self.get("tool_digital_mode").as_ref()))
    }

    pub fn get_tool_digital_output_mode(&self, index: u8) -> ToolDigitalOutputMode {
        let name = format!("tool_digital{index}_mode");
        ToolDigitalOutputMode::from_raw(RecipeValue::as_u8(self.get(&name).as_ref()))
    }

    pub fn get_out_bool_registers_0_31(&self) -> u32 {
        RecipeValue::as_u32(self.get("output_bit_registers0_to_31").as_ref())
    }

    pub fn get_out_bool_registers_32_63(&self) -> u32 {
        RecipeValue::as_u32(self.get("output_bit_registers32_to_63").as_ref())
    }

    pub fn get_in_bool_registers_0_31(&self) -> u32 {
        RecipeValue::as_u32(self.get("input_bit_registers0_to_31").as_ref())
    }

    pub fn get_in_bool_registers_32_63(&self) -> u32 {
        RecipeValue::as_u32(self.get("input_bit_registers32_to_63").as_ref())
    }

    pub fn get_in_bool_register(&self, index: u8) -> bool {
        RecipeValue::as_bool(self.get(&format!("input_bit_register{index}")).as_ref())
    }

    pub fn get_out_bool_register(&self, index: u8) -> bool {
        RecipeValue::as_bool(self.get(&format!("output_bit_register{index}")).as_ref())
    }

    pub fn get_in_int_register(&self, index: u8) -> i32 {
        RecipeValue::as_i32(self.get(&format!("input_int_register{index}")).as_ref())
    }

    pub fn get_out_int_register(&self, index: u8) -> i32 {
        RecipeValue::as_i32(self.get(&format!("output_int_register{index}")).as_ref())
    }

    pub fn get_in_double_register(&self, index: u8) -> f64 {
        RecipeValue::as_f64(self.get(&format!("input_double_register{index}")).as_ref())
    }

    pub fn get_out_double_register(&self, index: u8) -> f64 {
        RecipeValue::as_f64(self.get(&format!("output_double_register{index}")).as_ref())
    }

    // --- named setters (dirty the input recipe) ---

    pub fn set_speed_scaling(&self, slider: f64) -> bool {
        self.set("speed_slider_mask", RecipeValue::Uint32(1)) && self.set("speed_slider_fraction", RecipeValue::Double(slider))
    }

    pub fn set_standard_digital(&self, index: u8, level: bool) -> bool {
        let mask: u16 = 1 << index;
        let digital: u16 = u16::from(level) << index;
        self.set("standard_digital_output_mask", RecipeValue::Uint16(mask)) && self.set("standard_digital_output", RecipeValue::Uint16(digital))
    }

    pub fn set_configurable_digital(&self, index: u8, level: bool) -> bool {
        let mask: u8 = 1 << index;
        let digital: u8 = u8::from(level) << index;
        self.set("configurable_digital_output_mask", RecipeValue::Uint8(mask)) && self.set("configurable_digital_output", RecipeValue::Uint8(digital))
    }

    pub fn set_tool_digital_output(&self, index: u8, level: bool) -> bool {
        let mask: u8 = 1 << index;
        let digital: u8 = u8::from(level) << index;
        self.set("tool_digital_output_mask", RecipeValue::Uint8(mask)) && self.set("tool_digital_output", RecipeValue::Uint8(digital))
    }

    /// `value` in volts, 0-10V range, matching `RtsiIOInterface::setAnalogOutputVoltage`.
    pub fn set_analog_output_voltage(&self, index: u8, value: f64) -> bool {
        let level = value / 10.0;
        let mask: u8 = if index <= 1 { 1 << index } else { 0 };
        let level_name = if index == 0 { "standard_analog_output_0" } else { "standard_analog_output_1" };
        self.set("standard_analog_output_type", RecipeValue::Uint8(3)) && self.set("standard_analog_output_mask", RecipeValue::Uint8(mask)) && self.set(level_name, RecipeValue::Double(level))
    }

    /// `value` in amps, 4-20mA range, matching `RtsiIOInterface::setAnalogOutputCurrent`.
    pub fn set_analog_output_current(&self, index: u8, value: f64) -> bool {
        let level = (value - 0.004) / (0.02 - 0.004);
        let mask: u8 = if index <= 1 { 1 << index } else { 0 };
        let level_name = if index == 0 { "standard_analog_output_0" } else { "standard_analog_output_1" };
        self.set("standard_analog_output_type", RecipeValue::Uint8(0)) && self.set("standard_analog_output_mask", RecipeValue::Uint8(mask)) && self.set(level_name, RecipeValue::Double(level))
    }

    pub fn set_external_force_torque(&self, value: [f64; 6]) -> bool {
        self.set("external_force_torque", RecipeValue::Vector6D(value))
    }
}

impl Drop for IoInterface {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[allow(clippy::too_many_arguments)]
fn poll_loop(
    client: &RtsiClient,
    output_recipe: &RtsiRecipe,
    input_recipe: &RtsiRecipe,
    output_values: &Mutex<HashMap<String, RecipeValue>>,
    input_values: &Mutex<HashMap<String, RecipeValue>>,
    input_dirty: &AtomicBool,
    shutdown: &AtomicBool,
    frequency: f64,
    read_newest: bool,
) {
    let interval = Duration::from_secs_f64(1.0 / frequency);
    let mut repeater = Repeater::every(interval);
    while !shutdown.load(Ordering::SeqCst) {
        let wait = repeater.until_next();
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
        repeater.reset();

        match client.recv_data_frame(interval, read_newest) {
            Ok(Some(payload)) if payload.first() == Some(&output_recipe.id) => match output_recipe.decode_values(&payload[1..]) {
                Ok(values) => {
                    let mut guard = output_values.lock().unwrap();
                    guard.extend(values);
                }
                Err(e) => warn!(error = %e, "failed to decode rtsi output data package"),
            },
            Ok(Some(_)) | Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "rtsi poll loop stopping after recv error");
                shutdown.store(true, Ordering::SeqCst);
                return;
            }
        }

        if input_dirty.swap(false, Ordering::AcqRel) {
            let values: Vec<RecipeValue> = {
                let guard = input_values.lock().unwrap();
                input_recipe.variables.iter().map(|(name, ty)| guard.get(name).cloned().unwrap_or_else(|| default_value(*ty))).collect()
            };
            let mut payload = vec![input_recipe.id];
            payload.extend(input_recipe.encode_values(&values));
            if let Err(e) = client.send_all(PackageType::DataPackage, &payload) {
                warn!(error = %e, "rtsi poll loop stopping after send error");
                shutdown.store(true, Ordering::SeqCst);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_value_matches_element_type_zero() {
        assert_eq!(default_value(ElementType::Double), RecipeValue::Double(0.0));
        assert_eq!(default_value(ElementType::Vector6D), RecipeValue::Vector6D([0.0; 6]));
        assert_eq!(default_value(ElementType::Bool), RecipeValue::Bool(false));
    }
}

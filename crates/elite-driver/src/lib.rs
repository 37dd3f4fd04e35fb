mod config;
mod facade;
mod reverse;
mod script_command;
mod script_sender;
mod template;
mod trajectory;

pub use config::DriverConfig;
pub use facade::EliteDriver;
pub use reverse::{ControlMode, ReverseChannel, TrajectoryControlAction};
pub use script_command::{CommandTag, ScriptCommandChannel};
pub use script_sender::ScriptSender;
pub use template::{DEFAULT_TEMPLATE, ServojParams, TemplateParams, load_template, materialize, wrap_as_program};
pub use trajectory::{FRAME_LEN as TRAJECTORY_FRAME_LEN, MotionResult, MotionType, TrajectoryChannel};

pub use reverse::FRAME_LEN as REVERSE_FRAME_LEN;
pub use script_command::FRAME_LEN as SCRIPT_COMMAND_FRAME_LEN;

mod client;
mod io_interface;
mod message;
mod recipe;
mod types;

pub use client::{ControllerVersion, RTSI_PORT, RtsiClient, SessionState};
pub use io_interface::IoInterface;
pub use message::{HEADER_SIZE, PackageType, encode_frame};
pub use recipe::{ElementType, RecipeValue, RtsiRecipe};
pub use types::{JointMode, RobotMode, SafetyMode, TaskStatus, ToolDigitalMode, ToolDigitalOutputMode, ToolMode};

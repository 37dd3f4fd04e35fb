mod client;
mod frame;
mod waiter;

pub use client::{PRIMARY_PORT, PrimaryClient};
pub use frame::{HEAD_LENGTH, ROBOT_STATE_MSG_TYPE, read_message, split_sub_packages};
pub use waiter::{PackageSlot, PrimaryPackage, WaiterRegistry};

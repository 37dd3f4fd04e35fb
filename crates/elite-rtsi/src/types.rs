//! Decoded forms of the small integer status codes the output recipe
//! streams (`robot_mode`, `safety_status`, `joint_mode`, `runtime_state`,
//! `tool_mode`, `tool_digital_mode`, `tool_digitalN_mode`).
//!
//! These values are defined by the robot controller's own firmware and
//! are not otherwise documented here. Rather than invent firmware-specific
//! numeric constants with no way to check them, each decoded type keeps
//! the raw value reachable through an `Other` variant — callers that need
//! a specific code can match on it without the crate asserting
//! firmware-version-dependent numbering it cannot verify.

/// Decoded `robot_mode` recipe value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RobotMode {
    Disconnected,
    ConfirmSafety,
    Booting,
    PowerOff,
    PowerOn,
    Idle,
    Backdrive,
    Running,
    Updating,
    Other(i32),
}

impl RobotMode {
    pub const fn from_raw(raw: i32) -> Self {
        match raw {
            -1 => Self::Disconnected,
            0 => Self::ConfirmSafety,
            1 => Self::Booting,
            2 => Self::PowerOff,
            3 => Self::PowerOn,
            4 => Self::Idle,
            5 => Self::Backdrive,
            6 => Self::Running,
            7 => Self::Updating,
            other => Self::Other(other),
        }
    }
}

/// Decoded `safety_status` recipe value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SafetyMode {
    Normal,
    Reduced,
    ProtectiveStop,
    Recovery,
    SafeguardStop,
    SystemEmergencyStop,
    RobotEmergencyStop,
    Violation,
    Fault,
    Other(i32),
}

impl SafetyMode {
    pub const fn from_raw(raw: i32) -> Self {
        match raw {
            1 => Self::Normal,
            2 => Self::Reduced,
            3 => Self::ProtectiveStop,
            4 => Self::Recovery,
            5 => Self::SafeguardStop,
            6 => Self::SystemEmergencyStop,
            7 => Self::RobotEmergencyStop,
            8 => Self::Violation,
            9 => Self::Fault,
            other => Self::Other(other),
        }
    }
}

/// Decoded per-joint entry of the `joint_mode` recipe vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JointMode {
    Shutdown,
    PartDCalibration,
    Backdrive,
    PowerOff,
    Running,
    Idle,
    Other(i32),
}

impl JointMode {
    pub const fn from_raw(raw: i32) -> Self {
        match raw {
            236 => Self::Shutdown,
            237 => Self::PartDCalibration,
            238 => Self::Backdrive,
            239 => Self::PowerOff,
            253 => Self::Running,
            255 => Self::Idle,
            other => Self::Other(other),
        }
    }

    pub fn decode_all(raw: [i32; 6]) -> [Self; 6] {
        raw.map(Self::from_raw)
    }
}

/// Decoded `runtime_state` recipe value — the state of the currently
/// loaded/running script program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskStatus {
    Stopping,
    Stopped,
    Playing,
    Pausing,
    Paused,
    Resuming,
    Other(u32),
}

impl TaskStatus {
    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::Stopping,
            1 => Self::Stopped,
            2 => Self::Playing,
            3 => Self::Pausing,
            4 => Self::Paused,
            5 => Self::Resuming,
            other => Self::Other(other),
        }
    }
}

/// Decoded `tool_mode` recipe value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolMode {
    Normal,
    Ft,
    Other(u32),
}

impl ToolMode {
    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::Normal,
            1 => Self::Ft,
            other => Self::Other(other),
        }
    }
}

/// Decoded `tool_digital_mode` recipe value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolDigitalMode {
    Single,
    Pnp,
    Npn,
    Other(u8),
}

impl ToolDigitalMode {
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Single,
            1 => Self::Pnp,
            2 => Self::Npn,
            other => Self::Other(other),
        }
    }
}

/// Decoded `tool_digitalN_mode` recipe value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolDigitalOutputMode {
    Sinking,
    Sourcing,
    Other(u8),
}

impl ToolDigitalOutputMode {
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Sinking,
            1 => Self::Sourcing,
            other => Self::Other(other),
        }
    }
}

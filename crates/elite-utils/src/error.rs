use std::path::PathBuf;

use thiserror::Error;

/// Structural error surfaced from constructors, session setup and recipe
/// parsing. Recoverable boundary failures (a single frame write, a single
/// package wait) are not modeled here — those return `bool` and log.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("connect to {addr} failed: {reason}")]
    SocketConnectFail { addr: String, reason: String },

    #[error("pending socket operation cancelled by teardown")]
    SocketOptCancel,

    #[error("socket I/O error: {0}")]
    SocketFail(String),

    #[error("rtsi setup reply listed unknown/unavailable type '{type_token}' for variable '{variable}'")]
    RtsiUnknownVariableType { variable: String, type_token: String },

    #[error("rtsi recipe parse failure: {0}")]
    RtsiRecipeParseFail(String),

    #[error("illegal parameter: {0}")]
    IllegalParam(String),

    #[error("dashboard received unexpected reply: {0}")]
    DashboardNotExpectedReceive(String),

    #[error("failed to open '{path}': {source}")]
    FileOpenFail { path: PathBuf, #[source] source: std::io::Error },
}

pub type DriverResult<T> = Result<T, DriverError>;

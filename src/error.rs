//! Error types for the hub, configuration and CI concerns of `benchctl`.

use std::{io, path::PathBuf, process::ExitStatus};

use thiserror::Error;

/// Errors raised while talking to the USB hub over its serial line.
#[derive(Error, Debug)]
pub enum HubError {
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error on the hub serial line: {0}")]
    Io(#[from] io::Error),

    #[error("no prompt from the hub after {elapsed_ms} ms ({received} bytes received)")]
    NoPrompt { elapsed_ms: u128, received: usize },

    #[error("hub reply exceeded {budget} bytes without a prompt")]
    ReplyTooLong { budget: usize },

    #[error("unsupported hub `{found}`")]
    UnsupportedHub { found: String },

    #[error("port {0} is out of range (0..{max})", max = crate::hub::MAX_PORTS)]
    PortOutOfRange(usize),

    #[error("malformed reply to `{command}`: {reason}")]
    MalformedReply { command: String, reason: String },
}

/// Errors raised while loading the hub registry and port maps.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read `{path}`: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid JSON in `{path}`: {source}")]
    InvalidJson {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("platform `{0}` is not attached to any configured hub")]
    PlatformNotFound(String),

    #[error("{0} hubs registered, at most {max} are supported", max = crate::config::MAX_HUBS)]
    TooManyHubs(usize),

    #[error("hub `{0}` is not in the hub registry")]
    HubNotFound(String),

    #[error("platform `{platform}` maps to port {port} which is out of range")]
    PortOutOfRange { platform: String, port: i64 },

    #[error("invalid hub port id `{0}`")]
    InvalidPortId(String),
}

/// Errors raised by the firmware and distro build drivers.
#[derive(Error, Debug)]
pub enum CiError {
    #[error("failed to start `{command}`: {source}")]
    Spawn { command: String, source: io::Error },

    #[error("`{command}` failed with {status}")]
    CommandFailed { command: String, status: ExitStatus },

    #[error("I/O error on `{path}`: {source}")]
    File { path: PathBuf, source: io::Error },

    #[error("unsupported toolchain `{0}`")]
    UnsupportedToolchain(String),

    #[error("target id `{0}` not found in the device listing")]
    TargetNotListed(String),

    #[error("no board to test: give a target id, or both a comport and a disk")]
    NoDeviceAddress,

    #[error("device listing has no {field} for target id `{target_id}`")]
    IncompleteListing { target_id: String, field: &'static str },

    #[error("test report `{path}` records {errors} errors and {failures} failures")]
    TestsFailed {
        path: PathBuf,
        errors: usize,
        failures: usize,
    },

    #[error("project `{0}` is not in the manifest")]
    UnknownProject(String),

    #[error("invalid pin `{0}`, expected NAME=REVISION")]
    InvalidPin(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Hub(#[from] HubError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl CiError {
    pub(crate) fn file(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> CiError {
        let path = path.into();
        move |source| CiError::File { path, source }
    }
}

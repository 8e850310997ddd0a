//! Unified error type for the cuelight-lib crate.
//!
//! [`CueError`] covers the session lifecycle failures (connect, compatibility,
//! exclusive control, reinitialize identity checks) and wraps [`HostError`]
//! for collaborator failures that surface unchanged. `From` impls allow `?`
//! to propagate across module boundaries.

use std::fmt;

use crate::device::DeviceCategory;
use crate::host::HostError;
use crate::protocol::ProtocolDetails;

/// Unified error type for cuelight-lib operations.
#[derive(Debug)]
pub enum CueError {
    /// The host could not be reached or refused the session.
    Connection(HostError),
    /// The host reported a protocol the client cannot talk to.
    Incompatible(ProtocolDetails),
    /// `connect` was called on a session that is already ready.
    AlreadyInitialized,
    /// The operation needs a ready session.
    NotInitialized,
    /// Enumeration returned a device category tag we cannot represent.
    UnknownCategory(u32),
    /// A previously tracked device is missing or changed model after reinitialize.
    DeviceGone(DeviceCategory),
    /// The host refused exclusive lighting control for a device.
    AccessDenied { device_id: String, source: HostError },
    /// Reinitialize was attempted while a key-event subscription is live.
    SubscriptionConflict,
    /// No device of the requested category is tracked by the session.
    DeviceNotFound(DeviceCategory),
    /// Any other collaborator failure (flush, enumeration).
    Host(HostError),
    /// Standard I/O error (config persistence, profile loading).
    Io(std::io::Error),
    /// Configuration validation error.
    Config(String),
    /// Color parsing error.
    Color(String),
    /// Host profile parsing error.
    Profile(String),
}

impl fmt::Display for CueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CueError::Connection(e) => write!(f, "Could not connect to lighting host: {e}"),
            CueError::Incompatible(p) => write!(
                f,
                "Host protocol is not compatible (host {}, server {}, client {})",
                p.server_host_version, p.server_version, p.client_version
            ),
            CueError::AlreadyInitialized => write!(f, "Session is already initialized"),
            CueError::NotInitialized => write!(f, "Session is not initialized"),
            CueError::UnknownCategory(tag) => write!(f, "Unknown device category 0x{tag:04X}"),
            CueError::DeviceGone(category) => {
                write!(f, "The previously loaded {category} got disconnected")
            }
            CueError::AccessDenied { device_id, source } => {
                write!(f, "Exclusive control refused for {device_id}: {source}")
            }
            CueError::SubscriptionConflict => {
                write!(f, "Cannot reinitialize while a key-event subscription is live")
            }
            CueError::DeviceNotFound(category) => write!(f, "No {category} device is available"),
            CueError::Host(e) => write!(f, "Host error: {e}"),
            CueError::Io(e) => write!(f, "I/O error: {e}"),
            CueError::Config(e) => write!(f, "Config error: {e}"),
            CueError::Color(e) => write!(f, "Color error: {e}"),
            CueError::Profile(e) => write!(f, "Profile error: {e}"),
        }
    }
}

impl std::error::Error for CueError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CueError::Connection(e) => Some(e),
            CueError::AccessDenied { source, .. } => Some(source),
            CueError::Host(e) => Some(e),
            CueError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<HostError> for CueError {
    fn from(e: HostError) -> Self {
        CueError::Host(e)
    }
}

impl From<std::io::Error> for CueError {
    fn from(e: std::io::Error) -> Self {
        CueError::Io(e)
    }
}

/// Crate-level Result alias using [`CueError`].
pub type Result<T> = std::result::Result<T, CueError>;

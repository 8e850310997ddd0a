//! Protocol constants and version negotiation with the lighting host.
//!
//! The host reports three version triples when a session opens. The client
//! version is always valid; the server and host versions read `0.0.0` when no
//! host answered, which is the only condition treated as a breaking change.

use std::fmt;

use serde::Serialize;

use crate::host::{SessionDetails, Version};

// ── Query bounds ──

/// Maximum number of device records requested per enumeration.
pub const DEVICE_COUNT_MAX: usize = 64;

/// Maximum number of LED positions requested per device.
pub const LED_POSITIONS_MAX: usize = 256;

// ── Protocol details ──

/// Versions negotiated for the current session and the resulting compatibility verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProtocolDetails {
    pub client_version: Version,
    pub server_version: Version,
    pub server_host_version: Version,
    /// True when the server version is unknown (major `0`); the session must not proceed.
    pub breaking_changes: bool,
}

impl ProtocolDetails {
    pub fn is_compatible(&self) -> bool {
        !self.breaking_changes
    }
}

impl From<SessionDetails> for ProtocolDetails {
    fn from(details: SessionDetails) -> Self {
        ProtocolDetails {
            client_version: details.client,
            server_version: details.server,
            server_host_version: details.host,
            breaking_changes: details.server.major == 0,
        }
    }
}

impl fmt::Display for ProtocolDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "client {}, server {}, host {}",
            self.client_version, self.server_version, self.server_host_version
        )
    }
}

//! Lighting host seam: trait + raw records exchanged with the host.
//!
//! The host owns the actual rendering engine and device access; everything
//! in this crate talks to it through [`Host`]. Implementations are opaque
//! pass-throughs: they report results, they never interpret them.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::led::{LedId, Rgba};

mod simulated;

pub use simulated::{
    HostProfile, ProfileCategory, ProfileDevice, ProfileLed, ProfileSession, SimulatedDevice,
    SimulatedHost,
};

// ── Error type ──

/// Status codes reported by the lighting host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    NotConnected,
    NoControl,
    IncompatibleProtocol,
    InvalidArguments,
    InvalidOperation,
    DeviceNotFound,
    NotAllowed,
    Other(String),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::NotConnected => write!(f, "host is not connected"),
            HostError::NoControl => write!(f, "no control over the device"),
            HostError::IncompatibleProtocol => write!(f, "incompatible protocol"),
            HostError::InvalidArguments => write!(f, "invalid arguments"),
            HostError::InvalidOperation => write!(f, "invalid operation"),
            HostError::DeviceNotFound => write!(f, "device not found"),
            HostError::NotAllowed => write!(f, "operation not allowed"),
            HostError::Other(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for HostError {}

pub type Result<T> = std::result::Result<T, HostError>;

// ── Versions ──

/// A `major.minor.patch` version triple.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Version {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = String;

    /// Accepts `"4"`, `"4.0"` or `"4.0.84"`; missing parts are zero.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let mut parts = [0u32; 3];
        let mut count = 0;
        for part in s.split('.') {
            if count == 3 {
                return Err(format!("too many version components: {s}"));
            }
            parts[count] = part
                .trim()
                .parse()
                .map_err(|_| format!("invalid version component \"{part}\" in {s}"))?;
            count += 1;
        }
        Ok(Version::new(parts[0], parts[1], parts[2]))
    }
}

/// Versions negotiated when a session is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionDetails {
    /// Version of the client library. Always valid, even without a host.
    pub client: Version,
    /// Version of the host's server component, `0.0.0` if the host was not found.
    pub server: Version,
    /// Version of the host application itself, `0.0.0` if not found.
    pub host: Version,
}

// ── Session state notifications ──

/// Session states the host reports through the state-change handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostSessionState {
    #[default]
    Invalid,
    Closed,
    Connecting,
    Timeout,
    ConnectionRefused,
    ConnectionLost,
    Connected,
}

impl HostSessionState {
    pub fn code(self) -> u8 {
        match self {
            HostSessionState::Invalid => 0,
            HostSessionState::Closed => 1,
            HostSessionState::Connecting => 2,
            HostSessionState::Timeout => 3,
            HostSessionState::ConnectionRefused => 4,
            HostSessionState::ConnectionLost => 5,
            HostSessionState::Connected => 6,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            1 => HostSessionState::Closed,
            2 => HostSessionState::Connecting,
            3 => HostSessionState::Timeout,
            4 => HostSessionState::ConnectionRefused,
            5 => HostSessionState::ConnectionLost,
            6 => HostSessionState::Connected,
            _ => HostSessionState::Invalid,
        }
    }
}

impl fmt::Display for HostSessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HostSessionState::Invalid => "invalid",
            HostSessionState::Closed => "closed",
            HostSessionState::Connecting => "connecting",
            HostSessionState::Timeout => "timeout",
            HostSessionState::ConnectionRefused => "connection refused",
            HostSessionState::ConnectionLost => "connection lost",
            HostSessionState::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// Callback invoked by the host whenever its session state changes.
///
/// May run on a thread the caller does not control.
pub type StateChangeHandler = Box<dyn Fn(HostSessionState) + Send + Sync>;

// ── Events ──

/// Events delivered by the host after `subscribe_events`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Key {
        device_id: String,
        key_id: u32,
        pressed: bool,
    },
    DeviceConnectionChanged {
        device_id: String,
        connected: bool,
    },
}

/// Callback receiving host events. May run on a thread the caller does not control.
pub type EventHandler = Box<dyn FnMut(HostEvent) + Send>;

// ── Access levels ──

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessLevel {
    /// Shared with every other client (host default).
    #[default]
    Shared,
    /// Exclusive lighting, shared key events.
    ExclusiveLighting,
    /// Exclusive key events, shared lighting.
    ExclusiveKeyEvents,
    /// Exclusive lighting and key events.
    Exclusive,
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccessLevel::Shared => "shared",
            AccessLevel::ExclusiveLighting => "exclusive lighting",
            AccessLevel::ExclusiveKeyEvents => "exclusive key events",
            AccessLevel::Exclusive => "exclusive",
        };
        f.write_str(name)
    }
}

// ── Raw records ──

/// Category bitmask passed to [`Host::get_devices`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFilter {
    pub category_mask: u32,
}

impl DeviceFilter {
    /// Every device, including categories this crate does not know.
    pub const ALL: DeviceFilter = DeviceFilter {
        category_mask: u32::MAX,
    };

    pub fn matches(&self, category_tag: u32) -> bool {
        self.category_mask == u32::MAX || self.category_mask & category_tag != 0
    }
}

/// One device record as enumerated by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDeviceInfo {
    /// Category tag (bitmask value, `0` = unknown).
    pub category: u32,
    pub id: String,
    pub serial: String,
    pub model: String,
    pub led_count: usize,
    pub channel_count: usize,
}

/// LED position as reported by the host: only a center point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawLedPosition {
    pub id: LedId,
    pub cx: f64,
    pub cy: f64,
}

/// One entry of a color batch sent to (or read from) the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedColor {
    pub id: LedId,
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl LedColor {
    pub fn new(id: LedId, color: Rgba) -> Self {
        LedColor {
            id,
            r: color.r,
            g: color.g,
            b: color.b,
            a: color.a,
        }
    }

    pub fn rgba(&self) -> Rgba {
        Rgba::new(self.r, self.g, self.b, self.a)
    }
}

// ── Trait ──

/// Operations the lighting host provides. Every call blocks until the host answers.
pub trait Host {
    /// Open the session. `on_state_changed` receives every later state transition.
    fn connect(&self, on_state_changed: StateChangeHandler) -> Result<()>;
    fn session_details(&self) -> Result<SessionDetails>;
    /// Enumerate at most `max` devices matching `filter`.
    fn get_devices(&self, filter: DeviceFilter, max: usize) -> Result<Vec<RawDeviceInfo>>;
    /// LED center points of a device, at most `max` entries.
    fn get_led_positions(&self, device_id: &str, max: usize) -> Result<Vec<RawLedPosition>>;
    /// Submit one color batch. A failure means none of the batch is assumed applied.
    fn set_led_colors(&self, device_id: &str, colors: &[LedColor]) -> Result<()>;
    fn request_control(&self, device_id: &str, level: AccessLevel) -> Result<()>;
    fn disconnect(&self) -> Result<()>;
    /// Resolve a key symbol to an LED id. `Ok(None)` when the host knows no such key.
    fn led_id_for_symbol(&self, device_id: &str, symbol: char) -> Result<Option<LedId>>;

    /// Current colors of the given LEDs.
    /// Default: the host does not report colors.
    fn get_led_colors(&self, _device_id: &str, _ids: &[LedId]) -> Result<Vec<LedColor>> {
        Ok(Vec::new())
    }

    /// Hand control of a device back to the host.
    /// Default: nothing to release.
    fn release_control(&self, _device_id: &str) -> Result<()> {
        Ok(())
    }

    /// Register the process-wide event handler.
    /// Default: events are not supported by this host.
    fn subscribe_events(&self, _handler: EventHandler) -> Result<()> {
        Err(HostError::NotAllowed)
    }

    fn unsubscribe_events(&self) -> Result<()> {
        Ok(())
    }
}

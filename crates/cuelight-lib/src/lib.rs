//! cuelight: session management and LED grouping for RGB peripherals
//! exposed by a lighting-control host.

pub mod config;
pub mod device;
pub mod error;
pub mod events;
pub mod host;
pub mod led;
pub mod protocol;
pub mod registry;
pub mod session;

pub use device::{Device, DeviceCategory, DeviceKind};
pub use error::CueError;
pub use host::{Host, HostError, SimulatedHost};
pub use led::{Led, LedGroup, LedId, Rgba};
pub use registry::DeviceRegistry;
pub use session::{Session, SessionState};

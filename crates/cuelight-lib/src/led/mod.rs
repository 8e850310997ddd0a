//! LED addressing and grouping: per-device LED maps, caller-owned groups,
//! and the batched update queue.

mod color;
mod group;
mod map;
mod queue;

pub use color::{Rgba, format_color, parse_color};
pub use group::{GroupId, LedGroup};
pub use map::{DeviceLedMap, Led, LedId, Rect};
pub use queue::{ColorRequest, UpdateQueue};

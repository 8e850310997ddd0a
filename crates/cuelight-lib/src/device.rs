//! Device model: categories, category-specific kinds, and the device handle
//! that owns an LED map and its pending color writes.

use std::fmt;
use std::str::FromStr;
use std::sync::Weak;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::error::{CueError, Result};
use crate::host::{AccessLevel, Host, LedColor, RawDeviceInfo, RawLedPosition};
use crate::led::{ColorRequest, DeviceLedMap, GroupId, Led, LedGroup, LedId, Rgba, UpdateQueue};

// ── Categories ──

/// Device categories this crate can track, one device per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceCategory {
    Keyboard,
    Mouse,
    Headset,
    Mousemat,
    HeadsetStand,
}

impl DeviceCategory {
    pub const ALL: [DeviceCategory; 5] = [
        DeviceCategory::Keyboard,
        DeviceCategory::Mouse,
        DeviceCategory::Headset,
        DeviceCategory::Mousemat,
        DeviceCategory::HeadsetStand,
    ];

    /// Bitmask tag used by the host in enumeration records and filters.
    pub const fn tag(self) -> u32 {
        match self {
            DeviceCategory::Keyboard => 0x0001,
            DeviceCategory::Mouse => 0x0002,
            DeviceCategory::Mousemat => 0x0004,
            DeviceCategory::Headset => 0x0008,
            DeviceCategory::HeadsetStand => 0x0010,
        }
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        DeviceCategory::ALL.into_iter().find(|c| c.tag() == tag)
    }

    /// Machine name, as accepted by [`FromStr`] and used in JSON output.
    pub fn name(self) -> &'static str {
        match self {
            DeviceCategory::Keyboard => "keyboard",
            DeviceCategory::Mouse => "mouse",
            DeviceCategory::Headset => "headset",
            DeviceCategory::Mousemat => "mousemat",
            DeviceCategory::HeadsetStand => "headset-stand",
        }
    }
}

impl fmt::Display for DeviceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DeviceCategory::Keyboard => "Keyboard",
            DeviceCategory::Mouse => "Mouse",
            DeviceCategory::Headset => "Headset",
            DeviceCategory::Mousemat => "Mousemat",
            DeviceCategory::HeadsetStand => "Headset Stand",
        };
        f.write_str(label)
    }
}

impl FromStr for DeviceCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', ' '], "-");
        DeviceCategory::ALL
            .into_iter()
            .find(|c| c.name() == normalized || c.name().replace('-', "") == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown device category \"{s}\" (expected keyboard, mouse, headset, mousemat or headset-stand)"
                )
            })
    }
}

// ── Layouts ──

/// Physical keyboard layout. The host does not report it, so it stays `Invalid`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyboardLayout {
    #[default]
    Invalid,
    Us,
    Uk,
    Br,
    Jp,
    Kr,
    Zone,
}

/// Logical keyboard layout as configured in the host. Not reported either.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogicalLayout {
    #[default]
    Invalid,
    UsInternational,
    NorthAmerica,
    Eu,
    Uk,
    Be,
    Br,
    Ch,
    Cn,
    De,
    Es,
    Fr,
    It,
    Nd,
    Ru,
    Jp,
    Kr,
    Tw,
    Mex,
}

/// Physical mouse zone layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MouseLayout {
    #[default]
    Unknown,
    Zones1,
    Zones2,
    Zones3,
    Zones4,
}

// ── Kinds ──

/// Category-specific device data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "category", rename_all = "kebab-case")]
pub enum DeviceKind {
    Keyboard {
        physical_layout: KeyboardLayout,
        logical_layout: LogicalLayout,
    },
    Mouse {
        physical_layout: MouseLayout,
    },
    Headset,
    Mousemat,
    HeadsetStand,
    /// A category tag this crate cannot represent.
    Unknown {
        tag: u32,
    },
}

impl DeviceKind {
    /// Map a raw enumeration record to its kind. Pure; never fails.
    pub fn classify(raw: &RawDeviceInfo) -> Self {
        match DeviceCategory::from_tag(raw.category) {
            Some(DeviceCategory::Keyboard) => DeviceKind::Keyboard {
                physical_layout: KeyboardLayout::Invalid,
                logical_layout: LogicalLayout::Invalid,
            },
            Some(DeviceCategory::Mouse) => DeviceKind::Mouse {
                physical_layout: MouseLayout::Unknown,
            },
            Some(DeviceCategory::Headset) => DeviceKind::Headset,
            Some(DeviceCategory::Mousemat) => DeviceKind::Mousemat,
            Some(DeviceCategory::HeadsetStand) => DeviceKind::HeadsetStand,
            None => DeviceKind::Unknown { tag: raw.category },
        }
    }

    /// The category of a known kind; `UnknownCategory` for [`DeviceKind::Unknown`].
    pub fn category(&self) -> Result<DeviceCategory> {
        match self {
            DeviceKind::Keyboard { .. } => Ok(DeviceCategory::Keyboard),
            DeviceKind::Mouse { .. } => Ok(DeviceCategory::Mouse),
            DeviceKind::Headset => Ok(DeviceCategory::Headset),
            DeviceKind::Mousemat => Ok(DeviceCategory::Mousemat),
            DeviceKind::HeadsetStand => Ok(DeviceCategory::HeadsetStand),
            DeviceKind::Unknown { tag } => Err(CueError::UnknownCategory(*tag)),
        }
    }

    pub fn is_keyboard(&self) -> bool {
        matches!(self, DeviceKind::Keyboard { .. })
    }
}

// ── Device info ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// Opaque host id; may change across sessions.
    pub id: String,
    pub model: String,
    pub serial: String,
    pub led_count: usize,
    pub channel_count: usize,
    pub access: AccessLevel,
}

impl DeviceInfo {
    pub fn from_raw(raw: &RawDeviceInfo, access: AccessLevel) -> Self {
        DeviceInfo {
            id: raw.id.clone(),
            model: raw.model.clone(),
            serial: raw.serial.clone(),
            led_count: raw.led_count,
            channel_count: raw.channel_count,
            access,
        }
    }
}

// ── Identity ──

/// Process-unique identity of one device instance.
///
/// Two devices with identical ids and models from different enumerations
/// still carry different tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceToken(u64);

impl DeviceToken {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        DeviceToken(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

// ── Device ──

/// A tracked device: info, LED map, staged writes and attached groups.
#[derive(Debug)]
pub struct Device {
    token: DeviceToken,
    category: DeviceCategory,
    kind: DeviceKind,
    info: DeviceInfo,
    leds: DeviceLedMap,
    queue: UpdateQueue,
    attached: Vec<AttachedGroup>,
}

/// Attach slot; goes stale once the caller drops the group.
#[derive(Debug)]
struct AttachedGroup {
    id: GroupId,
    alive: Weak<()>,
}

impl AttachedGroup {
    fn is_live(&self) -> bool {
        self.alive.strong_count() > 0
    }
}

impl Device {
    pub(crate) fn build(
        category: DeviceCategory,
        kind: DeviceKind,
        info: DeviceInfo,
        positions: &[RawLedPosition],
        colors: &[LedColor],
    ) -> Self {
        let token = DeviceToken::next();
        Device {
            token,
            category,
            kind,
            info,
            leds: DeviceLedMap::from_positions(token, positions, colors),
            queue: UpdateQueue::new(),
            attached: Vec::new(),
        }
    }

    pub fn token(&self) -> DeviceToken {
        self.token
    }

    pub fn category(&self) -> DeviceCategory {
        self.category
    }

    pub fn kind(&self) -> &DeviceKind {
        &self.kind
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn id(&self) -> &str {
        &self.info.id
    }

    pub fn model(&self) -> &str {
        &self.info.model
    }

    pub fn serial(&self) -> &str {
        &self.info.serial
    }

    pub(crate) fn refresh_info(&mut self, info: DeviceInfo) {
        if info.id != self.info.id {
            log::debug!(
                "{} id changed: {} -> {}",
                self.category,
                self.info.id,
                info.id
            );
        }
        self.info = info;
    }

    // ── LEDs ──

    pub fn led(&self, id: LedId) -> Option<&Led> {
        self.leds.get(id)
    }

    /// LEDs in ascending id order.
    pub fn leds(&self) -> impl Iterator<Item = &Led> {
        self.leds.iter()
    }

    pub fn led_map(&self) -> &DeviceLedMap {
        &self.leds
    }

    /// Request a color for one LED. It reaches the host on the next flush if
    /// the LED belongs to an attached group. Returns false for unknown ids.
    pub fn set_led_color(&mut self, id: LedId, color: Rgba) -> bool {
        self.leds.set_color(id, color)
    }

    /// Resolve a key symbol to an LED. Keyboards only; host errors and
    /// unresolvable symbols both yield `None`.
    pub fn led_for_symbol(&self, host: &impl Host, symbol: char) -> Option<&Led> {
        if !self.kind.is_keyboard() {
            return None;
        }
        match host.led_id_for_symbol(&self.info.id, symbol) {
            Ok(Some(id)) => self.leds.get(id),
            Ok(None) => None,
            Err(e) => {
                log::debug!("symbol lookup for {symbol:?} on {} failed: {e}", self.info.id);
                None
            }
        }
    }

    // ── Groups ──

    /// Attach a group so it takes part in collection. Returns false when the
    /// group is bound to another device or is already attached.
    ///
    /// Attaching only registers the group's position in the collection order.
    /// The group itself must still be handed to [`Device::collect`].
    pub fn attach(&mut self, group: &mut LedGroup) -> bool {
        if group.device() != self.token {
            log::debug!("refusing to attach group {:?} of another device", group.id());
            return false;
        }
        self.prune_attached();
        if self.attached.iter().any(|a| a.id == group.id()) {
            return false;
        }
        self.attached.push(AttachedGroup {
            id: group.id(),
            alive: group.liveness(),
        });
        group.set_attached(true);
        true
    }

    /// Detach a group. Returns true if it was attached.
    pub fn detach(&mut self, group: &mut LedGroup) -> bool {
        if group.device() != self.token {
            return false;
        }
        self.prune_attached();
        let was_attached = match self.attached.iter().position(|a| a.id == group.id()) {
            Some(pos) => {
                self.attached.remove(pos);
                true
            }
            None => false,
        };
        group.set_attached(false);
        was_attached
    }

    /// Attached groups that are still alive, oldest first.
    pub fn attach_order(&self) -> Vec<GroupId> {
        self.attached
            .iter()
            .filter(|a| a.is_live())
            .map(|a| a.id)
            .collect()
    }

    fn prune_attached(&mut self) {
        let before = self.attached.len();
        self.attached.retain(AttachedGroup::is_live);
        let dropped = before - self.attached.len();
        if dropped > 0 {
            log::debug!("{}: forgot {dropped} dropped group(s)", self.category);
        }
    }

    // ── Updates ──

    /// Stage writes for every attached group among `groups`. Attached groups
    /// missing from `groups` are skipped. See [`UpdateQueue::collect`].
    pub fn collect(&mut self, groups: &[&LedGroup]) -> usize {
        self.prune_attached();
        let order: Vec<GroupId> = self.attached.iter().map(|a| a.id).collect();
        self.queue.collect(&mut self.leds, self.token, &order, groups)
    }

    /// Send the staged batch to the host. See [`UpdateQueue::flush`].
    pub fn flush(&mut self, host: &impl Host) -> Result<usize> {
        self.queue.flush(host, &self.info.id, &mut self.leds)
    }

    /// Collect and flush in one step.
    pub fn update(&mut self, host: &impl Host, groups: &[&LedGroup]) -> Result<usize> {
        self.collect(groups);
        self.flush(host)
    }

    pub fn pending(&self) -> &UpdateQueue {
        &self.queue
    }

    /// Make the current requested colors the restore point.
    pub fn save_colors(&mut self) {
        self.leds.save();
    }

    /// Re-send the saved snapshot for every LED of the device.
    ///
    /// Pending writes are dropped first. On failure the full snapshot batch
    /// stays staged for the next flush.
    pub fn restore_colors(&mut self, host: &impl Host) -> Result<usize> {
        self.leds.revert_to_saved();
        self.queue.clear();
        for led in self.leds.iter() {
            self.queue.stage(ColorRequest {
                led: led.id(),
                color: led.color(),
            });
        }
        self.flush(host)
    }

    /// Drop staged writes and requested-but-unflushed colors.
    pub fn reset_leds(&mut self) {
        self.queue.clear();
        self.leds.discard_pending();
    }
}

/// A keyboard with LEDs `1..=led_count` on one row, not known to any host.
#[cfg(test)]
pub(crate) fn test_device(led_count: u32) -> Device {
    let positions: Vec<RawLedPosition> = (1..=led_count)
        .map(|id| RawLedPosition {
            id,
            cx: f64::from(id) * 10.0,
            cy: 5.0,
        })
        .collect();
    let info = DeviceInfo {
        id: "{test-kb}".into(),
        model: "K95".into(),
        serial: "TEST0001".into(),
        led_count: positions.len(),
        channel_count: 0,
        access: AccessLevel::Shared,
    };
    let kind = DeviceKind::Keyboard {
        physical_layout: KeyboardLayout::Invalid,
        logical_layout: LogicalLayout::Invalid,
    };
    Device::build(DeviceCategory::Keyboard, kind, info, &positions, &[])
}

//! LED groups: named, mutable subsets of one device's LEDs.
//!
//! A group is bound to one device instance for its whole life. Membership is
//! by identity: an LED belongs to the group only if it is the same LED of the
//! same device instance, so a re-enumerated device with identical ids does not
//! satisfy membership checks for a group bound to the old instance.
//!
//! Groups are owned by the caller. The device only remembers which groups are
//! attached, and in which order (see [`Device::attach`]). Dropping an attached
//! group detaches it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crate::device::{Device, DeviceToken};

use super::color::Rgba;
use super::map::{Led, LedId};

/// Process-unique group identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(u64);

impl GroupId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        GroupId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// An ordered, duplicate-free set of LEDs of one device.
#[derive(Debug)]
pub struct LedGroup {
    id: GroupId,
    device: DeviceToken,
    members: Vec<LedId>,
    attached: bool,
    fill: Option<Rgba>,
    /// Dropped with the group; devices hold a `Weak` to notice.
    alive: Arc<()>,
}

impl LedGroup {
    /// Create an empty group bound to `device`, optionally attaching it right away.
    pub fn new(device: &mut Device, auto_attach: bool) -> Self {
        let mut group = LedGroup {
            id: GroupId::next(),
            device: device.token(),
            members: Vec::new(),
            attached: false,
            fill: None,
            alive: Arc::new(()),
        };
        if auto_attach {
            device.attach(&mut group);
        }
        group
    }

    /// Create a group from LED ids; ids the device does not have are skipped.
    pub fn with_leds(
        device: &mut Device,
        auto_attach: bool,
        ids: impl IntoIterator<Item = LedId>,
    ) -> Self {
        let mut group = LedGroup::new(device, auto_attach);
        group.add_led_ids(device, ids);
        group
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    /// The device instance this group is bound to.
    pub fn device(&self) -> DeviceToken {
        self.device
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub(crate) fn set_attached(&mut self, attached: bool) {
        self.attached = attached;
    }

    pub(crate) fn liveness(&self) -> Weak<()> {
        Arc::downgrade(&self.alive)
    }

    /// Solid color written to every member when the group is collected.
    pub fn fill(&self) -> Option<Rgba> {
        self.fill
    }

    pub fn set_fill(&mut self, fill: Option<Rgba>) {
        self.fill = fill;
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Current members in insertion order. Borrowed, not copied.
    pub fn leds(&self) -> &[LedId] {
        &self.members
    }

    /// Resolve members to the LEDs of `device`. Yields nothing for a foreign device.
    pub fn resolve<'a>(&'a self, device: &'a Device) -> impl Iterator<Item = &'a Led> + 'a {
        let bound = device.token() == self.device;
        self.members
            .iter()
            .filter(move |_| bound)
            .filter_map(move |&id| device.led(id))
    }

    /// Add an LED. Returns true if it was added; foreign LEDs and existing
    /// members are ignored.
    pub fn add_led(&mut self, led: &Led) -> bool {
        if led.device() != self.device {
            log::debug!("group {:?}: ignoring LED {} of another device", self.id, led.id());
            return false;
        }
        self.insert(led.id())
    }

    pub fn add_leds<'a>(&mut self, leds: impl IntoIterator<Item = &'a Led>) -> usize {
        leds.into_iter().filter(|led| self.add_led(led)).count()
    }

    /// Add the LED with `id` on `device`. Unknown ids are silently ignored.
    pub fn add_led_id(&mut self, device: &Device, id: LedId) -> bool {
        match device.led(id) {
            Some(led) => self.add_led(led),
            None => false,
        }
    }

    pub fn add_led_ids(&mut self, device: &Device, ids: impl IntoIterator<Item = LedId>) -> usize {
        ids.into_iter()
            .filter(|&id| self.add_led_id(device, id))
            .count()
    }

    /// Remove an LED. Returns true if it was a member.
    pub fn remove_led(&mut self, led: &Led) -> bool {
        led.device() == self.device && self.remove_led_id(led.id())
    }

    pub fn remove_leds<'a>(&mut self, leds: impl IntoIterator<Item = &'a Led>) -> usize {
        leds.into_iter().filter(|led| self.remove_led(led)).count()
    }

    pub fn remove_led_id(&mut self, id: LedId) -> bool {
        match self.members.iter().position(|&m| m == id) {
            Some(pos) => {
                self.members.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn remove_led_ids(&mut self, ids: impl IntoIterator<Item = LedId>) -> usize {
        ids.into_iter().filter(|&id| self.remove_led_id(id)).count()
    }

    /// Identity-based membership: same device instance and same LED.
    pub fn contains_led(&self, led: &Led) -> bool {
        led.device() == self.device && self.contains_led_id(led.id())
    }

    pub fn contains_led_id(&self, id: LedId) -> bool {
        self.members.contains(&id)
    }

    /// Append every member of `other` not already present, in `other`'s order.
    ///
    /// Existing members keep their relative order. Groups bound to another
    /// device contribute nothing.
    pub fn merge_leds(&mut self, other: &LedGroup) -> usize {
        if other.device != self.device {
            log::debug!(
                "group {:?}: not merging group {:?} of another device",
                self.id,
                other.id
            );
            return 0;
        }
        other
            .members
            .iter()
            .filter(|&&id| self.insert(id))
            .count()
    }

    fn insert(&mut self, id: LedId) -> bool {
        if self.members.contains(&id) {
            return false;
        }
        self.members.push(id);
        true
    }
}

//! Per-device LED map: stable LED id → spatial descriptor + color state.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::device::DeviceToken;
use crate::host::{LedColor, RawLedPosition};

use super::color::Rgba;

/// Stable LED identifier, unique only within its owning device.
pub type LedId = u32;

/// Axis-aligned rectangle in host layout units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Unit rectangle centered on `(cx, cy)`.
    ///
    /// The host only reports LED centers, so every LED gets the same
    /// placeholder extent.
    pub fn around_center(cx: f64, cy: f64) -> Self {
        Rect {
            x: cx - 0.5,
            y: cy - 0.5,
            width: 1.0,
            height: 1.0,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// One addressable LED. Belongs to exactly one device for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Led {
    id: LedId,
    #[serde(skip)]
    device: DeviceToken,
    rect: Rect,
    color: Rgba,
    #[serde(skip)]
    applied: Rgba,
}

impl Led {
    pub fn id(&self) -> LedId {
        self.id
    }

    /// Identity of the device instance owning this LED.
    pub fn device(&self) -> DeviceToken {
        self.device
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Requested color (may not have reached the host yet).
    pub fn color(&self) -> Rgba {
        self.color
    }

    /// Color last accepted by the host.
    pub fn applied_color(&self) -> Rgba {
        self.applied
    }

    /// True when the requested color differs from what the host last accepted.
    pub fn is_dirty(&self) -> bool {
        self.color != self.applied
    }
}

/// All LEDs of one device, keyed by id, plus the saved color snapshot.
#[derive(Debug, Clone, Default)]
pub struct DeviceLedMap {
    leds: BTreeMap<LedId, Led>,
    saved: BTreeMap<LedId, Rgba>,
}

impl DeviceLedMap {
    /// Build the map from host-reported positions.
    ///
    /// `colors` seeds both the current color and the saved snapshot; LEDs the
    /// host reported no color for start transparent. Duplicate ids keep the
    /// first position.
    pub fn from_positions(
        device: DeviceToken,
        positions: &[RawLedPosition],
        colors: &[LedColor],
    ) -> Self {
        let initial: BTreeMap<LedId, Rgba> = colors.iter().map(|c| (c.id, c.rgba())).collect();
        let mut leds = BTreeMap::new();
        for pos in positions {
            let color = initial.get(&pos.id).copied().unwrap_or_default();
            leds.entry(pos.id).or_insert(Led {
                id: pos.id,
                device,
                rect: Rect::around_center(pos.cx, pos.cy),
                color,
                applied: color,
            });
        }
        let saved = leds.values().map(|led| (led.id, led.color)).collect();
        DeviceLedMap { leds, saved }
    }

    pub fn get(&self, id: LedId) -> Option<&Led> {
        self.leds.get(&id)
    }

    pub fn contains(&self, id: LedId) -> bool {
        self.leds.contains_key(&id)
    }

    /// LEDs in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Led> {
        self.leds.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = LedId> + '_ {
        self.leds.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.leds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leds.is_empty()
    }

    /// Request a new color. Returns false for unknown ids.
    pub fn set_color(&mut self, id: LedId, color: Rgba) -> bool {
        match self.leds.get_mut(&id) {
            Some(led) => {
                led.color = color;
                true
            }
            None => false,
        }
    }

    /// Snapshot the current requested colors as the restore point.
    pub fn save(&mut self) {
        self.saved = self.leds.values().map(|led| (led.id, led.color)).collect();
    }

    pub fn saved_color(&self, id: LedId) -> Option<Rgba> {
        self.saved.get(&id).copied()
    }

    /// Put every LED's requested color back to the saved snapshot.
    pub(crate) fn revert_to_saved(&mut self) {
        for led in self.leds.values_mut() {
            if let Some(&color) = self.saved.get(&led.id) {
                led.color = color;
            }
        }
    }

    /// Drop requested-but-unflushed colors.
    pub(crate) fn discard_pending(&mut self) {
        for led in self.leds.values_mut() {
            led.color = led.applied;
        }
    }

    pub(crate) fn mark_applied(&mut self, id: LedId, color: Rgba) {
        if let Some(led) = self.leds.get_mut(&id) {
            led.applied = color;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions() -> Vec<RawLedPosition> {
        vec![
            RawLedPosition {
                id: 3,
                cx: 30.0,
                cy: 5.0,
            },
            RawLedPosition {
                id: 1,
                cx: 10.0,
                cy: 5.0,
            },
            RawLedPosition {
                id: 2,
                cx: 20.0,
                cy: 5.5,
            },
        ]
    }

    #[test]
    fn rect_is_unit_square_around_center() {
        let r = Rect::around_center(10.0, 4.0);
        assert_eq!(
            r,
            Rect {
                x: 9.5,
                y: 3.5,
                width: 1.0,
                height: 1.0
            }
        );
        assert_eq!(r.center(), (10.0, 4.0));
    }

    #[test]
    fn builds_map_sorted_by_id() {
        let map = DeviceLedMap::from_positions(DeviceToken::next(), &positions(), &[]);
        let ids: Vec<LedId> = map.ids().collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(map.get(2).unwrap().rect(), Rect::around_center(20.0, 5.5));
    }

    #[test]
    fn empty_positions_give_empty_map() {
        let map = DeviceLedMap::from_positions(DeviceToken::next(), &[], &[]);
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn duplicate_ids_keep_first_position() {
        let mut pos = positions();
        pos.push(RawLedPosition {
            id: 1,
            cx: 99.0,
            cy: 99.0,
        });
        let map = DeviceLedMap::from_positions(DeviceToken::next(), &pos, &[]);
        assert_eq!(map.len(), 3);
        assert_eq!(map.get(1).unwrap().rect(), Rect::around_center(10.0, 5.0));
    }

    #[test]
    fn host_colors_seed_color_and_snapshot() {
        let red = Rgba::rgb(255, 0, 0);
        let map = DeviceLedMap::from_positions(
            DeviceToken::next(),
            &positions(),
            &[LedColor::new(2, red)],
        );
        let led = map.get(2).unwrap();
        assert_eq!(led.color(), red);
        assert_eq!(led.applied_color(), red);
        assert!(!led.is_dirty());
        assert_eq!(map.saved_color(2), Some(red));
        assert_eq!(map.saved_color(1), Some(Rgba::TRANSPARENT));
    }

    #[test]
    fn set_color_marks_dirty_until_applied() {
        let mut map = DeviceLedMap::from_positions(DeviceToken::next(), &positions(), &[]);
        assert!(map.set_color(1, Rgba::WHITE));
        assert!(map.get(1).unwrap().is_dirty());
        map.mark_applied(1, Rgba::WHITE);
        assert!(!map.get(1).unwrap().is_dirty());
    }

    #[test]
    fn set_color_unknown_id_is_rejected() {
        let mut map = DeviceLedMap::from_positions(DeviceToken::next(), &positions(), &[]);
        assert!(!map.set_color(42, Rgba::WHITE));
    }

    #[test]
    fn revert_to_saved_uses_latest_save() {
        let mut map = DeviceLedMap::from_positions(DeviceToken::next(), &positions(), &[]);
        map.set_color(1, Rgba::WHITE);
        map.save();
        map.set_color(1, Rgba::BLACK);
        map.revert_to_saved();
        assert_eq!(map.get(1).unwrap().color(), Rgba::WHITE);
    }

    #[test]
    fn discard_pending_returns_to_applied() {
        let mut map = DeviceLedMap::from_positions(DeviceToken::next(), &positions(), &[]);
        map.set_color(3, Rgba::WHITE);
        map.discard_pending();
        assert_eq!(map.get(3).unwrap().color(), Rgba::TRANSPARENT);
        assert!(!map.get(3).unwrap().is_dirty());
    }
}

//! Batched color updates: collect pending writes, flush them in one host call.

use crate::device::DeviceToken;
use crate::error::{CueError, Result};
use crate::host::{Host, LedColor};

use super::color::Rgba;
use super::group::{GroupId, LedGroup};
use super::map::{DeviceLedMap, LedId};

/// A pending color write for one LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorRequest {
    pub led: LedId,
    pub color: Rgba,
}

/// Color writes staged for one device until the next flush.
///
/// Holds at most one request per LED; staging an LED twice keeps the latest color.
#[derive(Debug, Clone, Default)]
pub struct UpdateQueue {
    pending: Vec<ColorRequest>,
}

impl UpdateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> &[ColorRequest] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn stage(&mut self, request: ColorRequest) {
        match self.pending.iter_mut().find(|r| r.led == request.led) {
            Some(existing) => existing.color = request.color,
            None => self.pending.push(request),
        }
    }

    fn unstage(&mut self, led: LedId) {
        self.pending.retain(|r| r.led != led);
    }

    /// Stage one request per dirty member of every attached group.
    ///
    /// Groups are visited in attach order. A group with a fill color writes it
    /// to all of its members first, so where attached groups overlap the most
    /// recently attached one wins. Groups that are detached or bound to another
    /// device are skipped, and so are attached groups not passed in `groups`.
    /// A member that is no longer dirty loses any request staged earlier.
    /// Returns the number of staged requests.
    pub fn collect(
        &mut self,
        leds: &mut DeviceLedMap,
        device: DeviceToken,
        attach_order: &[GroupId],
        groups: &[&LedGroup],
    ) -> usize {
        let mut ordered: Vec<(usize, &LedGroup)> = groups
            .iter()
            .copied()
            .filter(|g| g.is_attached() && g.device() == device)
            .filter_map(|g| {
                attach_order
                    .iter()
                    .position(|&id| id == g.id())
                    .map(|pos| (pos, g))
            })
            .collect();
        ordered.sort_by_key(|&(pos, _)| pos);
        ordered.dedup_by_key(|&mut (pos, _)| pos);
        if ordered.len() < attach_order.len() {
            log::debug!(
                "{} attached group(s) not supplied, skipped",
                attach_order.len() - ordered.len()
            );
        }

        for (_, group) in &ordered {
            if let Some(fill) = group.fill() {
                for &id in group.leds() {
                    leds.set_color(id, fill);
                }
            }
        }

        for (_, group) in &ordered {
            for &id in group.leds() {
                match leds.get(id) {
                    Some(led) if led.is_dirty() => self.stage(ColorRequest {
                        led: id,
                        color: led.color(),
                    }),
                    _ => self.unstage(id),
                }
            }
        }
        self.pending.len()
    }

    /// Submit the whole staged batch in a single host call.
    ///
    /// On success the LEDs are marked applied and the queue is emptied. On
    /// failure nothing is marked applied and the batch stays staged so the
    /// caller can resend it as a whole.
    pub fn flush(
        &mut self,
        host: &impl Host,
        device_id: &str,
        leds: &mut DeviceLedMap,
    ) -> Result<usize> {
        if self.pending.is_empty() {
            return Ok(0);
        }
        let batch: Vec<LedColor> = self
            .pending
            .iter()
            .map(|r| LedColor::new(r.led, r.color))
            .collect();
        host.set_led_colors(device_id, &batch).map_err(CueError::Host)?;
        for request in self.pending.drain(..) {
            leds.mark_applied(request.led, request.color);
        }
        log::debug!("flushed {} LED colors to {device_id}", batch.len());
        Ok(batch.len())
    }
}

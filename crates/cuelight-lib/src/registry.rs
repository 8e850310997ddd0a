//! Device registry: builds one typed device per category from the host's
//! enumeration, and checks device identity across reconnects.

use crate::device::{Device, DeviceCategory, DeviceInfo, DeviceKind};
use crate::error::{CueError, Result};
use crate::host::{AccessLevel, DeviceFilter, Host};
use crate::led::LedId;
use crate::protocol::{DEVICE_COUNT_MAX, LED_POSITIONS_MAX};

/// The devices tracked by a session, at most one per category, in
/// enumeration order.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: Vec<Device>,
}

impl DeviceRegistry {
    /// Enumerate the host's devices and build the registry.
    ///
    /// With `exclusive`, exclusive lighting control is requested for every
    /// device and a refusal fails the whole enumeration. An unknown category
    /// tag is fatal too. Either the full set is returned or an error, never a
    /// partial registry.
    pub fn enumerate(host: &impl Host, exclusive: bool) -> Result<Self> {
        let records = host
            .get_devices(DeviceFilter::ALL, DEVICE_COUNT_MAX)
            .map_err(CueError::Host)?;
        log::debug!("host reported {} device(s)", records.len());

        let mut devices: Vec<Device> = Vec::new();
        for raw in records.iter().take(DEVICE_COUNT_MAX) {
            let kind = DeviceKind::classify(raw);
            let category = kind.category()?;
            if devices.iter().any(|d| d.category() == category) {
                log::warn!(
                    "ignoring additional {category} {} ({}), one is already tracked",
                    raw.model,
                    raw.id
                );
                continue;
            }

            let access = if exclusive {
                host.request_control(&raw.id, AccessLevel::ExclusiveLighting)
                    .map_err(|source| CueError::AccessDenied {
                        device_id: raw.id.clone(),
                        source,
                    })?;
                AccessLevel::ExclusiveLighting
            } else {
                AccessLevel::Shared
            };

            let positions = host
                .get_led_positions(&raw.id, LED_POSITIONS_MAX)
                .unwrap_or_else(|e| {
                    log::warn!("{category} {}: LED positions unavailable ({e})", raw.id);
                    Vec::new()
                });
            let ids: Vec<LedId> = positions.iter().map(|p| p.id).collect();
            let colors = if ids.is_empty() {
                Vec::new()
            } else {
                host.get_led_colors(&raw.id, &ids).unwrap_or_else(|e| {
                    log::warn!("{category} {}: LED colors unavailable ({e})", raw.id);
                    Vec::new()
                })
            };

            let info = DeviceInfo::from_raw(raw, access);
            log::debug!(
                "tracking {category} {} ({}) with {} LED(s)",
                info.model,
                info.id,
                positions.len()
            );
            devices.push(Device::build(category, kind, info, &positions, &colors));
        }
        Ok(DeviceRegistry { devices })
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Device> {
        self.devices.iter_mut()
    }

    pub fn get(&self, category: DeviceCategory) -> Option<&Device> {
        self.devices.iter().find(|d| d.category() == category)
    }

    pub fn get_mut(&mut self, category: DeviceCategory) -> Option<&mut Device> {
        self.devices.iter_mut().find(|d| d.category() == category)
    }

    pub fn categories(&self) -> impl Iterator<Item = DeviceCategory> + '_ {
        self.devices.iter().map(Device::category)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Check that every category tracked here is still present in `fresh`
    /// with the same model. The first mismatch, in tracking order, is reported.
    pub fn verify_identity(&self, fresh: &DeviceRegistry) -> Result<()> {
        for device in &self.devices {
            match fresh.get(device.category()) {
                Some(new) if new.model() == device.model() => {}
                Some(new) => {
                    log::warn!(
                        "{} changed model: {} -> {}",
                        device.category(),
                        device.model(),
                        new.model()
                    );
                    return Err(CueError::DeviceGone(device.category()));
                }
                None => {
                    log::warn!("{} {} is gone", device.category(), device.model());
                    return Err(CueError::DeviceGone(device.category()));
                }
            }
        }
        Ok(())
    }

    /// Take over a verified re-enumeration.
    ///
    /// Devices tracked here keep their identity (LEDs and attached groups stay
    /// valid) and only pick up the fresh host info. Categories that only
    /// `fresh` has are adopted as they are.
    pub(crate) fn absorb(&mut self, fresh: DeviceRegistry) {
        for new in fresh.devices {
            match self.get_mut(new.category()) {
                Some(existing) => existing.refresh_info(new.info().clone()),
                None => {
                    log::debug!("adopting new {} {}", new.category(), new.model());
                    self.devices.push(new);
                }
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.devices.clear();
    }
}

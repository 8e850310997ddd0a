//! In-memory lighting host.
//!
//! Always compiled: the CLI runs against it when pointed at a host profile,
//! and the tests use it as the collaborator. Every call is recorded and most
//! calls can be made to fail through the public `fail_*` switches.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;

use crate::error::CueError;
use crate::led::{LedId, Rgba, parse_color};

use super::{
    AccessLevel, DeviceFilter, EventHandler, Host, HostError, HostEvent, HostSessionState,
    LedColor, RawDeviceInfo, RawLedPosition, Result, SessionDetails, StateChangeHandler, Version,
};

const CLIENT_VERSION: Version = Version::new(4, 0, 84);
const SERVER_VERSION: Version = Version::new(4, 0, 84);
const HOST_VERSION: Version = Version::new(5, 9, 105);

// ── Devices ──

/// One device exposed by a [`SimulatedHost`].
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedDevice {
    /// Raw category tag, may be one this crate does not know.
    pub category: u32,
    pub id: String,
    pub model: String,
    pub serial: String,
    pub channel_count: usize,
    pub leds: Vec<RawLedPosition>,
    pub colors: HashMap<LedId, Rgba>,
    pub symbols: HashMap<char, LedId>,
}

impl SimulatedDevice {
    pub fn new(category: u32, id: impl Into<String>, model: impl Into<String>) -> Self {
        SimulatedDevice {
            category,
            id: id.into(),
            model: model.into(),
            serial: String::new(),
            channel_count: 0,
            leds: Vec::new(),
            colors: HashMap::new(),
            symbols: HashMap::new(),
        }
    }

    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = serial.into();
        self
    }

    pub fn with_channels(mut self, channel_count: usize) -> Self {
        self.channel_count = channel_count;
        self
    }

    pub fn with_led(mut self, id: LedId, cx: f64, cy: f64) -> Self {
        self.leds.push(RawLedPosition { id, cx, cy });
        self
    }

    /// LEDs `1..=count` laid out in rows of ten, 10 units apart.
    pub fn with_grid(mut self, count: u32) -> Self {
        for id in 1..=count {
            let index = id - 1;
            self.leds.push(RawLedPosition {
                id,
                cx: f64::from(index % 10) * 10.0 + 10.0,
                cy: f64::from(index / 10) * 10.0 + 5.0,
            });
        }
        self
    }

    pub fn with_symbol(mut self, symbol: char, led: LedId) -> Self {
        self.symbols.insert(symbol, led);
        self
    }

    /// Current color of one LED as the host reports it.
    pub fn with_color(mut self, led: LedId, color: Rgba) -> Self {
        self.colors.insert(led, color);
        self
    }

    fn raw_info(&self) -> RawDeviceInfo {
        RawDeviceInfo {
            category: self.category,
            id: self.id.clone(),
            serial: self.serial.clone(),
            model: self.model.clone(),
            led_count: self.leds.len(),
            channel_count: self.channel_count,
        }
    }

    fn has_led(&self, id: LedId) -> bool {
        self.leds.iter().any(|l| l.id == id)
    }
}

// ── Host ──

/// Scriptable in-memory [`Host`].
pub struct SimulatedHost {
    details: Cell<SessionDetails>,
    devices: RefCell<Vec<SimulatedDevice>>,
    connected: Cell<bool>,
    state_handler: RefCell<Option<StateChangeHandler>>,
    event_handler: RefCell<Option<EventHandler>>,
    control: RefCell<HashMap<String, AccessLevel>>,

    /// If true, `connect` is refused.
    pub fail_connect: Cell<bool>,
    /// If true, `session_details` fails.
    pub fail_session_details: Cell<bool>,
    /// If true, `get_devices` fails.
    pub fail_get_devices: Cell<bool>,
    /// If true, `get_led_positions` fails.
    pub fail_led_positions: Cell<bool>,
    /// If true, `get_led_colors` fails.
    pub fail_led_colors: Cell<bool>,
    /// If true, `set_led_colors` fails.
    pub fail_set_colors: Cell<bool>,
    /// If true, `disconnect` reports an error (the session still closes).
    pub fail_disconnect: Cell<bool>,
    /// If true, `subscribe_events` fails.
    pub fail_subscribe: Cell<bool>,
    /// Device ids for which `request_control` is refused.
    pub deny_control: RefCell<Vec<String>>,

    /// Recorded color batches: (device id, batch).
    pub color_batches: RefCell<Vec<(String, Vec<LedColor>)>>,
    /// Recorded control requests: (device id, level).
    pub control_requests: RefCell<Vec<(String, AccessLevel)>>,
    /// Device ids passed to `release_control`, in call order.
    pub control_releases: RefCell<Vec<String>>,
    pub connects: Cell<usize>,
    pub disconnects: Cell<usize>,
}

impl Default for SimulatedHost {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SimulatedHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedHost")
            .field("details", &self.details.get())
            .field("devices", &self.devices.borrow().len())
            .field("connected", &self.connected.get())
            .finish_non_exhaustive()
    }
}

impl SimulatedHost {
    pub fn new() -> Self {
        SimulatedHost {
            details: Cell::new(SessionDetails {
                client: CLIENT_VERSION,
                server: SERVER_VERSION,
                host: HOST_VERSION,
            }),
            devices: RefCell::new(Vec::new()),
            connected: Cell::new(false),
            state_handler: RefCell::new(None),
            event_handler: RefCell::new(None),
            control: RefCell::new(HashMap::new()),
            fail_connect: Cell::new(false),
            fail_session_details: Cell::new(false),
            fail_get_devices: Cell::new(false),
            fail_led_positions: Cell::new(false),
            fail_led_colors: Cell::new(false),
            fail_set_colors: Cell::new(false),
            fail_disconnect: Cell::new(false),
            fail_subscribe: Cell::new(false),
            deny_control: RefCell::new(Vec::new()),
            color_batches: RefCell::new(Vec::new()),
            control_requests: RefCell::new(Vec::new()),
            control_releases: RefCell::new(Vec::new()),
            connects: Cell::new(0),
            disconnects: Cell::new(0),
        }
    }

    /// Build a host from a parsed profile.
    pub fn from_profile(profile: &HostProfile) -> crate::error::Result<Self> {
        let host = SimulatedHost::new();
        host.set_session_details(profile.session.details()?);
        for device in &profile.devices {
            host.plug(device.to_device()?);
        }
        Ok(host)
    }

    /// Read and parse a TOML host profile.
    pub fn load_profile(path: &Path) -> crate::error::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let profile = HostProfile::parse(&contents)
            .map_err(|e| CueError::Profile(format!("{}: {e}", path.display())))?;
        Self::from_profile(&profile)
    }

    // ── Scripting ──

    /// Add a device, replacing any device with the same id.
    pub fn plug(&self, device: SimulatedDevice) {
        let mut devices = self.devices.borrow_mut();
        match devices.iter_mut().find(|d| d.id == device.id) {
            Some(existing) => *existing = device,
            None => devices.push(device),
        }
    }

    /// Remove a device. Returns false if no device had that id.
    pub fn unplug(&self, device_id: &str) -> bool {
        let mut devices = self.devices.borrow_mut();
        let before = devices.len();
        devices.retain(|d| d.id != device_id);
        self.control.borrow_mut().remove(device_id);
        devices.len() != before
    }

    pub fn set_session_details(&self, details: SessionDetails) {
        self.details.set(details);
    }

    /// Mark the host connected without going through [`Host::connect`].
    pub fn force_connected(&self) {
        self.connected.set(true);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.get()
    }

    pub fn has_event_handler(&self) -> bool {
        self.event_handler.borrow().is_some()
    }

    /// Deliver an event to the registered handler. Returns false if none is registered.
    pub fn emit_event(&self, event: HostEvent) -> bool {
        match self.event_handler.borrow_mut().as_mut() {
            Some(handler) => {
                handler(event);
                true
            }
            None => false,
        }
    }

    /// Report a session state change to the registered state handler.
    pub fn emit_state(&self, state: HostSessionState) {
        if let Some(handler) = self.state_handler.borrow().as_ref() {
            handler(state);
        }
    }

    /// Current color of every LED of a device, in ascending id order.
    pub fn led_colors(&self, device_id: &str) -> Vec<LedColor> {
        let devices = self.devices.borrow();
        let Some(device) = devices.iter().find(|d| d.id == device_id) else {
            return Vec::new();
        };
        let mut colors: Vec<LedColor> = device
            .leds
            .iter()
            .map(|l| {
                let color = device.colors.get(&l.id).copied().unwrap_or_default();
                LedColor::new(l.id, color)
            })
            .collect();
        colors.sort_by_key(|c| c.id);
        colors.dedup_by_key(|c| c.id);
        colors
    }

    pub fn led_positions(&self, device_id: &str) -> Vec<RawLedPosition> {
        self.devices
            .borrow()
            .iter()
            .find(|d| d.id == device_id)
            .map(|d| d.leds.clone())
            .unwrap_or_default()
    }

    /// Access level currently granted for a device.
    pub fn access_level(&self, device_id: &str) -> AccessLevel {
        self.control
            .borrow()
            .get(device_id)
            .copied()
            .unwrap_or_default()
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected.get() {
            Ok(())
        } else {
            Err(HostError::NotConnected)
        }
    }

    fn with_device<T>(&self, device_id: &str, f: impl FnOnce(&SimulatedDevice) -> T) -> Result<T> {
        self.devices
            .borrow()
            .iter()
            .find(|d| d.id == device_id)
            .map(f)
            .ok_or(HostError::DeviceNotFound)
    }
}

impl Host for SimulatedHost {
    fn connect(&self, on_state_changed: StateChangeHandler) -> Result<()> {
        self.connects.set(self.connects.get() + 1);
        on_state_changed(HostSessionState::Connecting);
        if self.fail_connect.get() {
            on_state_changed(HostSessionState::ConnectionRefused);
            return Err(HostError::NotConnected);
        }
        on_state_changed(HostSessionState::Connected);
        *self.state_handler.borrow_mut() = Some(on_state_changed);
        self.connected.set(true);
        Ok(())
    }

    fn session_details(&self) -> Result<SessionDetails> {
        if self.fail_session_details.get() {
            return Err(HostError::InvalidOperation);
        }
        Ok(self.details.get())
    }

    fn get_devices(&self, filter: DeviceFilter, max: usize) -> Result<Vec<RawDeviceInfo>> {
        self.ensure_connected()?;
        if self.fail_get_devices.get() {
            return Err(HostError::InvalidOperation);
        }
        Ok(self
            .devices
            .borrow()
            .iter()
            .filter(|d| filter.matches(d.category))
            .take(max)
            .map(SimulatedDevice::raw_info)
            .collect())
    }

    fn get_led_positions(&self, device_id: &str, max: usize) -> Result<Vec<RawLedPosition>> {
        self.ensure_connected()?;
        if self.fail_led_positions.get() {
            return Err(HostError::InvalidOperation);
        }
        self.with_device(device_id, |d| d.leds.iter().take(max).copied().collect())
    }

    fn get_led_colors(&self, device_id: &str, ids: &[LedId]) -> Result<Vec<LedColor>> {
        self.ensure_connected()?;
        if self.fail_led_colors.get() {
            return Err(HostError::InvalidOperation);
        }
        self.with_device(device_id, |d| {
            ids.iter()
                .filter(|&&id| d.has_led(id))
                .map(|&id| LedColor::new(id, d.colors.get(&id).copied().unwrap_or_default()))
                .collect()
        })
    }

    fn set_led_colors(&self, device_id: &str, colors: &[LedColor]) -> Result<()> {
        self.ensure_connected()?;
        if self.fail_set_colors.get() {
            return Err(HostError::InvalidOperation);
        }
        let mut devices = self.devices.borrow_mut();
        let device = devices
            .iter_mut()
            .find(|d| d.id == device_id)
            .ok_or(HostError::DeviceNotFound)?;
        // The whole batch is rejected if any entry is bad.
        if colors.iter().any(|c| !device.has_led(c.id)) {
            return Err(HostError::InvalidArguments);
        }
        for c in colors {
            device.colors.insert(c.id, c.rgba());
        }
        self.color_batches
            .borrow_mut()
            .push((device_id.to_string(), colors.to_vec()));
        Ok(())
    }

    fn request_control(&self, device_id: &str, level: AccessLevel) -> Result<()> {
        self.control_requests
            .borrow_mut()
            .push((device_id.to_string(), level));
        self.ensure_connected()?;
        self.with_device(device_id, |_| ())?;
        if self.deny_control.borrow().iter().any(|id| id == device_id) {
            return Err(HostError::NoControl);
        }
        self.control.borrow_mut().insert(device_id.to_string(), level);
        Ok(())
    }

    fn release_control(&self, device_id: &str) -> Result<()> {
        self.control_releases
            .borrow_mut()
            .push(device_id.to_string());
        self.ensure_connected()?;
        self.control.borrow_mut().remove(device_id);
        Ok(())
    }

    fn disconnect(&self) -> Result<()> {
        self.disconnects.set(self.disconnects.get() + 1);
        self.emit_state(HostSessionState::Closed);
        self.connected.set(false);
        self.state_handler.borrow_mut().take();
        self.event_handler.borrow_mut().take();
        self.control.borrow_mut().clear();
        if self.fail_disconnect.get() {
            return Err(HostError::InvalidOperation);
        }
        Ok(())
    }

    fn led_id_for_symbol(&self, device_id: &str, symbol: char) -> Result<Option<LedId>> {
        self.ensure_connected()?;
        self.with_device(device_id, |d| d.symbols.get(&symbol).copied())
    }

    fn subscribe_events(&self, handler: EventHandler) -> Result<()> {
        self.ensure_connected()?;
        if self.fail_subscribe.get() {
            return Err(HostError::NotAllowed);
        }
        *self.event_handler.borrow_mut() = Some(handler);
        Ok(())
    }

    fn unsubscribe_events(&self) -> Result<()> {
        self.event_handler.borrow_mut().take();
        Ok(())
    }
}

// ── Profiles ──

/// TOML description of a simulated host.
///
/// ```toml
/// [session]
/// server = "4.0.84"
///
/// [[devices]]
/// category = "keyboard"   # or a raw tag: 1, "0x20"
/// id = "{kb-1}"
/// model = "K95"
/// grid = 12
/// [devices.symbols]
/// a = 2
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HostProfile {
    pub session: ProfileSession,
    pub devices: Vec<ProfileDevice>,
}

impl HostProfile {
    pub fn parse(contents: &str) -> crate::error::Result<Self> {
        toml::from_str(contents).map_err(|e| CueError::Profile(e.to_string()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProfileSession {
    pub client: String,
    pub server: String,
    pub host: String,
}

impl Default for ProfileSession {
    fn default() -> Self {
        ProfileSession {
            client: CLIENT_VERSION.to_string(),
            server: SERVER_VERSION.to_string(),
            host: HOST_VERSION.to_string(),
        }
    }
}

impl ProfileSession {
    fn details(&self) -> crate::error::Result<SessionDetails> {
        let parse = |field: &str, value: &str| {
            value
                .parse::<Version>()
                .map_err(|e| CueError::Profile(format!("session.{field}: {e}")))
        };
        Ok(SessionDetails {
            client: parse("client", &self.client)?,
            server: parse("server", &self.server)?,
            host: parse("host", &self.host)?,
        })
    }
}

/// Category given by name (`"keyboard"`), raw tag (`2`) or hex tag (`"0x20"`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ProfileCategory {
    Tag(u32),
    Name(String),
}

impl ProfileCategory {
    fn tag(&self) -> crate::error::Result<u32> {
        match self {
            ProfileCategory::Tag(tag) => Ok(*tag),
            ProfileCategory::Name(name) => {
                if let Some(hex) = name.strip_prefix("0x").or_else(|| name.strip_prefix("0X")) {
                    return u32::from_str_radix(hex, 16)
                        .map_err(|_| CueError::Profile(format!("invalid category tag: {name}")));
                }
                name.parse::<crate::device::DeviceCategory>()
                    .map(|c| c.tag())
                    .map_err(CueError::Profile)
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileDevice {
    pub category: ProfileCategory,
    pub id: String,
    pub model: String,
    #[serde(default)]
    pub serial: String,
    #[serde(default)]
    pub channel_count: usize,
    /// Shorthand for LEDs `1..=grid` (see [`SimulatedDevice::with_grid`]).
    #[serde(default)]
    pub grid: u32,
    #[serde(default)]
    pub leds: Vec<ProfileLed>,
    /// Key symbol → LED id.
    #[serde(default)]
    pub symbols: BTreeMap<String, LedId>,
}

impl ProfileDevice {
    fn to_device(&self) -> crate::error::Result<SimulatedDevice> {
        let mut device = SimulatedDevice::new(self.category.tag()?, &self.id, &self.model)
            .with_serial(&self.serial)
            .with_channels(self.channel_count)
            .with_grid(self.grid);
        for led in &self.leds {
            device = device.with_led(led.id, led.cx, led.cy);
            if let Some(color) = &led.color {
                device = device.with_color(led.id, parse_color(color)?);
            }
        }
        for (symbol, &led) in &self.symbols {
            let mut chars = symbol.chars();
            let (Some(ch), None) = (chars.next(), chars.next()) else {
                return Err(CueError::Profile(format!(
                    "{}: symbol \"{symbol}\" must be a single character",
                    self.id
                )));
            };
            device = device.with_symbol(ch, led);
        }
        Ok(device)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileLed {
    pub id: LedId,
    pub cx: f64,
    pub cy: f64,
    /// Initial color reported by the host.
    #[serde(default)]
    pub color: Option<String>,
}

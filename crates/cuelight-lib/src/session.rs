//! Session lifecycle: connect, compatibility check, exclusive control,
//! reinitialize with identity verification, and teardown.
//!
//! ```text
//! Uninitialized --connect ok--------> Ready
//! Ready ---------reinitialize ok----> Ready
//! Ready/Failed --reinitialize err---> Failed
//! any ----------connect err---------> Uninitialized
//! any ----------disconnect----------> Uninitialized
//! ```
//!
//! A session owns its host. Nothing here is global, so independent sessions
//! can run side by side (each against its own host).

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

use crate::device::{Device, DeviceCategory};
use crate::error::{CueError, Result};
use crate::events::{KeyEvent, Subscription};
use crate::host::{DeviceFilter, Host, HostSessionState, StateChangeHandler};
use crate::led::{Led, LedGroup};
use crate::protocol::{DEVICE_COUNT_MAX, ProtocolDetails};
use crate::registry::DeviceRegistry;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionState {
    #[default]
    Uninitialized,
    Ready,
    /// Reinitialize failed. Devices are unavailable until a successful
    /// reinitialize or a fresh connect.
    Failed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Ready => "ready",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One logical connection to the lighting host and the devices it exposes.
pub struct Session<H: Host> {
    host: H,
    state: SessionState,
    /// True while the host holds an open session for us.
    connected: bool,
    protocol: Option<ProtocolDetails>,
    exclusive: bool,
    registry: DeviceRegistry,
    subscription: Option<Subscription>,
    host_state: Arc<AtomicU8>,
}

impl<H: Host> Session<H> {
    pub fn new(host: H) -> Self {
        Session {
            host,
            state: SessionState::Uninitialized,
            connected: false,
            protocol: None,
            exclusive: false,
            registry: DeviceRegistry::default(),
            subscription: None,
            host_state: Arc::new(AtomicU8::new(HostSessionState::Invalid.code())),
        }
    }

    // ── Accessors ──

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state == SessionState::Ready
    }

    /// Versions negotiated by the last successful connect.
    pub fn protocol_details(&self) -> Option<&ProtocolDetails> {
        self.protocol.as_ref()
    }

    pub fn has_exclusive_access(&self) -> bool {
        self.exclusive
    }

    /// Latest state reported by the host's state-change callback.
    pub fn host_session_state(&self) -> HostSessionState {
        HostSessionState::from_code(self.host_state.load(Ordering::Acquire))
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    // ── Lifecycle ──

    /// Open the session and enumerate devices.
    ///
    /// Fails with `AlreadyInitialized` when ready, leaving everything as it
    /// was. Any other failure rolls the session back to `Uninitialized`.
    pub fn connect(&mut self, exclusive: bool) -> Result<()> {
        if self.state == SessionState::Ready {
            return Err(CueError::AlreadyInitialized);
        }
        self.teardown();
        match self.establish(exclusive) {
            Ok((protocol, registry)) => {
                log::debug!(
                    "session ready ({protocol}), {} device(s), exclusive: {exclusive}",
                    registry.len()
                );
                self.protocol = Some(protocol);
                self.registry = registry;
                self.exclusive = exclusive;
                self.state = SessionState::Ready;
                Ok(())
            }
            Err(e) => {
                log::debug!("connect failed, rolling back: {e}");
                self.teardown();
                Err(e)
            }
        }
    }

    /// Close the session. Idempotent; host errors are logged and swallowed.
    pub fn disconnect(&mut self) {
        self.teardown();
    }

    /// Disconnect, reconnect and check that every tracked category still has
    /// a device of the same model.
    ///
    /// Pending writes are dropped first. On success the existing devices stay
    /// valid (with refreshed host info) and new categories are adopted. Any
    /// failure leaves the session `Failed` with the host disconnected and any
    /// freshly granted control released.
    pub fn reinitialize(&mut self, exclusive: bool) -> Result<()> {
        if self.state == SessionState::Uninitialized {
            return Err(CueError::NotInitialized);
        }
        if self.subscription.is_some() {
            return Err(CueError::SubscriptionConflict);
        }
        for device in self.registry.iter_mut() {
            device.reset_leds();
        }
        self.close_host();

        let result = self.establish(exclusive).and_then(|(protocol, fresh)| {
            match self.registry.verify_identity(&fresh) {
                Ok(()) => Ok((protocol, fresh)),
                Err(e) => {
                    if exclusive {
                        release_all(&self.host, &fresh);
                    }
                    Err(e)
                }
            }
        });
        match result {
            Ok((protocol, fresh)) => {
                self.registry.absorb(fresh);
                self.protocol = Some(protocol);
                self.exclusive = exclusive;
                self.state = SessionState::Ready;
                log::debug!("session reinitialized, exclusive: {exclusive}");
                Ok(())
            }
            Err(e) => {
                log::warn!("reinitialize failed: {e}");
                self.disconnect_host();
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    /// Reinitialize with the exclusive flag of the current session.
    pub fn reinitialize_same(&mut self) -> Result<()> {
        self.reinitialize(self.exclusive)
    }

    /// Whether the host (or, with `category`, a device of that category) is
    /// available.
    ///
    /// A ready session answers from its tracked devices. Otherwise the host is
    /// probed with a short connect that is closed again; the session stays
    /// in its current state.
    pub fn is_available(&mut self, category: Option<DeviceCategory>) -> bool {
        if self.state == SessionState::Ready {
            return category.is_none_or(|c| self.registry.get(c).is_some());
        }
        if let Err(e) = self.host.connect(self.state_handler()) {
            log::debug!("host not available: {e}");
            return false;
        }
        let available = match category {
            None => true,
            Some(c) => self
                .host
                .get_devices(
                    DeviceFilter {
                        category_mask: c.tag(),
                    },
                    DEVICE_COUNT_MAX,
                )
                .map(|records| records.iter().any(|r| r.category == c.tag()))
                .unwrap_or(false),
        };
        if let Err(e) = self.host.disconnect() {
            log::warn!("disconnect after availability probe failed: {e}");
        }
        self.connected = false;
        available
    }

    // ── Key events ──

    /// Register `handler` for key events. Replaces an existing subscription.
    ///
    /// While subscribed, [`Session::reinitialize`] is refused.
    pub fn subscribe_key_events<F>(&mut self, handler: F) -> Result<()>
    where
        F: FnMut(KeyEvent) + Send + 'static,
    {
        self.ensure_ready()?;
        self.unsubscribe_key_events()?;
        let subscription = Subscription::new();
        self.host
            .subscribe_events(subscription.forwarder(handler))
            .map_err(CueError::Host)?;
        self.subscription = Some(subscription);
        Ok(())
    }

    /// Drop the key-event subscription. Events the host still delivers are discarded.
    pub fn unsubscribe_key_events(&mut self) -> Result<()> {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
            if self.connected {
                self.host.unsubscribe_events().map_err(CueError::Host)?;
            }
        }
        Ok(())
    }

    // ── Devices ──

    /// Tracked devices, at most one per category.
    pub fn devices(&self) -> Result<&[Device]> {
        self.ensure_ready()?;
        Ok(self.registry.devices())
    }

    pub fn device(&self, category: DeviceCategory) -> Result<&Device> {
        self.ensure_ready()?;
        self.registry
            .get(category)
            .ok_or(CueError::DeviceNotFound(category))
    }

    pub fn device_mut(&mut self, category: DeviceCategory) -> Result<&mut Device> {
        self.ensure_ready()?;
        self.registry
            .get_mut(category)
            .ok_or(CueError::DeviceNotFound(category))
    }

    /// Keyboard LED for a key symbol. `None` without a keyboard or when the
    /// host cannot resolve the symbol.
    pub fn led_for_symbol(&self, symbol: char) -> Result<Option<&Led>> {
        self.ensure_ready()?;
        Ok(self
            .registry
            .get(DeviceCategory::Keyboard)
            .and_then(|kb| kb.led_for_symbol(&self.host, symbol)))
    }

    /// Collect the attached groups of one device and flush the batch.
    ///
    /// Only groups passed in `groups` are collected; attached groups left out
    /// contribute nothing. Writes staged earlier are flushed either way.
    pub fn flush(&mut self, category: DeviceCategory, groups: &[&LedGroup]) -> Result<usize> {
        self.ensure_ready()?;
        let device = self
            .registry
            .get_mut(category)
            .ok_or(CueError::DeviceNotFound(category))?;
        device.update(&self.host, groups)
    }

    /// Restore the saved colors of one device.
    pub fn restore(&mut self, category: DeviceCategory) -> Result<usize> {
        self.ensure_ready()?;
        let device = self
            .registry
            .get_mut(category)
            .ok_or(CueError::DeviceNotFound(category))?;
        device.restore_colors(&self.host)
    }

    /// Restore the saved colors of every device. All devices are attempted;
    /// the first error is returned.
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_ready()?;
        let mut first_error = None;
        for device in self.registry.iter_mut() {
            if let Err(e) = device.restore_colors(&self.host) {
                log::warn!("restoring {} failed: {e}", device.category());
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    // ── Internals ──

    fn ensure_ready(&self) -> Result<()> {
        if self.state == SessionState::Ready {
            Ok(())
        } else {
            Err(CueError::NotInitialized)
        }
    }

    fn state_handler(&self) -> StateChangeHandler {
        let slot = Arc::clone(&self.host_state);
        Box::new(move |state| {
            let previous = HostSessionState::from_code(slot.swap(state.code(), Ordering::AcqRel));
            if previous != state {
                log::debug!("host session state: {previous} -> {state}");
            }
        })
    }

    /// Connect, check the protocol and enumerate. Leaves the host connected
    /// on failure; callers decide how to unwind.
    fn establish(&mut self, exclusive: bool) -> Result<(ProtocolDetails, DeviceRegistry)> {
        self.host
            .connect(self.state_handler())
            .map_err(CueError::Connection)?;
        self.connected = true;

        let details = self
            .host
            .session_details()
            .map_err(CueError::Connection)?;
        let protocol = ProtocolDetails::from(details);
        if protocol.breaking_changes {
            return Err(CueError::Incompatible(protocol));
        }
        let registry = DeviceRegistry::enumerate(&self.host, exclusive)?;
        Ok((protocol, registry))
    }

    /// Release exclusive control and close the host session, best effort.
    fn close_host(&mut self) {
        if !self.connected {
            return;
        }
        if self.exclusive {
            release_all(&self.host, &self.registry);
        }
        self.disconnect_host();
    }

    fn disconnect_host(&mut self) {
        if !self.connected {
            return;
        }
        if let Err(e) = self.host.disconnect() {
            log::warn!("host disconnect failed: {e}");
        }
        self.connected = false;
    }

    fn teardown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
            if self.connected
                && let Err(e) = self.host.unsubscribe_events()
            {
                log::warn!("unsubscribing from host events failed: {e}");
            }
        }
        self.close_host();
        self.registry.clear();
        self.protocol = None;
        self.exclusive = false;
        self.state = SessionState::Uninitialized;
    }
}

/// Hand control of every device in `registry` back to the host, best effort.
fn release_all(host: &impl Host, registry: &DeviceRegistry) {
    for device in registry.iter() {
        if let Err(e) = host.release_control(device.id()) {
            log::warn!("releasing control of {} failed: {e}", device.id());
        }
    }
}

impl<H: Host> Drop for Session<H> {
    fn drop(&mut self) {
        self.teardown();
    }
}

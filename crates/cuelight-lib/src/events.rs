//! Key-event subscription handle.
//!
//! The host keeps one process-wide event handler. The session owns the
//! [`Subscription`] that backs it; cancelling the subscription turns the
//! registered forwarder into a sink, so events the host delivers after
//! unsubscribe never reach the caller.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::host::{EventHandler, HostEvent};

/// A key press or release reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyEvent {
    pub device_id: String,
    pub key_id: u32,
    pub pressed: bool,
}

/// Live registration of a key-event handler with the host.
#[derive(Debug)]
pub struct Subscription {
    active: Arc<AtomicBool>,
}

impl Subscription {
    pub(crate) fn new() -> Self {
        Subscription {
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Wrap `handler` into the callback registered with the host.
    ///
    /// Key events go to `handler` while the subscription is active. Device
    /// connection changes are only logged.
    pub(crate) fn forwarder<F>(&self, mut handler: F) -> EventHandler
    where
        F: FnMut(KeyEvent) + Send + 'static,
    {
        let active = Arc::clone(&self.active);
        Box::new(move |event| {
            if !active.load(Ordering::Acquire) {
                log::debug!("dropping host event after unsubscribe: {event:?}");
                return;
            }
            match event {
                HostEvent::Key {
                    device_id,
                    key_id,
                    pressed,
                } => handler(KeyEvent {
                    device_id,
                    key_id,
                    pressed,
                }),
                HostEvent::DeviceConnectionChanged {
                    device_id,
                    connected,
                } => {
                    let what = if connected { "connected" } else { "disconnected" };
                    log::info!("device {device_id} {what}");
                }
            }
        })
    }

    pub(crate) fn cancel(&self) {
        self.active.store(false, Ordering::Release);
    }
}

//! Shared ownership of one identity service.

use std::cell::{RefCell, RefMut};
use std::rc::Rc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::warn;
use waygate_protocol::{LocalSlot, UniquePlayerId};

use crate::{
    CompletionSender, IdentityError, IdentityEvent, IdentityService, LoginCredentials,
    LoginStatus,
};

/// A cloneable, single-threaded handle to an [`IdentityService`].
///
/// Several subsystems may hold one and each tick it every frame; the
/// service's tick gate makes sure time advances once per frame.
///
/// Calls borrow the service for their duration. Mutating calls made from
/// inside another call (a privilege callback reaching back through a
/// clone of the handle) fail with [`IdentityError::ServiceBusy`].
#[derive(Clone)]
pub struct IdentityHandle {
    inner: Rc<RefCell<IdentityService>>,
}

impl IdentityHandle {
    pub fn new(service: IdentityService) -> Self {
        Self {
            inner: Rc::new(RefCell::new(service)),
        }
    }

    /// Exclusive access, or [`IdentityError::ServiceBusy`] when called
    /// from inside another call on the same service.
    fn service_mut(&self) -> Result<RefMut<'_, IdentityService>, IdentityError> {
        self.inner.try_borrow_mut().map_err(|_| {
            warn!("re-entrant call into the identity service refused");
            IdentityError::ServiceBusy
        })
    }

    /// See [`IdentityService::tick`]. A re-entrant tick is skipped.
    pub fn tick(&self, dt: Duration, toggle: u64) {
        if let Ok(mut service) = self.service_mut() {
            service.tick(dt, toggle);
        }
    }

    /// See [`IdentityService::login`].
    pub fn login(&self, slot: LocalSlot, credentials: LoginCredentials) -> Result<(), IdentityError> {
        self.service_mut()?.login(slot, credentials)
    }

    /// See [`IdentityService::auto_login`].
    pub fn auto_login(&self, slot: LocalSlot) -> Result<(), IdentityError> {
        self.service_mut()?.auto_login(slot)
    }

    /// See [`IdentityService::logout`].
    pub fn logout(&self, slot: LocalSlot) -> Result<(), IdentityError> {
        self.service_mut()?.logout(slot)
    }

    /// See [`IdentityService::on_login_complete`]. A re-entrant completion
    /// is dropped; queue it through a [`CompletionSender`] instead.
    pub fn on_login_complete(&self, slot: LocalSlot, payload: &str, success: bool) {
        if let Ok(mut service) = self.service_mut() {
            service.on_login_complete(slot, payload, success);
        }
    }

    pub fn login_status(&self, slot: LocalSlot) -> LoginStatus {
        self.inner.borrow().login_status(slot)
    }

    pub fn unique_player_id(&self, slot: LocalSlot) -> Option<UniquePlayerId> {
        self.inner.borrow().unique_player_id(slot).cloned()
    }

    pub fn is_login_outstanding(&self) -> bool {
        self.inner.borrow().is_login_outstanding()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IdentityEvent> {
        self.inner.borrow().subscribe()
    }

    pub fn completion_sender(&self) -> CompletionSender {
        self.inner.borrow().completion_sender()
    }

    /// Runs `f` with shared access, for queries without a shortcut here.
    pub fn with<R>(&self, f: impl FnOnce(&IdentityService) -> R) -> R {
        f(&self.inner.borrow())
    }

    /// Number of handles sharing this service.
    pub fn owners(&self) -> usize {
        Rc::strong_count(&self.inner)
    }
}

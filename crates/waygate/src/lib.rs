//! # Waygate
//!
//! Implicit-grant identity service for games and tools.
//!
//! Waygate signs local users in against an external identity provider:
//! it hands the provider's authorization URL to the host, waits (tick by
//! tick, with a timeout) for the host to report the redirect, parses the
//! account out of it, and keeps one account record per local user slot.
//!
//! Everything runs on the owning thread. The host drives it with
//! [`IdentityService::tick`] every frame and hears about outcomes through
//! [`IdentityEvent`] notifications.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use waygate::prelude::*;
//!
//! struct PrintPresenter;
//!
//! impl LoginPresenter for PrintPresenter {
//!     fn present(&mut self, slot: LocalSlot, url: &str) -> Result<(), String> {
//!         println!("{slot}: open {url}");
//!         Ok(())
//!     }
//! }
//!
//! let config = ProviderConfig {
//!     endpoint: "https://auth.example.com/authorize".into(),
//!     redirect_url: "https://game.example.com/cb".into(),
//!     client_id: "my-game".into(),
//!     ..ProviderConfig::default()
//! };
//! let mut identity = IdentityService::new(config, PrintPresenter);
//! let mut events = identity.subscribe();
//!
//! identity.login(LocalSlot(0), LoginCredentials::of_kind("implicit"))?;
//! for frame in 0u64.. {
//!     identity.tick(Duration::from_millis(16), frame);
//!     if let Ok(event) = events.try_recv() {
//!         println!("{event:?}");
//!         break;
//!     }
//! }
//! # Ok::<(), IdentityError>(())
//! ```

mod collaborator;
mod config;
mod driver;
mod error;
mod events;
mod handle;
mod service;
mod types;

pub use collaborator::{Completion, CompletionSender, LoginPresenter};
pub use config::{ProviderConfig, ValidatedConfig};
pub use driver::IdentityDriver;
pub use error::IdentityError;
pub use events::{IdentityEvent, DEFAULT_EVENT_CAPACITY};
pub use handle::IdentityHandle;
pub use service::IdentityService;
pub use types::{LoginCredentials, LoginStatus, UserPrivilege};

pub use waygate_protocol::{
    parse_login_results, AccountRecord, LocalSlot, LoginResults, OnlineAccount, OnlineUser,
    UniquePlayerId,
};
pub use waygate_session::LoginState;
pub use waygate_tick::{TickConfig, TickInfo, TickScheduler};

/// Convenience re-exports for hosts.
pub mod prelude {
    pub use crate::{
        AccountRecord, CompletionSender, IdentityDriver, IdentityError, IdentityEvent,
        IdentityHandle, IdentityService, LocalSlot, LoginCredentials, LoginPresenter,
        LoginState, LoginStatus, OnlineAccount, OnlineUser, ProviderConfig, TickScheduler,
        UniquePlayerId, UserPrivilege,
    };
}

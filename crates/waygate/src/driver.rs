//! Ticks an identity service from a [`TickScheduler`].
//!
//! For hosts without a frame loop (tools, servers, the demo). A game with
//! its own loop calls [`IdentityHandle::tick`] directly instead.

use tracing::debug;
use waygate_tick::{TickInfo, TickScheduler};

use crate::IdentityHandle;

/// Pairs a handle with a fixed-rate tick source.
pub struct IdentityDriver {
    handle: IdentityHandle,
    scheduler: TickScheduler,
}

impl IdentityDriver {
    pub fn new(handle: IdentityHandle, scheduler: TickScheduler) -> Self {
        Self { handle, scheduler }
    }

    /// Waits for the next tick and delivers it.
    ///
    /// The tick number is the frame toggle, so other owners of the same
    /// handle may tick it in between without double-counting.
    pub async fn step(&mut self) -> TickInfo {
        let info = self.scheduler.wait_for_tick().await;
        self.handle.tick(info.dt, info.tick);
        info
    }

    /// Ticks until no login is outstanding. Returns the number of ticks
    /// delivered (0 if nothing was pending).
    pub async fn run_until_idle(&mut self) -> u64 {
        let mut ticks = 0;
        while self.handle.is_login_outstanding() {
            self.step().await;
            ticks += 1;
        }
        debug!(ticks, "identity service idle");
        ticks
    }
}

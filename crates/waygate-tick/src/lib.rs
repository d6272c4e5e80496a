//! Frame ticking for Waygate.
//!
//! Two pieces:
//!
//! - [`TickGate`]: lets several owners tick the same service every frame
//!   while time only advances once per frame.
//! - [`TickScheduler`]: a fixed-rate tick source for hosts that don't
//!   have a frame loop of their own. It yields [`TickInfo`] with the fixed
//!   delta and a tick number that doubles as the frame toggle.
//!
//! # Integration
//!
//! ```ignore
//! loop {
//!     let info = scheduler.wait_for_tick().await;
//!     identity.tick(info.dt, info.tick);
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// TickGate
// ---------------------------------------------------------------------------

/// Deduplicates ticks within one frame.
///
/// A service shared by several owners gets ticked once per owner per
/// frame. Each caller passes the frame's toggle value; the gate admits
/// the first call carrying a new toggle and turns away repeats.
#[derive(Debug, Default, Clone)]
pub struct TickGate {
    last_toggle: Option<u64>,
}

impl TickGate {
    /// A gate that admits the first toggle it sees, whatever its value.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `toggle` differs from the previous admitted one.
    pub fn admit(&mut self, toggle: u64) -> bool {
        if self.last_toggle == Some(toggle) {
            trace!(toggle, "duplicate tick in frame ignored");
            return false;
        }
        self.last_toggle = Some(toggle);
        true
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the tick scheduler.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Tick rate in Hz, 1 to [`Self::MAX_TICK_RATE_HZ`].
    pub tick_rate_hz: u32,
    /// Random jitter (0–max µs) added to the first tick so schedulers
    /// created at the same instant don't fire in lockstep.
    pub initial_jitter_us: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 10,
            initial_jitter_us: 2_000,
        }
    }
}

impl TickConfig {
    /// Maximum supported tick rate.
    pub const MAX_TICK_RATE_HZ: u32 = 128;

    /// A config for a specific tick rate with default jitter.
    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Default::default()
        }
    }

    /// Clamps `tick_rate_hz` into `1..=MAX_TICK_RATE_HZ`.
    ///
    /// Called automatically by [`TickScheduler::new`].
    pub fn validated(mut self) -> Self {
        let clamped = self.tick_rate_hz.clamp(1, Self::MAX_TICK_RATE_HZ);
        if clamped != self.tick_rate_hz {
            warn!(
                rate = self.tick_rate_hz,
                clamped,
                "tick_rate_hz out of range, clamping"
            );
            self.tick_rate_hz = clamped;
        }
        self
    }

    /// Duration of a single tick.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz.max(1) as f64)
    }
}

// ---------------------------------------------------------------------------
// TickInfo
// ---------------------------------------------------------------------------

/// A fired tick, returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickInfo {
    /// Monotonically increasing tick number (starts at 1). Distinct for
    /// every tick, so it serves as the frame toggle for a [`TickGate`].
    pub tick: u64,
    /// Fixed delta time for this tick.
    pub dt: Duration,
    /// `true` if this tick fired more than 10% late.
    pub overrun: bool,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-rate tick source.
///
/// Overruns skip ahead: the next tick is always scheduled one period
/// after the late one fired, never in a catch-up burst.
pub struct TickScheduler {
    config: TickConfig,
    tick_duration: Duration,
    tick_count: u64,
    next_tick: Instant,
    paused: bool,
}

impl TickScheduler {
    /// Creates a scheduler. The first tick fires one period (plus jitter)
    /// from now.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let tick_duration = config.tick_duration();

        let jitter = if config.initial_jitter_us > 0 {
            Duration::from_micros(rand::rng().random_range(0..config.initial_jitter_us))
        } else {
            Duration::ZERO
        };

        debug!(
            rate_hz = config.tick_rate_hz,
            period_ms = tick_duration.as_secs_f64() * 1000.0,
            "tick scheduler created"
        );

        Self {
            config,
            tick_duration,
            tick_count: 0,
            next_tick: Instant::now() + tick_duration + jitter,
            paused: false,
        }
    }

    /// A scheduler for a specific tick rate with default settings.
    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self::new(TickConfig::with_rate(tick_rate_hz))
    }

    /// Waits until the next tick is due.
    ///
    /// While paused this future pends forever; `tokio::select!` still
    /// services its other branches.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        if self.paused {
            std::future::pending::<()>().await;
        }

        let due = self.next_tick;
        time::sleep_until(due).await;

        let now = Instant::now();
        let late_by = now.saturating_duration_since(due);
        let overrun = late_by > self.tick_duration / 10;
        if overrun {
            warn!(
                tick = self.tick_count + 1,
                late_ms = late_by.as_secs_f64() * 1000.0,
                "tick overrun, skipping ahead"
            );
        }

        self.tick_count += 1;
        self.next_tick = now + self.tick_duration;
        trace!(tick = self.tick_count, overrun, "tick fired");

        TickInfo {
            tick: self.tick_count,
            dt: self.tick_duration,
            overrun,
        }
    }

    /// Stops ticks until [`resume`](Self::resume). Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.tick_count, "tick scheduler paused");
        }
    }

    /// Resumes after a pause. The next tick fires one period from now,
    /// so time spent paused is not replayed.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.next_tick = Instant::now() + self.tick_duration;
            debug!(tick = self.tick_count, "tick scheduler resumed");
        }
    }

    /// Whether the scheduler is paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Ticks fired so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// The configured tick rate in Hz.
    pub fn tick_rate_hz(&self) -> u32 {
        self.config.tick_rate_hz
    }

    /// The fixed tick period.
    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }
}

//! Time for the lobby engine.
//!
//! The engine never reads the wall clock directly. It asks a [`Clock`]
//! for milliseconds, which lets tests drive every timeout by hand with a
//! [`ManualClock`]. On top of that:
//!
//! - [`Cadence`] answers "has a period elapsed since I last acted?" and
//!   paces the engine's throttle and its periodic re-announcements.
//! - [`UpdateScheduler`] wakes an async loop at a fixed interval so the
//!   engine's `update()` runs even when no datagrams arrive.
//!
//! # Integration
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* forward user requests */ }
//!         _ = scheduler.wait_for_update() => {
//!             api.update();
//!             scheduler.record_update_end();
//!         }
//!     }
//! }
//! ```

mod cadence;
mod clock;
mod scheduler;

pub use cadence::Cadence;
pub use clock::{Clock, ManualClock, SystemClock};
pub use scheduler::{UpdateConfig, UpdateInfo, UpdateScheduler};

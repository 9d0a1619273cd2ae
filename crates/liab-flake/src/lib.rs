//! Flake identifier generator for liab.
//!
//! Issues strictly increasing [`Flake`](liab_types::Flake) identifiers from a
//! wall clock, a worker tag and a per-millisecond sequence. The last issued
//! state is read and written through caller-supplied accessors, so the
//! generator has no storage dependency of its own; the caller runs those
//! accessors inside whatever exclusive transaction makes the read-modify-write
//! race-free.
//!
//! Two conditions are recovered locally by blocking and retrying:
//!
//! - the persisted timestamp is ahead of the clock (clock moved backwards)
//! - all sequence values for the current millisecond are used

pub mod clock;
pub mod error;
pub mod generator;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Backoff, FlakeError, FlakeResult};
pub use generator::{FlakeGenerator, RetryPolicy};
pub use state::FlakeState;

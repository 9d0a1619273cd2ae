use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use liab_types::{Flake, FlakeConfig};

use crate::clock::{Clock, SystemClock};
use crate::error::{Backoff, FlakeError, FlakeResult};
use crate::state::FlakeState;

/// Optional ceilings on the generator's wait-and-retry loop.
///
/// Both bounds are off by default, so a generator facing sustained clock
/// skew keeps waiting. Setting either one turns an over-long wait into
/// [`FlakeError::RetriesExhausted`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of backoffs before giving up.
    pub max_attempts: Option<u32>,
    /// Maximum total milliseconds spent waiting before giving up.
    pub max_wait_ms: Option<u64>,
}

impl RetryPolicy {
    /// Wait and retry forever.
    pub fn unbounded() -> Self {
        Self::default()
    }

    fn allows(&self, attempts: u32, waited_ms: u64) -> bool {
        self.max_attempts.map_or(true, |max| attempts <= max)
            && self.max_wait_ms.map_or(true, |max| waited_ms <= max)
    }
}

/// Issues flakes from a clock and injected state accessors.
///
/// The generator itself is stateless between calls: the last issuance is
/// loaded with `read_state` and stored with `write_state` on every call.
/// Strict monotonicity therefore holds only while the caller keeps each
/// read-modify-write exclusive, e.g. inside a single write transaction.
#[derive(Clone)]
pub struct FlakeGenerator {
    config: FlakeConfig,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl FlakeGenerator {
    /// Create a generator, validating the layout once.
    pub fn new(config: FlakeConfig, retry: RetryPolicy, clock: Arc<dyn Clock>) -> FlakeResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            retry,
            clock,
        })
    }

    /// Generator on the system clock with unbounded retries.
    pub fn with_system_clock(config: FlakeConfig) -> FlakeResult<Self> {
        Self::new(config, RetryPolicy::unbounded(), Arc::new(SystemClock))
    }

    pub fn config(&self) -> &FlakeConfig {
        &self.config
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Issue the next identifier for `worker_id`.
    ///
    /// On clock regression or sequence overrun the calling thread sleeps and
    /// the whole operation is retried, re-reading the state each time.
    /// Accessor errors propagate unchanged.
    pub fn next<E, R, W>(&self, worker_id: u32, mut read_state: R, mut write_state: W) -> Result<Flake, E>
    where
        E: From<FlakeError>,
        R: FnMut() -> Result<Option<FlakeState>, E>,
        W: FnMut(&FlakeState) -> Result<(), E>,
    {
        let max = self.config.max_worker_id();
        if worker_id > max {
            return Err(FlakeError::WorkerOutOfRange { worker_id, max }.into());
        }

        let mut attempts = 0u32;
        let mut waited_ms = 0u64;
        loop {
            let mut state = read_state()?.unwrap_or_default();
            let now = self.clock.now_ms();

            match self.advance(&mut state, now) {
                None => {
                    let id = Flake::compose(&self.config, now, worker_id, state.sequence)
                        .map_err(FlakeError::from)?;
                    write_state(&state)?;
                    debug!(%id, sequence = state.sequence, attempts, "flake issued");
                    return Ok(id);
                }
                Some(backoff) => {
                    attempts += 1;
                    waited_ms = waited_ms.saturating_add(backoff.wait_ms());
                    if !self.retry.allows(attempts, waited_ms) {
                        return Err(FlakeError::RetriesExhausted {
                            attempts,
                            waited_ms,
                            last: backoff,
                        }
                        .into());
                    }
                    warn!(reason = %backoff, wait_ms = backoff.wait_ms(), attempts, "flake generation backing off");
                    self.clock.sleep_ms(backoff.wait_ms());
                }
            }
        }
    }

    /// Move `state` to `now`, or say why issuance must wait.
    fn advance(&self, state: &mut FlakeState, now: u64) -> Option<Backoff> {
        if state.last > now {
            return Some(Backoff::ClockRegressed {
                wait_ms: state.last - now,
            });
        }
        if state.last == now {
            state.sequence = state.sequence.wrapping_add(1) & self.config.sequence_mask();
            if state.sequence == 0 {
                return Some(Backoff::SequenceExhausted { wait_ms: 1 });
            }
        } else {
            state.sequence = 0;
        }
        state.last = now;
        None
    }
}

impl fmt::Debug for FlakeGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlakeGenerator")
            .field("config", &self.config)
            .field("retry", &self.retry)
            .finish()
    }
}

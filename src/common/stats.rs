//! Lexing statistics: token counters and wall-clock timing.

use std::time::Duration;

use quanta::{Clock, Instant};

#[derive(Clone, Debug, Default)]
pub struct LexStats {
  pub consumed_token_count: u64,
  pub peeked_token_count: u64,
  pub lex_time: Duration,
}

/// Wall-clock timer for a single phase.
pub struct PhaseTimer {
  clock: Clock,
  start: Instant,
}

impl PhaseTimer {
  pub fn start() -> Self {
    let clock = Clock::new();
    let start = clock.now();
    PhaseTimer { clock, start }
  }

  pub fn elapsed(&self) -> Duration {
    self.clock.now() - self.start
  }
}

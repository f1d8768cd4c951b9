use std::time::Duration;

use crate::constants;

const NANOS_PER_SECOND: u128 = 1_000_000_000;

/// Turns elapsed wall-clock time into a whole number of events at a fixed rate,
/// carrying the leftover fraction into the next call so the long-run count never drifts.
#[derive(Debug, Clone)]
pub struct Ticker {
    hz: u32,
    // elapsed nanoseconds times `hz`, below one full event
    remainder: u128,
}

impl Ticker {
    pub fn new(hz: u32) -> Self {
        Self { hz, remainder: 0 }
    }

    pub fn advance(&mut self, elapsed: Duration) -> u64 {
        let total = self.remainder + elapsed.as_nanos() * self.hz as u128;
        self.remainder = total % NANOS_PER_SECOND;
        (total / NANOS_PER_SECOND) as u64
    }
}

/// How many instruction steps and timer ticks are due for one slice of real time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    pub steps: u64,
    pub ticks: u64,
}

/// Paces the VM: an instruction clock at a configurable rate and the fixed 60 Hz timer clock.
#[derive(Debug, Clone)]
pub struct Pacer {
    instructions: Ticker,
    timers: Ticker,
}

impl Pacer {
    pub fn new(instructions_per_second: u32) -> Self {
        Self {
            instructions: Ticker::new(instructions_per_second),
            timers: Ticker::new(constants::TIMER_HZ),
        }
    }

    pub fn advance(&mut self, elapsed: Duration) -> Budget {
        Budget {
            steps: self.instructions.advance(elapsed),
            ticks: self.timers.advance(elapsed),
        }
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new(constants::INSTRUCTIONS_PER_SECOND)
    }
}

// Draw state machine.
//
// Pure transitions only: no timers, no I/O. The engine feeds ticks and
// remote results in, each tagged with the cycle that produced it, and a
// result from any other cycle is ignored.

use crate::pool::CandidatePool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawStatus {
    #[default]
    Idle,
    /// Start pressed; waiting for the candidate pool.
    Loading,
    Spinning,
    /// Stopped; waiting for the commit response.
    Settling,
}

/// What a finished pool load did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Spinning,
    /// No prizes left. The draw stays disabled from now on.
    Disabled,
    NoEntrants,
}

/// Read-only view of the session for the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrawSnapshot {
    pub status: DrawStatus,
    pub displayed: Option<u64>,
    pub disabled: bool,
    pub pool_size: usize,
    pub remaining_prizes: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct DrawSession {
    status: DrawStatus,
    /// Incremented on every start. Identifies ticks and responses.
    cycle: u64,
    index: usize,
    displayed: Option<u64>,
    pool: CandidatePool,
    disabled: bool,
    remaining_prizes: Option<u32>,
}

impl DrawSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> DrawStatus {
        self.status
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn displayed(&self) -> Option<u64> {
        self.displayed
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn snapshot(&self) -> DrawSnapshot {
        DrawSnapshot {
            status: self.status,
            displayed: self.displayed,
            disabled: self.disabled,
            pool_size: self.pool.len(),
            remaining_prizes: self.remaining_prizes,
        }
    }

    /// Idle -> Loading. Returns the new cycle id, or `None` when the press
    /// is ignored (disabled, or not idle).
    pub fn begin_start(&mut self) -> Option<u64> {
        if self.disabled || self.status != DrawStatus::Idle {
            return None;
        }
        self.cycle += 1;
        self.status = DrawStatus::Loading;
        Some(self.cycle)
    }

    /// Loading -> Spinning (or back to Idle) with a fresh pool. `None` when
    /// the result belongs to another cycle.
    pub fn pool_loaded(&mut self, cycle: u64, pool: CandidatePool) -> Option<StartOutcome> {
        if !self.is_current(cycle, DrawStatus::Loading) {
            return None;
        }
        self.remaining_prizes = Some(pool.remaining_prizes);

        if pool.remaining_prizes == 0 {
            self.disabled = true;
            self.status = DrawStatus::Idle;
            self.pool = pool;
            return Some(StartOutcome::Disabled);
        }
        if pool.is_empty() {
            self.status = DrawStatus::Idle;
            self.pool = pool;
            return Some(StartOutcome::NoEntrants);
        }

        self.index = 0;
        self.displayed = pool.numbers.first().copied();
        self.pool = pool;
        self.status = DrawStatus::Spinning;
        Some(StartOutcome::Spinning)
    }

    /// Loading -> Idle after a failed pool load.
    pub fn pool_failed(&mut self, cycle: u64) -> bool {
        if !self.is_current(cycle, DrawStatus::Loading) {
            return false;
        }
        self.status = DrawStatus::Idle;
        true
    }

    /// Advance one position, wrapping at the end of the pool. Returns the
    /// new displayed number, or `None` for a stale tick.
    pub fn tick(&mut self, cycle: u64) -> Option<u64> {
        if !self.is_current(cycle, DrawStatus::Spinning) || self.pool.is_empty() {
            return None;
        }
        self.index = (self.index + 1) % self.pool.len();
        self.displayed = Some(self.pool.numbers[self.index]);
        self.displayed
    }

    /// Spinning -> Settling. Freezes and returns `(cycle, number)` to commit.
    pub fn stop(&mut self) -> Option<(u64, u64)> {
        if self.status != DrawStatus::Spinning {
            return None;
        }
        let number = self.displayed?;
        self.status = DrawStatus::Settling;
        Some((self.cycle, number))
    }

    /// Settling -> Idle once the commit has answered.
    pub fn settle(&mut self, cycle: u64) -> bool {
        if !self.is_current(cycle, DrawStatus::Settling) {
            return false;
        }
        self.status = DrawStatus::Idle;
        true
    }

    /// Abandon a pending start or a spin without committing. Outstanding
    /// results for the old cycle become stale. A commit already in flight
    /// (Settling) is left alone.
    pub fn cancel(&mut self) -> bool {
        match self.status {
            DrawStatus::Loading | DrawStatus::Spinning => {
                self.cycle += 1;
                self.status = DrawStatus::Idle;
                true
            }
            DrawStatus::Idle | DrawStatus::Settling => false,
        }
    }

    fn is_current(&self, cycle: u64, status: DrawStatus) -> bool {
        self.cycle == cycle && self.status == status
    }
}

// Draw engine: state machine, spin timer, and commit reconciliation.

pub mod engine;
pub mod outcome;
pub mod state;

pub use engine::{DrawEngine, PoolEffect, Settled, ToggleEffect};
pub use outcome::{CommitOutcome, OutcomeSource, WinnerOutcome};
pub use state::{DrawSession, DrawSnapshot, DrawStatus};

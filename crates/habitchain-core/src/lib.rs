//! # habitchain Core Library
//!
//! This library holds the authoritative rules for staked habit
//! commitments: a user escrows a stake, promises to repeat a habit a fixed
//! number of times per period for a number of consecutive periods, and
//! either recovers the stake or forfeits it to a beneficiary.
//!
//! ## Architecture
//!
//! - **Ledger**: append-only arena of habit records with one lock per record
//! - **Engines**: `commit`, `done`, `claim_stake` and
//!   `claim_broken_commitment` as checked state transitions
//! - **Clock / TransferSink**: injected time source and payout channel
//! - **Storage**: SQLite persistence of habits and payouts, TOML configuration
//!
//! ## Key Components
//!
//! - [`HabitManager`]: entry point wiring the engines to a clock and a sink
//! - [`Habit`]: one staked commitment and its progress
//! - [`Database`]: ledger persistence
//! - [`Config`]: application configuration management

pub mod clock;
pub mod engine;
pub mod error;
pub mod events;
pub mod habit;
pub mod storage;
pub mod transfer;

pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::{CommitRequest, HabitLedger, HabitManager};
pub use error::{ConfigError, CoreError, DatabaseError, HabitError, TransferError, ValidationError};
pub use events::Event;
pub use habit::{
    Accomplishment, Address, Amount, Commitment, Habit, HabitData, HabitId, HabitStatus,
    OwnedHabit, Timeframe,
};
pub use storage::{Config, Database, PayoutSink};
pub use transfer::{InMemorySink, Payout, PayoutKind, TransferSink};

//! Commitment, accomplishment and settlement engines.
//!
//! The engines are plain functions over a single [`crate::habit::Habit`];
//! [`HabitManager`] supplies the time, the transfer sink and the per-record
//! locking of [`HabitLedger`].

mod accomplishment;
mod commitment;
mod ledger;
mod manager;
mod settlement;

pub use commitment::CommitRequest;
pub use ledger::HabitLedger;
pub use manager::HabitManager;

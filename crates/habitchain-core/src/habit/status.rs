//! Derived lifecycle status of a habit.
//!
//! ```text
//! AwaitingPeriodStart -> InPeriod -> (InPeriod | Broken)
//!                                 -> ClaimableByOwner
//! Broken | ClaimableByOwner -> Settled
//! ```
//!
//! Nothing here mutates a record; the status is recomputed from the
//! stored fields and the caller's notion of "now".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Habit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HabitStatus {
    /// The current period begins in the future.
    AwaitingPeriodStart,
    /// Inside the current window with `times_left` accomplishments to go.
    InPeriod { times_left: u32 },
    /// The period lapsed with its target unmet; the beneficiary can be paid.
    Broken,
    /// The chain target is reached; the owner can claim the stake.
    ClaimableByOwner,
    /// Stake released to one of the two parties.
    Settled,
}

impl HabitStatus {
    /// Classify `habit` at instant `now`.
    ///
    /// A habit whose chain target is reached reports `ClaimableByOwner`
    /// even if a later period has lapsed; both claims stay possible until
    /// one of them settles the record.
    pub fn at(habit: &Habit, now: DateTime<Utc>) -> Self {
        if habit.stake_claimed() {
            HabitStatus::Settled
        } else if habit.chain_commitment_reached() {
            HabitStatus::ClaimableByOwner
        } else if habit.is_broken_at(now) {
            HabitStatus::Broken
        } else if now < habit.accomplishment().period_start {
            HabitStatus::AwaitingPeriodStart
        } else {
            HabitStatus::InPeriod {
                times_left: habit.times_left(),
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, HabitStatus::Settled)
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::habit::{Address, Amount, HabitId};

/// Every successful mutation of the ledger produces an Event.
/// The CLI prints them; embedders can drain them from the manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    HabitCommitted {
        habit_id: HabitId,
        owner: Address,
        beneficiary: Address,
        stake: Amount,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    /// A `done` call counted toward the current period.
    AccomplishmentRecorded {
        habit_id: HabitId,
        times_accomplished: u32,
        times_left: u32,
        at: DateTime<Utc>,
    },
    /// A `done` call completed the period and extended the chain.
    PeriodRolledOver {
        habit_id: HabitId,
        chain: u32,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    StakeClaimed {
        habit_id: HabitId,
        owner: Address,
        amount: Amount,
        at: DateTime<Utc>,
    },
    /// Stake forfeited to the beneficiary after a broken period.
    CommitmentSlashed {
        habit_id: HabitId,
        beneficiary: Address,
        caller: Address,
        amount: Amount,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn habit_id(&self) -> HabitId {
        match self {
            Event::HabitCommitted { habit_id, .. }
            | Event::AccomplishmentRecorded { habit_id, .. }
            | Event::PeriodRolledOver { habit_id, .. }
            | Event::StakeClaimed { habit_id, .. }
            | Event::CommitmentSlashed { habit_id, .. } => *habit_id,
        }
    }
}

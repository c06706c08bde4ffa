//! Habit records.
//!
//! A [`Habit`] is one staked pledge. Its commitment and identity fields are
//! fixed at creation; only the engines in [`crate::engine`] change the
//! accomplishment state and the claim flag.

mod status;
mod types;

pub use status::HabitStatus;
pub use types::{Address, Amount, HabitId, Timeframe};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the owner promised. Immutable after `commit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    pub timeframe: Timeframe,
    pub times_per_timeframe: u32,
    /// Number of completed periods needed to recover the stake.
    pub chain_commitment: u32,
}

/// Progress through the current period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accomplishment {
    pub chain: u32,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub period_times_accomplished: u32,
    /// Proofs submitted during the current period only.
    pub proofs: Vec<String>,
}

/// One staked habit commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    id: HabitId,
    owner: Address,
    beneficiary: Address,
    name: String,
    description: String,
    commitment: Commitment,
    pub(crate) accomplishment: Accomplishment,
    stake: Amount,
    pub(crate) stake_claimed: bool,
}

impl Habit {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: HabitId,
        owner: Address,
        beneficiary: Address,
        name: String,
        description: String,
        commitment: Commitment,
        accomplishment: Accomplishment,
        stake: Amount,
    ) -> Self {
        Self {
            id,
            owner,
            beneficiary,
            name,
            description,
            commitment,
            accomplishment,
            stake,
            stake_claimed: false,
        }
    }

    pub fn id(&self) -> HabitId {
        self.id
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn beneficiary(&self) -> &Address {
        &self.beneficiary
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn commitment(&self) -> &Commitment {
        &self.commitment
    }

    pub fn accomplishment(&self) -> &Accomplishment {
        &self.accomplishment
    }

    pub fn stake(&self) -> Amount {
        self.stake
    }

    pub fn stake_claimed(&self) -> bool {
        self.stake_claimed
    }

    pub fn is_owned_by(&self, address: &Address) -> bool {
        &self.owner == address
    }

    /// Accomplishments still needed to close the current period.
    pub fn times_left(&self) -> u32 {
        self.commitment
            .times_per_timeframe
            .saturating_sub(self.accomplishment.period_times_accomplished)
    }

    /// Total `done` calls needed over the whole commitment.
    pub fn total_accomplishments_required(&self) -> u64 {
        u64::from(self.commitment.chain_commitment) * u64::from(self.commitment.times_per_timeframe)
    }

    pub fn chain_commitment_reached(&self) -> bool {
        self.accomplishment.chain >= self.commitment.chain_commitment
    }

    /// True once `now` is past the period end with the target unmet.
    pub fn is_broken_at(&self, now: DateTime<Utc>) -> bool {
        now > self.accomplishment.period_end
            && self.accomplishment.period_times_accomplished < self.commitment.times_per_timeframe
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> HabitStatus {
        HabitStatus::at(self, now)
    }

    /// Read view returned by `get_habit_data`.
    pub fn data(&self) -> HabitData {
        HabitData {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            beneficiary: self.beneficiary.clone(),
            stake_claimed: self.stake_claimed,
            stake: self.stake,
            accomplishment: self.accomplishment.clone(),
            commitment: self.commitment.clone(),
        }
    }

    /// Checks the structural invariants of a record loaded from storage.
    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        let c = &self.commitment;
        let a = &self.accomplishment;
        if c.times_per_timeframe == 0 {
            return Err("times_per_timeframe is zero".into());
        }
        if c.chain_commitment == 0 {
            return Err("chain_commitment is zero".into());
        }
        if a.period_times_accomplished >= c.times_per_timeframe {
            return Err(format!(
                "period_times_accomplished {} not below target {}",
                a.period_times_accomplished, c.times_per_timeframe
            ));
        }
        if a.period_start.checked_add_signed(c.timeframe.as_duration()) != Some(a.period_end) {
            return Err("period_end does not equal period_start + timeframe".into());
        }
        if a.proofs.len() != a.period_times_accomplished as usize {
            return Err("proof count does not match period_times_accomplished".into());
        }
        Ok(())
    }
}

/// Habit fields as exposed by `get_habit_data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitData {
    pub id: HabitId,
    pub name: String,
    pub description: String,
    pub beneficiary: Address,
    pub stake_claimed: bool,
    pub stake: Amount,
    pub accomplishment: Accomplishment,
    pub commitment: Commitment,
}

/// Entry of `get_all_habits`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedHabit {
    pub owner: Address,
    pub habit_data: HabitData,
}

//! `commit`: open a new staked habit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::ledger::HabitLedger;
use crate::error::HabitError;
use crate::events::Event;
use crate::habit::{Accomplishment, Address, Amount, Commitment, Habit, HabitId, Timeframe};

/// Caller-supplied parameters of a new habit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRequest {
    pub name: String,
    pub description: String,
    pub timeframe: Timeframe,
    pub chain_commitment: u32,
    pub beneficiary: Address,
    pub start_time: DateTime<Utc>,
    pub times_per_timeframe: u32,
}

impl CommitRequest {
    fn validate(&self) -> Result<DateTime<Utc>, HabitError> {
        if self.times_per_timeframe == 0 {
            return Err(HabitError::InvalidCommitment {
                field: "times_per_timeframe",
                message: "must be at least 1".into(),
            });
        }
        if self.chain_commitment == 0 {
            return Err(HabitError::InvalidCommitment {
                field: "chain_commitment",
                message: "must be at least 1".into(),
            });
        }
        self.start_time
            .checked_add_signed(self.timeframe.as_duration())
            .ok_or_else(|| HabitError::InvalidCommitment {
                field: "start_time",
                message: format!("start_time + {} is out of range", self.timeframe),
            })
    }
}

/// Validate `request` and append the habit it describes.
///
/// The new record is owned by `caller` and escrows `stake`. Its first
/// period is `[start_time, start_time + timeframe]`.
pub(crate) fn commit(
    ledger: &HabitLedger,
    caller: &Address,
    request: CommitRequest,
    stake: Amount,
    now: DateTime<Utc>,
) -> Result<(HabitId, Event), HabitError> {
    let period_end = request.validate()?;
    let period_start = request.start_time;

    let id = ledger.append(|id| {
        Ok(Habit::new(
            id,
            caller.clone(),
            request.beneficiary.clone(),
            request.name,
            request.description,
            Commitment {
                timeframe: request.timeframe,
                times_per_timeframe: request.times_per_timeframe,
                chain_commitment: request.chain_commitment,
            },
            Accomplishment {
                chain: 0,
                period_start,
                period_end,
                period_times_accomplished: 0,
                proofs: Vec::new(),
            },
            stake,
        ))
    })?;

    info!(
        habit_id = %id,
        owner = %caller,
        beneficiary = %request.beneficiary,
        stake = %stake,
        "habit committed"
    );

    Ok((
        id,
        Event::HabitCommitted {
            habit_id: id,
            owner: caller.clone(),
            beneficiary: request.beneficiary,
            stake,
            period_start,
            period_end,
            at: now,
        },
    ))
}

//! Stake settlement: `claim_stake` and `claim_broken_commitment`.
//!
//! Both paths flip `stake_claimed` and hand the stake to a [`TransferSink`]
//! as one unit: a failed transfer resets the flag before the error is
//! returned, and the ledger only stores drafts of calls that succeeded.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::HabitError;
use crate::events::Event;
use crate::habit::{Address, Habit};
use crate::transfer::{Payout, PayoutKind, TransferSink};

/// Owner recovers the stake after reaching the chain commitment.
pub(crate) fn claim_stake<S>(
    habit: &mut Habit,
    caller: &Address,
    now: DateTime<Utc>,
    sink: &S,
) -> Result<Event, HabitError>
where
    S: TransferSink + ?Sized,
{
    let habit_id = habit.id();
    if !habit.is_owned_by(caller) {
        return Err(HabitError::AccessDenied {
            habit_id,
            caller: caller.to_string(),
        });
    }
    if !habit.chain_commitment_reached() {
        return Err(HabitError::ChainCommitmentNotAccomplished {
            habit_id,
            chain: habit.accomplishment().chain,
            required: habit.commitment().chain_commitment,
        });
    }
    if habit.stake_claimed() {
        return Err(HabitError::AlreadyClaimed(habit_id));
    }

    let owner = habit.owner().clone();
    release(habit, owner.clone(), PayoutKind::StakeReturned, now, sink)?;

    info!(habit_id = %habit_id, owner = %owner, amount = %habit.stake(), "stake returned to owner");
    Ok(Event::StakeClaimed {
        habit_id,
        owner,
        amount: habit.stake(),
        at: now,
    })
}

/// Anyone may forfeit the stake to the beneficiary once a period lapsed
/// with its target unmet.
pub(crate) fn claim_broken_commitment<S>(
    habit: &mut Habit,
    caller: &Address,
    now: DateTime<Utc>,
    sink: &S,
) -> Result<Event, HabitError>
where
    S: TransferSink + ?Sized,
{
    let habit_id = habit.id();
    if !habit.is_broken_at(now) {
        warn!(habit_id = %habit_id, caller = %caller, "slashing rejected: commitment not broken");
        return Err(HabitError::CommitmentNotBroken(habit_id));
    }
    if habit.stake_claimed() {
        warn!(habit_id = %habit_id, caller = %caller, "slashing rejected: already settled");
        return Err(HabitError::AlreadyClaimed(habit_id));
    }

    let beneficiary = habit.beneficiary().clone();
    release(habit, beneficiary.clone(), PayoutKind::CommitmentBroken, now, sink)?;

    info!(
        habit_id = %habit_id,
        beneficiary = %beneficiary,
        caller = %caller,
        amount = %habit.stake(),
        "stake forfeited to beneficiary"
    );
    Ok(Event::CommitmentSlashed {
        habit_id,
        beneficiary,
        caller: caller.clone(),
        amount: habit.stake(),
        at: now,
    })
}

fn release<S>(
    habit: &mut Habit,
    recipient: Address,
    kind: PayoutKind,
    now: DateTime<Utc>,
    sink: &S,
) -> Result<(), HabitError>
where
    S: TransferSink + ?Sized,
{
    habit.stake_claimed = true;

    let payout = Payout {
        habit_id: habit.id(),
        recipient,
        amount: habit.stake(),
        kind,
        paid_at: now,
    };
    if let Err(source) = sink.transfer(&payout) {
        habit.stake_claimed = false;
        warn!(
            habit_id = %payout.habit_id,
            recipient = %payout.recipient,
            error = %source,
            "stake transfer failed"
        );
        return Err(HabitError::TransferFailure {
            habit_id: payout.habit_id,
            recipient: payout.recipient.to_string(),
            source,
        });
    }
    Ok(())
}

//! Release of escrowed value.
//!
//! A [`TransferSink`] moves a claimed stake to its recipient. The engines
//! call it exactly once per successful claim and treat any error as a
//! failed claim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::TransferError;
use crate::habit::{Address, Amount, HabitId};

/// Why a stake left escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutKind {
    /// Chain commitment reached; stake returned to the owner.
    StakeReturned,
    /// A period lapsed incomplete; stake forfeited to the beneficiary.
    CommitmentBroken,
}

impl PayoutKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutKind::StakeReturned => "stake_returned",
            PayoutKind::CommitmentBroken => "commitment_broken",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "stake_returned" => Some(PayoutKind::StakeReturned),
            "commitment_broken" => Some(PayoutKind::CommitmentBroken),
            _ => None,
        }
    }
}

/// One transfer out of escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub habit_id: HabitId,
    pub recipient: Address,
    pub amount: Amount,
    pub kind: PayoutKind,
    pub paid_at: DateTime<Utc>,
}

pub trait TransferSink {
    fn transfer(&self, payout: &Payout) -> Result<(), TransferError>;
}

impl<S: TransferSink + ?Sized> TransferSink for &S {
    fn transfer(&self, payout: &Payout) -> Result<(), TransferError> {
        (**self).transfer(payout)
    }
}

impl<S: TransferSink + ?Sized> TransferSink for Box<S> {
    fn transfer(&self, payout: &Payout) -> Result<(), TransferError> {
        (**self).transfer(payout)
    }
}

/// In-process sink keeping a payout history and per-recipient balances.
///
/// Can be switched into a failing mode to exercise claim rollback.
#[derive(Debug, Default)]
pub struct InMemorySink {
    payouts: Mutex<Vec<Payout>>,
    balances: Mutex<HashMap<Address, u128>>,
    fail_with: Mutex<Option<String>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every following transfer with `reason` until cleared.
    pub fn fail_transfers(&self, reason: impl Into<String>) {
        *self.fail_with.lock().unwrap_or_else(|e| e.into_inner()) = Some(reason.into());
    }

    pub fn accept_transfers(&self) {
        *self.fail_with.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn payouts(&self) -> Vec<Payout> {
        self.payouts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn balance_of(&self, address: &Address) -> Amount {
        let balances = self.balances.lock().unwrap_or_else(|e| e.into_inner());
        Amount(balances.get(address).copied().unwrap_or(0))
    }
}

impl TransferSink for InMemorySink {
    fn transfer(&self, payout: &Payout) -> Result<(), TransferError> {
        if let Some(reason) = self
            .fail_with
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
        {
            return Err(TransferError::Rejected(reason));
        }

        let mut balances = self.balances.lock().unwrap_or_else(|e| e.into_inner());
        let balance = balances.entry(payout.recipient.clone()).or_insert(0);
        *balance = balance
            .checked_add(payout.amount.0)
            .ok_or_else(|| TransferError::Rejected("recipient balance overflow".into()))?;
        drop(balances);

        self.payouts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(payout.clone());
        Ok(())
    }
}

//! Payout ledger backed by the `payouts` table.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection};

use crate::error::{DatabaseError, TransferError};
use crate::habit::{Address, Amount, HabitId};
use crate::transfer::{Payout, PayoutKind, TransferSink};

/// [`TransferSink`] that books each payout as a row.
///
/// Used with a [`rusqlite::Transaction`] so the payout and the settled
/// habit commit or roll back together.
pub struct PayoutSink<'c> {
    conn: &'c Connection,
}

impl<'c> PayoutSink<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl TransferSink for PayoutSink<'_> {
    fn transfer(&self, payout: &Payout) -> Result<(), TransferError> {
        self.conn
            .execute(
                "INSERT INTO payouts (habit_id, recipient, amount, kind, paid_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    payout.habit_id.0 as i64,
                    payout.recipient.as_str(),
                    payout.amount.to_string(),
                    payout.kind.as_str(),
                    payout.paid_at.to_rfc3339(),
                ],
            )
            .map_err(|e| TransferError::Backend(Box::new(e)))?;
        Ok(())
    }
}

/// All payouts, optionally restricted to one habit, oldest first.
pub fn list_payouts(
    conn: &Connection,
    habit_id: Option<HabitId>,
) -> Result<Vec<Payout>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT habit_id, recipient, amount, kind, paid_at
         FROM payouts
         WHERE ?1 IS NULL OR habit_id = ?1
         ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![habit_id.map(|id| id.0 as i64)], |row| {
        let habit_id: i64 = row.get(0)?;
        let recipient: String = row.get(1)?;
        let amount: String = row.get(2)?;
        let kind: String = row.get(3)?;
        let paid_at: String = row.get(4)?;

        Ok(Payout {
            habit_id: HabitId(habit_id as u64),
            recipient: Address::parse(&recipient).map_err(|e| conversion_error(1, e))?,
            amount: amount
                .parse::<Amount>()
                .map_err(|e| conversion_error(2, e))?,
            kind: PayoutKind::parse(&kind).ok_or_else(|| {
                conversion_error(3, DatabaseError::QueryFailed(format!("unknown payout kind '{kind}'")))
            })?,
            paid_at: DateTime::parse_from_rfc3339(&paid_at)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| conversion_error(4, e))?,
        })
    })?;

    let mut payouts = Vec::new();
    for row in rows {
        payouts.push(row?);
    }
    Ok(payouts)
}

fn conversion_error<E>(column: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    fn payout(habit: u64, kind: PayoutKind) -> Payout {
        Payout {
            habit_id: HabitId(habit),
            recipient: Address::parse("0x00000000000000000000000000000000000000b2").unwrap(),
            amount: Amount(340_282_366_920_938_463_463_374_607_431_768_211_455),
            kind,
            paid_at: Utc::now(),
        }
    }

    #[test]
    fn payouts_are_booked_and_listed() {
        let db = Database::open_memory().unwrap();
        let sink = PayoutSink::new(db.conn());
        sink.transfer(&payout(0, PayoutKind::StakeReturned)).unwrap();
        sink.transfer(&payout(1, PayoutKind::CommitmentBroken)).unwrap();

        let all = list_payouts(db.conn(), None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].amount, Amount(u128::MAX));
        assert_eq!(all[1].kind, PayoutKind::CommitmentBroken);

        let one = list_payouts(db.conn(), Some(HabitId(1))).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].habit_id, HabitId(1));
    }

    #[test]
    fn second_payout_for_same_habit_fails() {
        let db = Database::open_memory().unwrap();
        let sink = PayoutSink::new(db.conn());
        sink.transfer(&payout(4, PayoutKind::StakeReturned)).unwrap();
        let err = sink.transfer(&payout(4, PayoutKind::CommitmentBroken));
        assert!(matches!(err, Err(TransferError::Backend(_))));
        assert_eq!(list_payouts(db.conn(), None).unwrap().len(), 1);
    }
}

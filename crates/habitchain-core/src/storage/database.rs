//! SQLite-based ledger storage.
//!
//! Provides persistent storage for:
//! - Habit records (one JSON document per id)
//! - Payouts released from escrow
//!
//! The free functions take a plain [`Connection`] so they also run inside a
//! [`Transaction`], which is how the CLI couples a claim's payout row with
//! the updated habit.

use chrono::Utc;
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::DatabaseError;
use crate::habit::Habit;

use super::data_dir;

/// SQLite database holding the habit ledger.
pub struct Database {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/habitchain.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the
    /// database cannot be opened or migrated.
    pub fn open() -> crate::error::Result<Self> {
        let path = data_dir()?.join("habitchain.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) a database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn, path: None };
        db.migrate()?;
        Ok(db)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Start a write transaction; dropped without `commit()` it rolls back.
    ///
    /// The write lock is taken up front, so concurrent processes run their
    /// read-modify-write cycles one after another.
    pub fn transaction(&mut self) -> Result<Transaction<'_>, DatabaseError> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS habits (
                    id           INTEGER PRIMARY KEY,
                    owner        TEXT NOT NULL,
                    stake_claimed INTEGER NOT NULL DEFAULT 0,
                    record       TEXT NOT NULL,
                    updated_at   TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS payouts (
                    id         INTEGER PRIMARY KEY AUTOINCREMENT,
                    habit_id   INTEGER NOT NULL UNIQUE REFERENCES habits(id),
                    recipient  TEXT NOT NULL,
                    amount     TEXT NOT NULL,
                    kind       TEXT NOT NULL,
                    paid_at    TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_habits_owner ON habits(owner);
                CREATE INDEX IF NOT EXISTS idx_payouts_recipient ON payouts(recipient);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    pub fn load_habits(&self) -> Result<Vec<Habit>, DatabaseError> {
        load_habits(&self.conn)
    }

    pub fn save_habit(&self, habit: &Habit) -> Result<(), DatabaseError> {
        save_habit(&self.conn, habit)
    }
}

/// Load every stored habit in id order.
pub fn load_habits(conn: &Connection) -> Result<Vec<Habit>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT record FROM habits ORDER BY id ASC")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut habits = Vec::new();
    for row in rows {
        let habit: Habit = serde_json::from_str(&row?)?;
        habits.push(habit);
    }
    debug!(count = habits.len(), "loaded habits");
    Ok(habits)
}

/// Store a newly committed habit. Fails if the id is already taken.
pub fn insert_habit(conn: &Connection, habit: &Habit) -> Result<(), DatabaseError> {
    let record = serde_json::to_string(habit)?;
    conn.execute(
        "INSERT INTO habits (id, owner, stake_claimed, record, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            habit.id().0 as i64,
            habit.owner().as_str(),
            habit.stake_claimed(),
            record,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Insert or replace one habit record.
pub fn save_habit(conn: &Connection, habit: &Habit) -> Result<(), DatabaseError> {
    let record = serde_json::to_string(habit)?;
    conn.execute(
        "INSERT INTO habits (id, owner, stake_claimed, record, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
            stake_claimed = excluded.stake_claimed,
            record = excluded.record,
            updated_at = excluded.updated_at",
        params![
            habit.id().0 as i64,
            habit.owner().as_str(),
            habit.stake_claimed(),
            record,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::engine::{CommitRequest, HabitLedger, HabitManager};
    use crate::habit::{Address, Amount, HabitId, Timeframe};
    use crate::transfer::InMemorySink;

    fn addr(last: u8) -> Address {
        Address::parse(&format!("0x{}{:02x}", "0".repeat(38), last)).unwrap()
    }

    fn seeded_manager() -> HabitManager<FixedClock, InMemorySink> {
        let now = Utc::now();
        let m = HabitManager::new(FixedClock::new(now), InMemorySink::new());
        let request = CommitRequest {
            name: "stretch".into(),
            description: String::new(),
            timeframe: Timeframe::DAY,
            chain_commitment: 3,
            beneficiary: addr(2),
            start_time: now,
            times_per_timeframe: 2,
        };
        m.commit(&addr(1), request.clone(), Amount(10)).unwrap();
        m.commit(&addr(3), request, Amount(20)).unwrap();
        m.done(&addr(1), HabitId(0), "proof").unwrap();
        m
    }

    #[test]
    fn habits_survive_reload() {
        let db = Database::open_memory().unwrap();
        let m = seeded_manager();
        for habit in m.ledger().snapshot_all().unwrap() {
            db.save_habit(&habit).unwrap();
        }

        let loaded = db.load_habits().unwrap();
        assert_eq!(loaded, m.ledger().snapshot_all().unwrap());

        let ledger = HabitLedger::from_habits(loaded).unwrap();
        assert_eq!(ledger.len().unwrap(), 2);
        assert_eq!(ledger.get(HabitId(0)).unwrap().accomplishment().proofs, vec!["proof"]);
    }

    #[test]
    fn save_habit_upserts() {
        let db = Database::open_memory().unwrap();
        let m = seeded_manager();
        let habit = m.ledger().get(HabitId(0)).unwrap();
        db.save_habit(&habit).unwrap();
        db.save_habit(&habit).unwrap();
        assert_eq!(db.load_habits().unwrap().len(), 1);
    }

    #[test]
    fn dropped_transaction_rolls_back() {
        let mut db = Database::open_memory().unwrap();
        let m = seeded_manager();
        {
            let tx = db.transaction().unwrap();
            save_habit(&tx, &m.ledger().get(HabitId(0)).unwrap()).unwrap();
        }
        assert!(db.load_habits().unwrap().is_empty());
    }

    #[test]
    fn insert_refuses_taken_id() {
        let db = Database::open_memory().unwrap();
        let m = seeded_manager();
        let first = m.ledger().get(HabitId(0)).unwrap();
        insert_habit(db.conn(), &first).unwrap();

        // A stale writer that also assigned id 0, to a different owner.
        let stale = HabitManager::new(FixedClock::new(Utc::now()), InMemorySink::new());
        let request = CommitRequest {
            name: "other".into(),
            description: String::new(),
            timeframe: Timeframe::WEEK,
            chain_commitment: 1,
            beneficiary: addr(2),
            start_time: Utc::now(),
            times_per_timeframe: 1,
        };
        stale.commit(&addr(9), request, Amount(1)).unwrap();
        let other = stale.ledger().get(HabitId(0)).unwrap();
        assert!(insert_habit(db.conn(), &other).is_err());
        assert_eq!(db.load_habits().unwrap(), vec![first]);
    }

    #[test]
    fn second_writer_waits_for_the_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let mut first = Database::open_at(&path).unwrap();
        let mut second = Database::open_at(&path).unwrap();
        second
            .conn()
            .busy_timeout(std::time::Duration::ZERO)
            .unwrap();

        let tx = first.transaction().unwrap();
        assert!(matches!(second.transaction(), Err(DatabaseError::Locked)));
        drop(tx);
        assert!(second.transaction().is_ok());
    }

    #[test]
    fn opens_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        {
            let db = Database::open_at(&path).unwrap();
            let m = seeded_manager();
            db.save_habit(&m.ledger().get(HabitId(1)).unwrap()).unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.path(), Some(path.as_path()));
        assert_eq!(db.load_habits().unwrap()[0].id(), HabitId(1));
    }
}

//! Append-only habit ledger.
//!
//! Records live in an arena indexed by id. The arena lock is held only to
//! append or to look up a record; each record then has its own lock, so
//! calls on different habits never wait on each other.

use std::sync::{Arc, RwLock};

use crate::error::HabitError;
use crate::habit::{Address, Habit, HabitData, HabitId, OwnedHabit};

type Record = Arc<RwLock<Habit>>;

#[derive(Debug, Default)]
pub struct HabitLedger {
    records: RwLock<Vec<Record>>,
}

impl HabitLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from persisted records.
    ///
    /// Records must be ordered by id with no gaps, starting at 0, and each
    /// must satisfy the period invariants.
    pub fn from_habits(habits: Vec<Habit>) -> Result<Self, HabitError> {
        let mut records = Vec::with_capacity(habits.len());
        for (index, habit) in habits.into_iter().enumerate() {
            let expected = HabitId(index as u64);
            if habit.id() != expected {
                return Err(HabitError::CorruptRecord {
                    habit_id: habit.id(),
                    message: format!("expected id {expected}"),
                });
            }
            habit
                .check_invariants()
                .map_err(|message| HabitError::CorruptRecord {
                    habit_id: habit.id(),
                    message,
                })?;
            records.push(Arc::new(RwLock::new(habit)));
        }
        Ok(Self {
            records: RwLock::new(records),
        })
    }

    pub fn len(&self) -> Result<usize, HabitError> {
        Ok(self.records.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, HabitError> {
        Ok(self.len()? == 0)
    }

    /// Append a record built for the next id.
    ///
    /// The arena write lock is held across id assignment and insertion, so
    /// concurrent callers get distinct, consecutive ids. `build` may reject
    /// the record, in which case no id is consumed.
    pub(crate) fn append<F>(&self, build: F) -> Result<HabitId, HabitError>
    where
        F: FnOnce(HabitId) -> Result<Habit, HabitError>,
    {
        let mut records = self.records.write()?;
        let id = HabitId(records.len() as u64);
        let habit = build(id)?;
        debug_assert_eq!(habit.id(), id);
        records.push(Arc::new(RwLock::new(habit)));
        Ok(id)
    }

    /// Run `apply` with exclusive access to one record.
    ///
    /// `apply` works on a draft copy; the record is replaced only when it
    /// returns `Ok`, so a rejected call leaves no trace.
    pub(crate) fn update<T, F>(&self, id: HabitId, apply: F) -> Result<T, HabitError>
    where
        F: FnOnce(&mut Habit) -> Result<T, HabitError>,
    {
        let record = self.record(id)?;
        let mut guard = record.write()?;
        let mut draft = guard.clone();
        let out = apply(&mut draft)?;
        *guard = draft;
        Ok(out)
    }

    /// Consistent snapshot of one record.
    pub fn get(&self, id: HabitId) -> Result<Habit, HabitError> {
        let record = self.record(id)?;
        let guard = record.read()?;
        Ok(guard.clone())
    }

    pub fn get_habit_data(&self, id: HabitId) -> Result<HabitData, HabitError> {
        let record = self.record(id)?;
        let guard = record.read()?;
        Ok(guard.data())
    }

    /// Every record ever created, in id order, paired with its owner.
    pub fn get_all_habits(&self) -> Result<Vec<OwnedHabit>, HabitError> {
        Ok(self
            .snapshot_all()?
            .into_iter()
            .map(|habit| OwnedHabit {
                owner: habit.owner().clone(),
                habit_data: habit.data(),
            })
            .collect())
    }

    pub fn habits_of(&self, owner: &Address) -> Result<Vec<Habit>, HabitError> {
        Ok(self
            .snapshot_all()?
            .into_iter()
            .filter(|habit| habit.is_owned_by(owner))
            .collect())
    }

    /// Snapshot of every record, each read under its own lock.
    pub fn snapshot_all(&self) -> Result<Vec<Habit>, HabitError> {
        let records: Vec<Record> = self.records.read()?.clone();
        records
            .iter()
            .map(|record| -> Result<Habit, HabitError> { Ok(record.read()?.clone()) })
            .collect()
    }

    fn record(&self, id: HabitId) -> Result<Record, HabitError> {
        let records = self.records.read()?;
        usize::try_from(id.0)
            .ok()
            .and_then(|index| records.get(index))
            .cloned()
            .ok_or(HabitError::NotFound(id))
    }
}

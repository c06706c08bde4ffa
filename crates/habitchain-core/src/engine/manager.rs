//! Entry point for every habit operation.
//!
//! ## Usage
//!
//! ```ignore
//! let manager = HabitManager::new(SystemClock, InMemorySink::new());
//! let id = manager.commit(&owner, request, Amount(1))?;
//! manager.done(&owner, id, "ran 5k")?;
//! ```

use std::sync::Mutex;

use tracing::debug;

use crate::clock::Clock;
use crate::error::HabitError;
use crate::events::Event;
use crate::habit::{Address, Amount, Habit, HabitData, HabitId, HabitStatus, OwnedHabit};
use crate::transfer::TransferSink;

use super::commitment::{self, CommitRequest};
use super::ledger::HabitLedger;
use super::{accomplishment, settlement};

/// Wires the ledger to a time source and a transfer sink.
///
/// All methods take `&self`; share a manager across threads behind an
/// `Arc` when `C` and `S` are `Sync`.
pub struct HabitManager<C, S> {
    ledger: HabitLedger,
    clock: C,
    sink: S,
    events: Mutex<Vec<Event>>,
}

impl<C: Clock, S: TransferSink> HabitManager<C, S> {
    pub fn new(clock: C, sink: S) -> Self {
        Self::with_ledger(HabitLedger::new(), clock, sink)
    }

    /// Resume from an existing ledger, e.g. one loaded from storage.
    pub fn with_ledger(ledger: HabitLedger, clock: C, sink: S) -> Self {
        Self {
            ledger,
            clock,
            sink,
            events: Mutex::new(Vec::new()),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Create a habit owned by `caller` escrowing `stake`.
    pub fn commit(
        &self,
        caller: &Address,
        request: CommitRequest,
        stake: Amount,
    ) -> Result<HabitId, HabitError> {
        let now = self.clock.now();
        let (id, event) = commitment::commit(&self.ledger, caller, request, stake, now)?;
        self.push_event(event);
        Ok(id)
    }

    /// Record one accomplishment with its proof.
    pub fn done(
        &self,
        caller: &Address,
        id: HabitId,
        proof: impl Into<String>,
    ) -> Result<Event, HabitError> {
        let now = self.clock.now();
        let proof = proof.into();
        let event = self
            .ledger
            .update(id, |habit| accomplishment::record_done(habit, caller, now, proof))?;
        self.push_event(event.clone());
        Ok(event)
    }

    /// Return the stake to its owner once the chain commitment is met.
    pub fn claim_stake(&self, caller: &Address, id: HabitId) -> Result<Event, HabitError> {
        let now = self.clock.now();
        let event = self
            .ledger
            .update(id, |habit| settlement::claim_stake(habit, caller, now, &self.sink))?;
        self.push_event(event.clone());
        Ok(event)
    }

    /// Forfeit the stake to the beneficiary. Open to any caller.
    pub fn claim_broken_commitment(
        &self,
        caller: &Address,
        id: HabitId,
    ) -> Result<Event, HabitError> {
        let now = self.clock.now();
        let event = self.ledger.update(id, |habit| {
            settlement::claim_broken_commitment(habit, caller, now, &self.sink)
        })?;
        self.push_event(event.clone());
        Ok(event)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn get_habit_data(&self, id: HabitId) -> Result<HabitData, HabitError> {
        self.ledger.get_habit_data(id)
    }

    pub fn get_all_habits(&self) -> Result<Vec<OwnedHabit>, HabitError> {
        self.ledger.get_all_habits()
    }

    pub fn habits_of(&self, owner: &Address) -> Result<Vec<HabitData>, HabitError> {
        Ok(self
            .ledger
            .habits_of(owner)?
            .iter()
            .map(Habit::data)
            .collect())
    }

    /// Status of a habit as of the manager's clock.
    pub fn status(&self, id: HabitId) -> Result<HabitStatus, HabitError> {
        Ok(self.ledger.get(id)?.status_at(self.clock.now()))
    }

    pub fn ledger(&self) -> &HabitLedger {
        &self.ledger
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Events produced since the last drain, oldest first. Leaves the
    /// history in place.
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Take the events produced since the last drain, oldest first.
    pub fn drain_events(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn into_ledger(self) -> HabitLedger {
        self.ledger
    }

    fn push_event(&self, event: Event) {
        debug!(habit_id = %event.habit_id(), ?event, "event recorded");
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::habit::Timeframe;
    use crate::transfer::InMemorySink;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn addr(last: u8) -> Address {
        Address::parse(&format!("0x{}{:02x}", "0".repeat(38), last)).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn request() -> CommitRequest {
        CommitRequest {
            name: "meditate".into(),
            description: "ten minutes".into(),
            timeframe: Timeframe::DAY,
            chain_commitment: 2,
            beneficiary: addr(0xbb),
            start_time: t0(),
            times_per_timeframe: 2,
        }
    }

    fn manager() -> HabitManager<FixedClock, InMemorySink> {
        HabitManager::new(FixedClock::new(t0()), InMemorySink::new())
    }

    #[test]
    fn commit_initializes_first_period() {
        let m = manager();
        let id = m.commit(&addr(1), request(), Amount(5)).unwrap();
        assert_eq!(id, HabitId(0));

        let data = m.get_habit_data(id).unwrap();
        assert_eq!(data.accomplishment.chain, 0);
        assert_eq!(data.accomplishment.period_times_accomplished, 0);
        assert_eq!(data.accomplishment.period_start, t0());
        assert_eq!(data.accomplishment.period_end, t0() + Duration::days(1));
        assert!(data.accomplishment.proofs.is_empty());
        assert!(!data.stake_claimed);
        assert_eq!(data.stake, Amount(5));
    }

    #[test]
    fn invalid_commit_consumes_no_id() {
        let m = manager();
        let mut bad = request();
        bad.times_per_timeframe = 0;
        assert!(matches!(
            m.commit(&addr(1), bad, Amount(1)),
            Err(HabitError::InvalidCommitment { field: "times_per_timeframe", .. })
        ));
        let mut bad = request();
        bad.chain_commitment = 0;
        assert!(m.commit(&addr(1), bad, Amount(1)).is_err());

        assert_eq!(m.commit(&addr(1), request(), Amount(1)).unwrap(), HabitId(0));
    }

    #[test]
    fn unknown_id_is_not_found() {
        let m = manager();
        assert!(matches!(m.get_habit_data(HabitId(3)), Err(HabitError::NotFound(HabitId(3)))));
        assert!(matches!(m.done(&addr(1), HabitId(3), "p"), Err(HabitError::NotFound(_))));
        assert!(matches!(m.claim_stake(&addr(1), HabitId(3)), Err(HabitError::NotFound(_))));
        assert!(matches!(
            m.claim_broken_commitment(&addr(1), HabitId(3)),
            Err(HabitError::NotFound(_))
        ));
    }

    #[test]
    fn failed_transfer_leaves_record_untouched() {
        let m = manager();
        let owner = addr(1);
        let mut req = request();
        req.chain_commitment = 1;
        req.times_per_timeframe = 1;
        let id = m.commit(&owner, req, Amount(9)).unwrap();
        m.done(&owner, id, "p").unwrap();

        m.sink().fail_transfers("rpc unavailable");
        let before = m.ledger().get(id).unwrap();
        assert!(matches!(m.claim_stake(&owner, id), Err(HabitError::TransferFailure { .. })));
        assert_eq!(m.ledger().get(id).unwrap(), before);

        m.sink().accept_transfers();
        m.claim_stake(&owner, id).unwrap();
        assert!(m.get_habit_data(id).unwrap().stake_claimed);
        assert_eq!(m.sink().balance_of(&owner), Amount(9));
    }

    #[test]
    fn events_are_recorded_in_order() {
        let m = manager();
        let owner = addr(1);
        let id = m.commit(&owner, request(), Amount(1)).unwrap();
        m.done(&owner, id, "a").unwrap();
        m.done(&owner, id, "b").unwrap();
        assert!(m.done(&addr(2), id, "c").is_err());

        let events = m.events();
        assert_eq!(events, m.events());
        assert!(events.iter().all(|e| e.habit_id() == id));

        let events = m.drain_events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], Event::HabitCommitted { .. }));
        assert!(matches!(events[1], Event::AccomplishmentRecorded { times_left: 1, .. }));
        assert!(matches!(events[2], Event::PeriodRolledOver { chain: 1, .. }));
        assert!(m.drain_events().is_empty());
        assert!(m.events().is_empty());
    }

    #[test]
    fn status_follows_the_lifecycle() {
        let m = manager();
        let owner = addr(1);
        let mut req = request();
        req.start_time = t0() + Duration::hours(1);
        let id = m.commit(&owner, req, Amount(1)).unwrap();
        assert_eq!(m.status(id).unwrap(), HabitStatus::AwaitingPeriodStart);

        m.clock().advance(Duration::hours(2));
        assert_eq!(m.status(id).unwrap(), HabitStatus::InPeriod { times_left: 2 });
        m.done(&owner, id, "a").unwrap();
        assert_eq!(m.status(id).unwrap(), HabitStatus::InPeriod { times_left: 1 });

        m.clock().advance(Duration::days(2));
        assert_eq!(m.status(id).unwrap(), HabitStatus::Broken);

        m.claim_broken_commitment(&addr(9), id).unwrap();
        assert_eq!(m.status(id).unwrap(), HabitStatus::Settled);
        assert!(m.status(id).unwrap().is_terminal());
    }

    #[test]
    fn habits_of_filters_by_owner() {
        let m = manager();
        m.commit(&addr(1), request(), Amount(1)).unwrap();
        m.commit(&addr(2), request(), Amount(1)).unwrap();
        m.commit(&addr(1), request(), Amount(1)).unwrap();

        let mine = m.habits_of(&addr(1)).unwrap();
        assert_eq!(mine.iter().map(|h| h.id).collect::<Vec<_>>(), vec![HabitId(0), HabitId(2)]);

        let all = m.get_all_habits().unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[1].owner, addr(2));
    }
}

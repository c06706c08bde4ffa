//! `done`: record one accomplishment inside the current period.
//!
//! ## Period rollover
//!
//! ```text
//! [period_start, period_end]   times: 0 -> 1 -> ... -> target
//!                                                      |
//!                              chain += 1, times = 0, proofs cleared
//!                              [old period_end, old period_end + timeframe]
//! ```
//!
//! Both window bounds are inclusive. Once `now` passes `period_end` with
//! the target unmet, no `done` can succeed for that habit again.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::HabitError;
use crate::events::Event;
use crate::habit::{Address, Habit};

/// Apply `done` to `habit` at instant `now`.
///
/// Preconditions are checked in order (owner, period started, period not
/// expired) and the next period end is computed before anything is
/// written.
pub(crate) fn record_done(
    habit: &mut Habit,
    caller: &Address,
    now: DateTime<Utc>,
    proof: String,
) -> Result<Event, HabitError> {
    let habit_id = habit.id();
    if !habit.is_owned_by(caller) {
        return Err(HabitError::AccessDenied {
            habit_id,
            caller: caller.to_string(),
        });
    }

    let timeframe = habit.commitment().timeframe;
    let target = habit.commitment().times_per_timeframe;
    let state = &habit.accomplishment;
    debug!(
        habit_id = %habit_id,
        %now,
        period_start = %state.period_start,
        period_end = %state.period_end,
        "checking accomplishment window"
    );
    if now < state.period_start {
        return Err(HabitError::PeriodNotStarted {
            habit_id,
            period_start: state.period_start,
        });
    }
    if now > state.period_end {
        return Err(HabitError::PeriodExpired {
            habit_id,
            period_end: state.period_end,
        });
    }

    let times = state.period_times_accomplished + 1;
    if times < target {
        let state = &mut habit.accomplishment;
        state.proofs.push(proof);
        state.period_times_accomplished = times;
        debug!(habit_id = %habit_id, times, target, "accomplishment recorded");
        return Ok(Event::AccomplishmentRecorded {
            habit_id,
            times_accomplished: times,
            times_left: target - times,
            at: now,
        });
    }

    let next_start = state.period_end;
    let next_end = next_start
        .checked_add_signed(timeframe.as_duration())
        .ok_or_else(|| HabitError::InvalidCommitment {
            field: "timeframe",
            message: format!("next period after {next_start} is out of range"),
        })?;

    let state = &mut habit.accomplishment;
    state.chain += 1;
    state.period_start = next_start;
    state.period_end = next_end;
    state.period_times_accomplished = 0;
    state.proofs.clear();

    info!(
        habit_id = %habit_id,
        chain = state.chain,
        period_start = %next_start,
        period_end = %next_end,
        "period completed, chain extended"
    );

    Ok(Event::PeriodRolledOver {
        habit_id,
        chain: state.chain,
        period_start: next_start,
        period_end: next_end,
        at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::{Accomplishment, Amount, Commitment, HabitId, Timeframe};
    use chrono::{Duration, TimeZone};

    fn owner() -> Address {
        Address::parse("0x00000000000000000000000000000000000000a1").unwrap()
    }

    fn stranger() -> Address {
        Address::parse("0x00000000000000000000000000000000000000ff").unwrap()
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    fn habit(times_per_timeframe: u32) -> Habit {
        Habit::new(
            HabitId(0),
            owner(),
            stranger(),
            "run".into(),
            "run 5k".into(),
            Commitment {
                timeframe: Timeframe::DAY,
                times_per_timeframe,
                chain_commitment: 3,
            },
            Accomplishment {
                chain: 0,
                period_start: start(),
                period_end: start() + Duration::days(1),
                period_times_accomplished: 0,
                proofs: Vec::new(),
            },
            Amount(10),
        )
    }

    #[test]
    fn partial_progress_keeps_period() {
        let mut h = habit(3);
        let event = record_done(&mut h, &owner(), start() + Duration::hours(1), "p1".into()).unwrap();

        assert!(matches!(
            event,
            Event::AccomplishmentRecorded { times_accomplished: 1, times_left: 2, .. }
        ));
        assert_eq!(h.accomplishment().period_times_accomplished, 1);
        assert_eq!(h.accomplishment().proofs, vec!["p1".to_string()]);
        assert_eq!(h.accomplishment().chain, 0);
        assert_eq!(h.accomplishment().period_start, start());
    }

    #[test]
    fn reaching_target_rolls_period_over() {
        let mut h = habit(2);
        record_done(&mut h, &owner(), start(), "a".into()).unwrap();
        let event = record_done(&mut h, &owner(), start() + Duration::hours(2), "b".into()).unwrap();

        assert!(matches!(event, Event::PeriodRolledOver { chain: 1, .. }));
        let a = h.accomplishment();
        assert_eq!(a.chain, 1);
        assert_eq!(a.period_times_accomplished, 0);
        assert!(a.proofs.is_empty());
        assert_eq!(a.period_start, start() + Duration::days(1));
        assert_eq!(a.period_end, start() + Duration::days(2));
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let mut h = habit(5);
        record_done(&mut h, &owner(), start(), "at start".into()).unwrap();
        record_done(&mut h, &owner(), start() + Duration::days(1), "at end".into()).unwrap();
        assert_eq!(h.accomplishment().period_times_accomplished, 2);
    }

    #[test]
    fn outside_window_is_rejected_without_effect() {
        let mut h = habit(2);
        let before = h.clone();

        let early = record_done(&mut h, &owner(), start() - Duration::seconds(1), "x".into());
        assert!(matches!(early, Err(HabitError::PeriodNotStarted { .. })));

        let late = record_done(
            &mut h,
            &owner(),
            start() + Duration::days(1) + Duration::seconds(1),
            "x".into(),
        );
        assert!(matches!(late, Err(HabitError::PeriodExpired { .. })));
        assert_eq!(h, before);
    }

    #[test]
    fn rollover_past_max_time_is_rejected_without_effect() {
        let mut h = habit(2);
        let end = DateTime::<Utc>::MAX_UTC - Duration::hours(1);
        h.accomplishment.period_start = end - Duration::days(1);
        h.accomplishment.period_end = end;
        let start = h.accomplishment.period_start;

        record_done(&mut h, &owner(), start, "first".into()).unwrap();
        let before = h.clone();

        let err = record_done(&mut h, &owner(), end, "second".into());
        assert!(matches!(
            err,
            Err(HabitError::InvalidCommitment { field: "timeframe", .. })
        ));
        assert_eq!(h, before);
        assert_eq!(h.accomplishment().period_times_accomplished, 1);
        assert_eq!(h.accomplishment().proofs, vec!["first".to_string()]);
    }

    #[test]
    fn owner_check_comes_first() {
        let mut h = habit(2);
        let before = h.clone();
        let err = record_done(&mut h, &stranger(), start() - Duration::days(5), "x".into());
        assert!(matches!(err, Err(HabitError::AccessDenied { .. })));
        assert_eq!(h, before);
    }
}

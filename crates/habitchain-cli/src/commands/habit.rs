use clap::Subcommand;
use habitchain_core::storage::{database, payouts};
use habitchain_core::{
    Address, Amount, CommitRequest, Config, CoreError, Database, DatabaseError, Event, FixedClock,
    HabitId, HabitLedger, HabitManager, PayoutSink, Timeframe,
};
use serde::Serialize;
use tracing::debug;

use super::{parse_instant, print_json, Context};

#[derive(Subcommand)]
pub enum HabitAction {
    /// Create a habit and escrow a stake
    Commit {
        /// Habit name
        #[arg(long)]
        name: String,
        /// Habit description
        #[arg(long, default_value = "")]
        description: String,
        /// Address receiving the stake if the commitment breaks
        #[arg(long)]
        beneficiary: String,
        /// Stake in the smallest unit
        #[arg(long)]
        stake: String,
        /// Period length: day, week, month, year, or seconds
        #[arg(long)]
        timeframe: Option<String>,
        /// Accomplishments required per period
        #[arg(long = "times")]
        times_per_timeframe: Option<u32>,
        /// Consecutive periods required to recover the stake
        #[arg(long = "chain")]
        chain_commitment: Option<u32>,
        /// First period start (RFC 3339); defaults to now
        #[arg(long)]
        start: Option<String>,
    },
    /// Record one accomplishment
    Done {
        id: String,
        /// Evidence attached to this accomplishment
        #[arg(long, default_value = "proof")]
        proof: String,
    },
    /// Recover the stake after completing the chain commitment
    ClaimStake { id: String },
    /// Forfeit a broken commitment's stake to its beneficiary
    ClaimBroken { id: String },
    /// Print one habit as JSON
    Show { id: String },
    /// List habits with their owners
    List {
        /// Only habits owned by this address
        #[arg(long)]
        owner: Option<String>,
    },
    /// Print the derived status of a habit
    Status { id: String },
    /// List recorded payouts
    Payouts {
        /// Only payouts of this habit
        #[arg(long)]
        habit: Option<String>,
    },
}

#[derive(Serialize)]
struct StatusView {
    habit_id: HabitId,
    status: habitchain_core::HabitStatus,
    times_left: u32,
    total_accomplishments_required: u64,
    at: chrono::DateTime<chrono::Utc>,
}

pub fn run(
    action: HabitAction,
    ctx: &Context,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut db = Database::open()?;

    match action {
        HabitAction::Commit {
            name,
            description,
            beneficiary,
            stake,
            timeframe,
            times_per_timeframe,
            chain_commitment,
            start,
        } => {
            let timeframe: Timeframe = match timeframe {
                Some(value) => value.parse()?,
                None => config.defaults.timeframe()?,
            };
            let request = CommitRequest {
                name,
                description,
                timeframe,
                chain_commitment: chain_commitment.unwrap_or(config.defaults.chain_commitment),
                beneficiary: Address::parse(&beneficiary)?,
                start_time: match start {
                    Some(start) => parse_instant(&start)?,
                    None => ctx.now(),
                },
                times_per_timeframe: times_per_timeframe
                    .unwrap_or(config.defaults.times_per_timeframe),
            };
            let stake: Amount = stake.parse()?;
            let caller = ctx.caller()?.clone();

            let event = mutate(&mut db, ctx, |m| {
                let id = m.commit(&caller, request, stake)?;
                Ok((id, m.drain_events().pop()))
            })?;
            print_json(&event)?;
        }
        HabitAction::Done { id, proof } => {
            let id: HabitId = id.parse()?;
            let caller = ctx.caller()?.clone();
            let event = mutate(&mut db, ctx, |m| Ok((id, Some(m.done(&caller, id, proof)?))))?;
            print_json(&event)?;
        }
        HabitAction::ClaimStake { id } => {
            let id: HabitId = id.parse()?;
            let caller = ctx.caller()?.clone();
            let event = mutate(&mut db, ctx, |m| Ok((id, Some(m.claim_stake(&caller, id)?))))?;
            print_json(&event)?;
        }
        HabitAction::ClaimBroken { id } => {
            let id: HabitId = id.parse()?;
            let caller = ctx.caller()?.clone();
            let event = mutate(&mut db, ctx, |m| {
                Ok((id, Some(m.claim_broken_commitment(&caller, id)?)))
            })?;
            print_json(&event)?;
        }
        HabitAction::Show { id } => {
            let id: HabitId = id.parse()?;
            let ledger = load_ledger(&db)?;
            print_json(&ledger.get_habit_data(id)?)?;
        }
        HabitAction::List { owner } => {
            let ledger = load_ledger(&db)?;
            match owner {
                Some(owner) => {
                    let owner = Address::parse(&owner)?;
                    print_json(&ledger_habits_of(&ledger, &owner)?)?
                }
                None => print_json(&ledger.get_all_habits()?)?,
            }
        }
        HabitAction::Status { id } => {
            let id: HabitId = id.parse()?;
            let habit = load_ledger(&db)?.get(id)?;
            print_json(&StatusView {
                habit_id: id,
                status: habit.status_at(ctx.now()),
                times_left: habit.times_left(),
                total_accomplishments_required: habit.total_accomplishments_required(),
                at: ctx.now(),
            })?;
        }
        HabitAction::Payouts { habit } => {
            let habit = habit.map(|id| id.parse::<HabitId>()).transpose()?;
            print_json(&payouts::list_payouts(db.conn(), habit)?)?;
        }
    }
    Ok(())
}

fn ledger_habits_of(
    ledger: &HabitLedger,
    owner: &Address,
) -> Result<Vec<habitchain_core::HabitData>, habitchain_core::HabitError> {
    Ok(ledger.habits_of(owner)?.iter().map(|h| h.data()).collect())
}

fn load_ledger(db: &Database) -> habitchain_core::error::Result<HabitLedger> {
    Ok(HabitLedger::from_habits(db.load_habits()?)?)
}

/// Run one mutation inside a single SQLite transaction.
///
/// `op` returns the id of the habit it touched; that record is written
/// back together with any payout row the sink booked. A freshly committed
/// habit is inserted, never upserted. Any error drops the transaction,
/// which rolls both back.
fn mutate<F>(db: &mut Database, ctx: &Context, op: F) -> Result<Option<Event>, CoreError>
where
    F: FnOnce(
        &HabitManager<FixedClock, PayoutSink<'_>>,
    ) -> Result<(HabitId, Option<Event>), habitchain_core::HabitError>,
{
    let tx = db.transaction()?;
    let event = {
        let ledger = HabitLedger::from_habits(database::load_habits(&tx)?)?;
        let manager = HabitManager::with_ledger(ledger, ctx.clock(), PayoutSink::new(&tx));
        let (id, event) = op(&manager)?;
        let habit = manager.ledger().get(id)?;
        if matches!(event, Some(Event::HabitCommitted { .. })) {
            database::insert_habit(&tx, &habit)?;
        } else {
            database::save_habit(&tx, &habit)?;
        }
        event
    };
    tx.commit().map_err(DatabaseError::from)?;
    if let Some(event) = &event {
        debug!(habit_id = %event.habit_id(), "mutation committed");
    }
    Ok(event)
}

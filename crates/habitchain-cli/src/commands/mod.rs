pub mod config;
pub mod habit;

use std::io::Write;

use chrono::{DateTime, Utc};
use habitchain_core::{Address, CoreError, FixedClock, ValidationError};
use tracing::debug;

/// Per-invocation settings shared by every subcommand.
pub struct Context {
    caller: Option<Address>,
    now: DateTime<Utc>,
}

impl Context {
    pub fn new(caller: Option<&str>, at: Option<&str>) -> Result<Self, CoreError> {
        let caller = caller.map(Address::parse).transpose()?;
        let now = match at {
            Some(at) => parse_instant(at)?,
            None => Utc::now(),
        };
        debug!(
            caller = ?caller.as_ref().map(Address::as_str),
            %now,
            "resolved invocation context"
        );
        Ok(Self { caller, now })
    }

    /// The `--as` address; required by commands that act on behalf of someone.
    pub fn caller(&self) -> Result<&Address, ValidationError> {
        self.caller
            .as_ref()
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "--as".into(),
                message: "this command requires --as <ADDRESS>".into(),
            })
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// One-shot commands see a single instant for the whole call.
    pub fn clock(&self) -> FixedClock {
        FixedClock::new(self.now)
    }
}

pub fn parse_instant(value: &str) -> Result<DateTime<Utc>, ValidationError> {
    let parsed =
        DateTime::parse_from_rfc3339(value).map_err(|e| ValidationError::InvalidValue {
            field: "timestamp".into(),
            message: format!("'{value}': {e}"),
        })?;
    Ok(parsed.with_timezone(&Utc))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CoreError> {
    let json = serde_json::to_string_pretty(value)?;
    writeln!(std::io::stdout().lock(), "{json}")?;
    Ok(())
}

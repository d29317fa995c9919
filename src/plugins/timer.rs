//! The singleton focus timer.
//!
//! Starting a timer always replaces the current one; the discarded timer is
//! reported to the caller and written to the journal. Whether a timer has
//! finished is computed on read and never stored.

use crate::core::error::OpsError;
use crate::core::output::{self, OutputFormat};
use crate::core::schemas::{Document, Timer, TimerState};
use crate::core::store::Store;
use crate::core::time::{self, Clock};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[clap(
    name = "timer",
    about = "Run a single active focus timer and check remaining time."
)]
pub struct TimerCli {
    /// Output format for this command group.
    #[clap(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,
    #[clap(subcommand)]
    pub command: TimerCommand,
}

#[derive(Subcommand, Debug)]
pub enum TimerCommand {
    /// Start or replace the current timer with a new one.
    Start {
        /// Short timer label (example: 'Deep work').
        #[clap(value_name = "LABEL")]
        label: String,
        /// Timer duration in whole minutes (must be > 0).
        #[clap(long, allow_negative_numbers = true)]
        minutes: i64,
    },
    /// Show whether a timer is active and how much time is left.
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerStart {
    pub timer: Timer,
    pub replaced: Option<Timer>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerStatus {
    Inactive,
    Running { timer: Timer, remaining_secs: i64 },
    Finished { timer: Timer },
}

/// Validate and install a new timer, handing back whichever one it displaced.
pub fn start_timer(
    doc: &mut Document,
    label: &str,
    minutes: i64,
    now: DateTime<Utc>,
) -> Result<TimerStart, OpsError> {
    if minutes <= 0 {
        return Err(OpsError::validation("--minutes must be positive"));
    }
    let minutes = u32::try_from(minutes)
        .map_err(|_| OpsError::validation(format!("--minutes must be at most {}", u32::MAX)))?;

    let timer = Timer {
        label: label.to_string(),
        minutes,
        started_at: now,
    };
    let replaced = doc.timer.replace(timer.clone());
    Ok(TimerStart { timer, replaced })
}

pub fn timer_status(doc: &Document, now: DateTime<Utc>) -> TimerStatus {
    let Some(timer) = doc.timer.clone() else {
        return TimerStatus::Inactive;
    };
    match timer.state_at(now) {
        TimerState::Running { remaining_secs } => TimerStatus::Running {
            timer,
            remaining_secs,
        },
        TimerState::Finished => TimerStatus::Finished { timer },
    }
}

pub fn render_status(status: &TimerStatus) -> String {
    match status {
        TimerStatus::Inactive => "No active timer.".to_string(),
        TimerStatus::Running {
            timer,
            remaining_secs,
        } => format!(
            "Timer '{}' has {} remaining.",
            timer.label,
            time::format_countdown(*remaining_secs)
        ),
        TimerStatus::Finished { timer } => format!("Timer '{}' finished.", timer.label),
    }
}

pub fn run_timer_cli(store: &Store, clock: &dyn Clock, cli: TimerCli) -> Result<(), OpsError> {
    let now = clock.now();
    match cli.command {
        TimerCommand::Start { label, minutes } => {
            let started =
                store.transaction("timer.start", |doc| start_timer(doc, &label, minutes, now))?;
            if let Some(prior) = &started.replaced {
                tracing::info!(
                    discarded = %prior.label,
                    discarded_started_at = %time::to_rfc3339(&prior.started_at),
                    replacement = %started.timer.label,
                    "replacing active timer"
                );
                store.record_event(
                    "timer.replace",
                    "ok",
                    true,
                    serde_json::json!({ "discarded": prior, "replacement": &started.timer }),
                );
            }
            match cli.format {
                OutputFormat::Json => output::print_json(&time::command_envelope(
                    &now,
                    "timer.start",
                    "ok",
                    serde_json::json!({
                        "timer": &started.timer,
                        "end_at": started.timer.end_at().map(|t| time::to_rfc3339(&t)),
                        "replaced": &started.replaced,
                    }),
                ))?,
                OutputFormat::Text => {
                    if let Some(prior) = &started.replaced {
                        println!("Replaced timer '{}'.", prior.label);
                    }
                    println!(
                        "Started timer '{}' for {}m.",
                        started.timer.label, started.timer.minutes
                    );
                }
            }
        }
        TimerCommand::Status => {
            let doc = store.load()?;
            let status = timer_status(&doc, now);
            match cli.format {
                OutputFormat::Json => {
                    let extra = match &status {
                        TimerStatus::Inactive => serde_json::json!({ "state": "inactive" }),
                        TimerStatus::Running {
                            timer,
                            remaining_secs,
                        } => serde_json::json!({
                            "state": "running",
                            "timer": timer,
                            "end_at": timer.end_at().map(|t| time::to_rfc3339(&t)),
                            "remaining_secs": remaining_secs,
                        }),
                        TimerStatus::Finished { timer } => serde_json::json!({
                            "state": "finished",
                            "timer": timer,
                            "end_at": timer.end_at().map(|t| time::to_rfc3339(&t)),
                            "remaining_secs": 0,
                        }),
                    };
                    output::print_json(&time::command_envelope(&now, "timer.status", "ok", extra))?
                }
                OutputFormat::Text => println!("{}", render_status(&status)),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 14, 0, 0).unwrap()
    }

    #[test]
    fn test_non_positive_minutes_rejected_without_mutation() {
        let mut doc = Document::default();
        start_timer(&mut doc, "Reading", 25, t0()).unwrap();
        let snapshot = doc.clone();
        for bad in [0, -1, -50] {
            let err = start_timer(&mut doc, "Deep work", bad, t0()).unwrap_err();
            assert_eq!(err.to_string(), "Validation error: --minutes must be positive");
        }
        assert_eq!(doc, snapshot);
    }

    #[test]
    fn test_oversized_minutes_rejected() {
        let mut doc = Document::default();
        assert!(start_timer(&mut doc, "forever", i64::from(u32::MAX) + 1, t0()).is_err());
        assert!(doc.timer.is_none());
    }

    #[test]
    fn test_any_label_is_accepted() {
        let mut doc = Document::default();
        for label in ["", "   "] {
            let started = start_timer(&mut doc, label, 5, t0()).unwrap();
            assert_eq!(started.timer.label, label);
        }
        assert_eq!(
            render_status(&timer_status(&doc, t0())),
            "Timer '   ' has 05:00 remaining."
        );
    }

    #[test]
    fn test_start_replaces_existing() {
        let mut doc = Document::default();
        let first = start_timer(&mut doc, "Reading", 25, t0()).unwrap();
        assert!(first.replaced.is_none());
        let second = start_timer(&mut doc, "Deep work", 50, t0() + Duration::minutes(5)).unwrap();
        assert_eq!(second.replaced.map(|t| t.label), Some("Reading".to_string()));
        assert_eq!(doc.timer.as_ref().map(|t| t.minutes), Some(50));
    }

    #[test]
    fn test_status_rendering() {
        let mut doc = Document::default();
        assert_eq!(render_status(&timer_status(&doc, t0())), "No active timer.");

        start_timer(&mut doc, "Deep work", 50, t0()).unwrap();
        let status = timer_status(&doc, t0() + Duration::minutes(49) + Duration::seconds(59));
        assert_eq!(render_status(&status), "Timer 'Deep work' has 00:01 remaining.");

        let status = timer_status(&doc, t0() + Duration::minutes(50));
        assert_eq!(render_status(&status), "Timer 'Deep work' finished.");
    }

    #[test]
    fn test_cli_accepts_negative_minutes_for_validation() {
        let cli = TimerCli::try_parse_from(["timer", "start", "Deep work", "--minutes", "-3"])
            .unwrap();
        assert!(matches!(cli.command, TimerCommand::Start { minutes: -3, .. }));
    }
}

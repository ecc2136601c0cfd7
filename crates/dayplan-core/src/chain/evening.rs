//! Evening-routine placement.
//!
//! The routine is not tied to an anchor. It starts no earlier than
//! `earliest_hour` local time on the wake day, unless sleep itself comes
//! before that hour, in which case the floor is relaxed. It is dropped when
//! it would end after sleep.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone, Utc};

use super::{Chain, ChainKind, ChainStatus, ChainStep, DropReason, DroppedChain};
use crate::config::EveningRoutineConfig;

pub const EVENING_ROUTINE_TITLE: &str = "evening routine";

/// The earliest-start floor on the local calendar day of `wake_time`.
pub fn evening_floor(
    wake_time: DateTime<Utc>,
    earliest_hour: u32,
    offset: FixedOffset,
) -> Option<DateTime<Utc>> {
    let wake_day = wake_time.with_timezone(&offset).date_naive();
    let floor = NaiveTime::from_hms_opt(earliest_hour, 0, 0)?;
    offset
        .from_local_datetime(&wake_day.and_time(floor))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Place the evening routine, or report why it was dropped.
///
/// Anchors are not consulted, so the routine may overlap an evening event.
pub fn place_evening_routine(
    wake_time: DateTime<Utc>,
    sleep_time: DateTime<Utc>,
    now: DateTime<Utc>,
    config: &EveningRoutineConfig,
    offset: FixedOffset,
) -> Result<Chain, DroppedChain> {
    let plan_start = wake_time.max(now);

    // Sleep before the floor on the wake day relaxes it.
    let start = match evening_floor(wake_time, config.earliest_hour, offset) {
        Some(floor) if sleep_time >= floor => floor.max(plan_start),
        _ => plan_start,
    };
    let end = Duration::try_minutes(config.duration_minutes)
        .and_then(|d| start.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    if end > sleep_time {
        return Err(DroppedChain {
            anchor_id: None,
            title: EVENING_ROUTINE_TITLE.to_string(),
            reason: DropReason::OverrunsSleep {
                ends_at: end,
                sleep_time,
            },
        });
    }

    Ok(Chain {
        kind: ChainKind::EveningRoutine,
        anchor: None,
        steps: vec![ChainStep {
            name: "evening_routine".to_string(),
            duration_minutes: config.duration_minutes,
            order: 1,
        }],
        start_time: start,
        chain_completion_deadline: end,
        status: ChainStatus::at(start, end, now),
    })
}

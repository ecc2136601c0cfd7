//! Home interval calculation.
//!
//! Finds the free windows of a day between wake and sleep that no anchor
//! occupies, plus the optional wake ramp at the start of the day.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::anchor::Anchor;
use crate::error::ValidationError;

/// A free window not occupied by any anchor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(rename = "duration")]
    pub duration_minutes: i64,
}

impl HomeInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            duration_minutes: (end - start).num_minutes().max(0),
        }
    }

    /// Check if this interval can fit a span of the given length
    pub fn can_fit(&self, minutes: i64) -> bool {
        self.duration_minutes >= minutes
    }

    /// Whether an instant lies in `(start, end]`, i.e. a span ending there
    /// could start inside this interval.
    pub fn ends_within(&self, instant: DateTime<Utc>) -> bool {
        self.start < instant && instant <= self.end
    }
}

/// Buffer interval directly after waking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WakeRamp {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: i64,
}

/// Compute home intervals for `[wake_time, sleep_time]` minus anchor occupancy.
///
/// Anchors need not be sorted; ties keep their input order. Overlapping
/// anchors merge through the cursor, and anchors outside the window are
/// clipped.
///
/// # Errors
/// `InvalidWindow` if `wake_time >= sleep_time`.
pub fn compute_home_intervals(
    wake_time: DateTime<Utc>,
    sleep_time: DateTime<Utc>,
    anchors: &[Anchor],
) -> Result<Vec<HomeInterval>, ValidationError> {
    if wake_time >= sleep_time {
        return Err(ValidationError::InvalidWindow {
            wake: wake_time,
            sleep: sleep_time,
        });
    }

    let mut sorted: Vec<&Anchor> = anchors.iter().collect();
    sorted.sort_by_key(|a| a.start_time);

    let mut intervals = Vec::new();
    let mut cursor = wake_time;

    for anchor in sorted {
        if anchor.start_time >= sleep_time {
            break;
        }
        if anchor.start_time > cursor {
            intervals.push(HomeInterval::new(cursor, anchor.start_time));
        }
        cursor = cursor.max(anchor.end_time.min(sleep_time));
    }

    if cursor < sleep_time {
        intervals.push(HomeInterval::new(cursor, sleep_time));
    }

    Ok(intervals)
}

/// The wake ramp, if the first home interval starts at wake and is long enough.
pub fn wake_ramp(
    wake_time: DateTime<Utc>,
    intervals: &[HomeInterval],
    ramp_minutes: i64,
) -> Option<WakeRamp> {
    if ramp_minutes <= 0 {
        return None;
    }
    let first = intervals.first()?;
    if first.start != wake_time || !first.can_fit(ramp_minutes) {
        return None;
    }
    Some(WakeRamp {
        start: wake_time,
        end: wake_time + Duration::minutes(ramp_minutes),
        duration_minutes: ramp_minutes,
    })
}

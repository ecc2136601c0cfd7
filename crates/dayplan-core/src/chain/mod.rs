//! Activity-chain scheduling.
//!
//! For each anchor that needs preparation, builds an ordered list of steps
//! that must finish exactly when the anchor starts, and places it at the end
//! of the home interval leading into the anchor:
//! - Step durations come from [`ChainConfig`], buffer scaled by energy
//! - Chains that do not fit are dropped and reported, never raised
//! - The evening routine is placed separately (see [`evening`])

pub mod evening;

use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::anchor::Anchor;
use crate::config::{ChainConfig, ChainPolicy, EveningRoutineConfig};
use crate::interval::HomeInterval;
use crate::request::EnergyLevel;

pub use evening::place_evening_routine;

/// Progress of a chain relative to the current time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainStatus {
    Pending,
    Active,
    Missed,
}

impl ChainStatus {
    /// Status of a chain spanning `[start, deadline)` at `now`.
    pub fn at(start: DateTime<Utc>, deadline: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if now < start {
            Self::Pending
        } else if now < deadline {
            Self::Active
        } else {
            Self::Missed
        }
    }
}

/// What a chain leads into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainKind {
    Anchor,
    EveningRoutine,
}

/// One step of a chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStep {
    pub name: String,
    pub duration_minutes: i64,
    pub order: u32,
}

/// An ordered sequence of steps with a hard completion deadline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    pub kind: ChainKind,
    /// `None` for the evening routine
    pub anchor: Option<Anchor>,
    pub steps: Vec<ChainStep>,
    pub start_time: DateTime<Utc>,
    pub chain_completion_deadline: DateTime<Utc>,
    pub status: ChainStatus,
}

impl Chain {
    /// Sum of step durations in minutes
    pub fn total_minutes(&self) -> i64 {
        self.steps
            .iter()
            .fold(0, |acc, s| acc.saturating_add(s.duration_minutes))
    }

    /// Chronological position: the anchor's start, or the chain's own start.
    pub fn sort_key(&self) -> DateTime<Utc> {
        self.anchor
            .as_ref()
            .map(|a| a.start_time)
            .unwrap_or(self.start_time)
    }
}

/// Why a chain was left out of the plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DropReason {
    /// No home interval leads into the anchor
    NoFreeInterval,
    /// The interval before the anchor is shorter than the chain
    InsufficientTime {
        needed_minutes: i64,
        available_minutes: i64,
    },
    /// The routine would end after sleep
    OverrunsSleep {
        ends_at: DateTime<Utc>,
        sleep_time: DateTime<Utc>,
    },
}

/// A chain that was not scheduled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedChain {
    pub anchor_id: Option<String>,
    pub title: String,
    #[serde(flatten)]
    pub reason: DropReason,
}

/// Chains that fit and chains that did not
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainOutcome {
    pub chains: Vec<Chain>,
    pub dropped: Vec<DroppedChain>,
}

/// Builds and places chains for one day
#[derive(Debug, Clone)]
pub struct ChainBuilder {
    config: ChainConfig,
    evening: EveningRoutineConfig,
    offset: FixedOffset,
}

impl ChainBuilder {
    /// Create a builder with default config in UTC
    pub fn new() -> Self {
        Self::with_config(
            ChainConfig::default(),
            EveningRoutineConfig::default(),
            Utc.fix(),
        )
    }

    /// Create with custom config
    pub fn with_config(
        config: ChainConfig,
        evening: EveningRoutineConfig,
        offset: FixedOffset,
    ) -> Self {
        Self {
            config,
            evening,
            offset,
        }
    }

    /// Whether the policy asks for a chain before this anchor
    pub fn requires_chain(&self, anchor: &Anchor) -> bool {
        match self.config.policy {
            ChainPolicy::MustAttend => anchor.must_attend,
            ChainPolicy::AllAnchors => true,
        }
    }

    /// Ordered steps for an anchor. Zero-length steps are left out.
    pub fn steps_for(&self, anchor: &Anchor, energy: EnergyLevel) -> Vec<ChainStep> {
        let factor = self.config.energy_buffer_scale.factor(energy);
        let buffer = (self.config.buffer_minutes as f64 * factor).round() as i64;

        let mut planned = vec![(anchor.anchor_type.prep_step_name(), self.config.prep_minutes)];
        if anchor.must_attend {
            planned.push(("commute", self.config.commute_minutes));
        }
        planned.push(("buffer", buffer));

        planned
            .into_iter()
            .filter(|(_, minutes)| *minutes > 0)
            .zip(1u32..)
            .map(|((name, minutes), order)| ChainStep {
                name: name.to_string(),
                duration_minutes: minutes,
                order,
            })
            .collect()
    }

    /// Build chains for every anchor that needs one, plus the evening routine.
    ///
    /// # Arguments
    /// * `anchors` - The day's anchors, any order
    /// * `home_intervals` - Output of [`crate::interval::compute_home_intervals`]
    /// * `wake_time` / `sleep_time` - The day window
    /// * `now` - Current time, used for placement and status
    /// * `energy` - Scales the buffer step
    pub fn build_chains(
        &self,
        anchors: &[Anchor],
        home_intervals: &[HomeInterval],
        wake_time: DateTime<Utc>,
        sleep_time: DateTime<Utc>,
        now: DateTime<Utc>,
        energy: EnergyLevel,
    ) -> ChainOutcome {
        let mut outcome = ChainOutcome::default();

        for anchor in anchors.iter().filter(|a| self.requires_chain(a)) {
            match self.place_anchor_chain(anchor, home_intervals, now, energy) {
                Some(Ok(chain)) => {
                    tracing::debug!(
                        anchor = %anchor.id,
                        start = %chain.start_time,
                        deadline = %chain.chain_completion_deadline,
                        "placed chain"
                    );
                    outcome.chains.push(chain);
                }
                Some(Err(dropped)) => {
                    tracing::debug!(anchor = %anchor.id, reason = ?dropped.reason, "dropped chain");
                    outcome.dropped.push(dropped);
                }
                None => {}
            }
        }

        if self.evening.enabled {
            match place_evening_routine(wake_time, sleep_time, now, &self.evening, self.offset) {
                Ok(chain) => outcome.chains.push(chain),
                Err(dropped) => {
                    tracing::debug!(reason = ?dropped.reason, "dropped evening routine");
                    outcome.dropped.push(dropped);
                }
            }
        }

        outcome
    }

    /// Place one anchor's chain. `None` when the anchor has no steps at all.
    fn place_anchor_chain(
        &self,
        anchor: &Anchor,
        home_intervals: &[HomeInterval],
        now: DateTime<Utc>,
        energy: EnergyLevel,
    ) -> Option<Result<Chain, DroppedChain>> {
        let steps = self.steps_for(anchor, energy);
        if steps.is_empty() {
            return None;
        }

        let total = steps
            .iter()
            .try_fold(0i64, |acc, s| acc.checked_add(s.duration_minutes));
        let deadline = anchor.start_time;
        let dropped = |reason| DroppedChain {
            anchor_id: Some(anchor.id.clone()),
            title: anchor.title.clone(),
            reason,
        };

        let Some(interval) = home_intervals.iter().find(|h| h.ends_within(deadline)) else {
            return Some(Err(dropped(DropReason::NoFreeInterval)));
        };

        let available_minutes = (deadline - interval.start).num_minutes();
        let planned_start = total
            .and_then(Duration::try_minutes)
            .and_then(|d| deadline.checked_sub_signed(d))
            .filter(|start| *start >= interval.start);
        let Some(planned_start) = planned_start else {
            return Some(Err(dropped(DropReason::InsufficientTime {
                needed_minutes: total.unwrap_or(i64::MAX),
                available_minutes,
            })));
        };

        let start_time = planned_start.max(now).min(deadline);
        Some(Ok(Chain {
            kind: ChainKind::Anchor,
            anchor: Some(anchor.clone()),
            steps,
            start_time,
            chain_completion_deadline: deadline,
            status: ChainStatus::at(start_time, deadline, now),
        }))
    }
}

impl Default for ChainBuilder {
    fn default() -> Self {
        Self::new()
    }
}

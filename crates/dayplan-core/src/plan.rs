//! Daily plan assembly.
//!
//! [`DailyPlanner`] runs the whole pipeline for one request: validate the
//! parameters, fetch the day's events, classify anchors, compute home
//! intervals, place chains and assemble the response. Collaborators are
//! passed in; the planner holds only configuration.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::anchor::{anchors_from_events, Anchor};
use crate::calendar::{CalendarEvent, CalendarSource};
use crate::chain::{Chain, ChainBuilder, DroppedChain};
use crate::clock::Clock;
use crate::config::{Config, DayConfig};
use crate::error::Result;
use crate::interval::{compute_home_intervals, wake_ramp, HomeInterval, WakeRamp};
use crate::request::{validate, RawParams, ValidatedParams};

/// Response payload for one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPlanResponse {
    pub date: NaiveDate,
    pub anchors: Vec<Anchor>,
    pub chains: Vec<Chain>,
    pub home_intervals: Vec<HomeInterval>,
    pub wake_ramp: Option<WakeRamp>,
    /// Chains that were left out and why
    #[serde(default)]
    pub dropped: Vec<DroppedChain>,
}

/// Compose the response. Chains are ordered by their anchor's start, the
/// evening routine by its own start; ties keep input order.
pub fn assemble(
    date: NaiveDate,
    anchors: Vec<Anchor>,
    mut chains: Vec<Chain>,
    home_intervals: Vec<HomeInterval>,
    wake_ramp: Option<WakeRamp>,
    dropped: Vec<DroppedChain>,
) -> DailyPlanResponse {
    chains.sort_by_key(Chain::sort_key);
    DailyPlanResponse {
        date,
        anchors,
        chains,
        home_intervals,
        wake_ramp,
        dropped,
    }
}

/// Runs the scheduling pipeline.
#[derive(Debug, Clone)]
pub struct DailyPlanner {
    day: DayConfig,
    offset: FixedOffset,
    chains: ChainBuilder,
}

impl DailyPlanner {
    /// Create a planner from configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration does not validate.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let offset = config.day.local_offset()?;
        Ok(Self {
            day: config.day.clone(),
            offset,
            chains: ChainBuilder::with_config(
                config.chains.clone(),
                config.evening_routine.clone(),
                offset,
            ),
        })
    }

    pub fn day_config(&self) -> &DayConfig {
        &self.day
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Plan a day from already-fetched events. Pure in its inputs.
    ///
    /// # Errors
    /// `InvalidWindow` if the window is empty or inverted.
    pub fn plan(
        &self,
        params: &ValidatedParams,
        events: &[CalendarEvent],
        now: DateTime<Utc>,
    ) -> Result<DailyPlanResponse> {
        let mut anchors = anchors_from_events(events);
        anchors.sort_by_key(|a| a.start_time);

        let home_intervals = compute_home_intervals(params.wake_time, params.sleep_time, &anchors)?;
        let ramp = wake_ramp(params.wake_time, &home_intervals, self.day.wake_ramp_minutes);

        let outcome = self.chains.build_chains(
            &anchors,
            &home_intervals,
            params.wake_time,
            params.sleep_time,
            now,
            params.energy,
        );

        tracing::info!(
            date = %params.date,
            anchors = anchors.len(),
            chains = outcome.chains.len(),
            dropped = outcome.dropped.len(),
            home_intervals = home_intervals.len(),
            "planned day"
        );

        Ok(assemble(
            params.date,
            anchors,
            outcome.chains,
            home_intervals,
            ramp,
            outcome.dropped,
        ))
    }

    /// Validate raw parameters, fetch the user's events and plan the day.
    ///
    /// # Errors
    /// Validation errors before any fetch; calendar errors from the source.
    pub async fn plan_for_user(
        &self,
        calendar: &dyn CalendarSource,
        clock: &dyn Clock,
        user_id: &str,
        raw: &RawParams,
    ) -> Result<DailyPlanResponse> {
        let now = clock.now();
        let params = validate(raw, &self.day, now)?;
        let events = calendar.events_for_date(user_id, params.date).await?;
        tracing::debug!(user = user_id, date = %params.date, events = events.len(), "fetched events");
        self.plan(&params, &events, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::StaticCalendarSource;
    use crate::chain::{ChainKind, ChainStatus};
    use crate::clock::FixedClock;
    use crate::error::{CoreError, ValidationError};
    use crate::request::EnergyLevel;
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn params() -> ValidatedParams {
        ValidatedParams {
            date: date(),
            wake_time: at(7, 0),
            sleep_time: at(23, 0),
            energy: EnergyLevel::Medium,
        }
    }

    fn events() -> Vec<CalendarEvent> {
        vec![
            CalendarEvent::new("dentist", "Dentist", at(15, 0), at(15, 30)).with_location("Main St 4"),
            CalendarEvent::new("lecture", "Algorithms lecture", at(10, 0), at(12, 0))
                .with_location("Hall B"),
            CalendarEvent::new("call", "Team call", at(13, 0), at(13, 30)),
        ]
    }

    #[test]
    fn assemble_orders_chains_by_anchor_then_own_start() {
        let planner = DailyPlanner::new(&Config::default()).unwrap();
        let plan = planner.plan(&params(), &events(), at(6, 0)).unwrap();

        let keys: Vec<_> = plan.chains.iter().map(Chain::sort_key).collect();
        assert_eq!(keys, vec![at(10, 0), at(15, 0), at(18, 0)]);
        assert_eq!(plan.chains.last().unwrap().kind, ChainKind::EveningRoutine);
    }

    #[test]
    fn new_rejects_out_of_range_config() {
        let mut config = Config::default();
        config.evening_routine.duration_minutes = 1_000_000_000_000_000;
        assert!(matches!(
            DailyPlanner::new(&config),
            Err(CoreError::Config(crate::error::ConfigError::InvalidValue { .. }))
        ));

        let mut config = Config::default();
        config.chains.energy_buffer_scale.low = 1e300;
        assert!(DailyPlanner::new(&config).is_err());
    }

    #[test]
    fn plan_contains_all_parts() {
        let planner = DailyPlanner::new(&Config::default()).unwrap();
        let plan = planner.plan(&params(), &events(), at(6, 0)).unwrap();

        assert_eq!(plan.date, date());
        assert_eq!(
            plan.anchors.iter().map(|a| a.id.as_str()).collect::<Vec<_>>(),
            vec!["lecture", "call", "dentist"]
        );
        assert_eq!(plan.home_intervals.len(), 4);
        assert_eq!(plan.wake_ramp.as_ref().map(|r| r.end), Some(at(7, 30)));
        assert!(plan.dropped.is_empty());
        assert!(plan.chains.iter().all(|c| c.status == ChainStatus::Pending));
    }

    #[test]
    fn plan_is_idempotent_for_frozen_inputs() {
        let planner = DailyPlanner::new(&Config::default()).unwrap();
        let a = serde_json::to_string(&planner.plan(&params(), &events(), at(11, 0)).unwrap()).unwrap();
        let b = serde_json::to_string(&planner.plan(&params(), &events(), at(11, 0)).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn plan_serializes_documented_shape() {
        let planner = DailyPlanner::new(&Config::default()).unwrap();
        let plan = planner.plan(&params(), &events(), at(6, 0)).unwrap();
        let json = serde_json::to_value(&plan).unwrap();

        assert_eq!(json["date"], "2025-03-10");
        assert_eq!(json["anchors"][0]["type"], "class");
        assert_eq!(json["anchors"][0]["must_attend"], true);
        assert!(json["home_intervals"][0]["duration"].is_i64());
        let chain = &json["chains"][0];
        assert_eq!(chain["anchor"]["id"], "lecture");
        assert_eq!(chain["status"], "pending");
        assert_eq!(chain["steps"][0]["name"], "review notes");
        assert!(chain["steps"][0]["duration_minutes"].is_i64());
        assert!(chain["chain_completion_deadline"].is_string());
        assert!(json["chains"][2]["anchor"].is_null());
    }

    #[test]
    fn inverted_window_fails() {
        let planner = DailyPlanner::new(&Config::default()).unwrap();
        let mut p = params();
        p.sleep_time = p.wake_time - Duration::minutes(1);
        assert!(matches!(
            planner.plan(&p, &[], at(6, 0)),
            Err(CoreError::Validation(ValidationError::InvalidWindow { .. }))
        ));
    }

    #[tokio::test]
    async fn plan_for_user_fetches_the_validated_date() {
        let planner = DailyPlanner::new(&Config::default()).unwrap();
        let source = StaticCalendarSource::new().with_events("u1", date(), events());
        let clock = FixedClock(at(6, 0));

        let plan = planner
            .plan_for_user(&source, &clock, "u1", &RawParams::default())
            .await
            .unwrap();
        assert_eq!(plan.anchors.len(), 3);

        let other_day = RawParams {
            date: Some("2025-03-11".into()),
            ..RawParams::default()
        };
        let plan = planner
            .plan_for_user(&source, &clock, "u1", &other_day)
            .await
            .unwrap();
        assert!(plan.anchors.is_empty());
        assert_eq!(plan.home_intervals.len(), 1);
    }

    #[tokio::test]
    async fn plan_for_user_rejects_bad_energy_before_fetching() {
        struct FailingSource;

        #[async_trait::async_trait]
        impl CalendarSource for FailingSource {
            async fn events_for_date(
                &self,
                _user_id: &str,
                _date: NaiveDate,
            ) -> std::result::Result<Vec<CalendarEvent>, crate::error::CalendarError> {
                panic!("calendar must not be queried for invalid requests");
            }
        }

        let planner = DailyPlanner::new(&Config::default()).unwrap();
        let raw = RawParams {
            energy: Some("sleepy".into()),
            ..RawParams::default()
        };
        let err = planner
            .plan_for_user(&FailingSource, &FixedClock(at(6, 0)), "u1", &raw)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}

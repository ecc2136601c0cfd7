//! Shared server state.
//!
//! Every collaborator is held behind a trait object so tests can swap in a
//! static calendar and a frozen clock.

use std::sync::Arc;

use dayplan_core::{CalendarSource, Clock, Config, CoreError, DailyPlanner, SystemClock};

use crate::auth::{IdentityProvider, TokenIdentityProvider};

#[derive(Clone)]
pub struct AppState {
    pub planner: Arc<DailyPlanner>,
    pub calendar: Arc<dyn CalendarSource>,
    pub identity: Arc<dyn IdentityProvider>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(
        planner: DailyPlanner,
        calendar: Arc<dyn CalendarSource>,
        identity: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            planner: Arc::new(planner),
            calendar,
            identity,
            clock,
        }
    }

    /// Wire up the production collaborators from configuration.
    pub fn from_config(config: &Config) -> Result<Self, CoreError> {
        let planner = DailyPlanner::new(config)?;
        let calendar = dayplan_core::source_from_config(&config.calendar)?;
        let identity = Arc::new(TokenIdentityProvider::from_tokens(&config.server.tokens));
        Ok(Self::new(planner, calendar, identity, Arc::new(SystemClock)))
    }
}

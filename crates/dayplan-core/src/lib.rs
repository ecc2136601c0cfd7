//! # Dayplan Core Library
//!
//! This library provides the daily activity-chain scheduler: given the day's
//! fixed calendar anchors, a wake/sleep window and an energy level, it finds
//! the free "home intervals" of the day and places preparation chains and the
//! evening routine into them. The CLI and the HTTP server are thin layers over
//! the same core.
//!
//! ## Architecture
//!
//! - **Anchors**: keyword classification of calendar events
//! - **Intervals**: free windows between anchors, plus the wake ramp
//! - **Chains**: ordered steps ending at each anchor's start; evening routine
//! - **Plan**: validation, orchestration and response assembly
//! - **Calendar**: injected event sources (static, file, HTTP)
//!
//! ## Key Components
//!
//! - [`DailyPlanner`]: runs the pipeline for one request
//! - [`ChainBuilder`]: chain construction and placement
//! - [`CalendarSource`]: trait for event collaborators
//! - [`Config`]: application configuration management

pub mod anchor;
pub mod calendar;
pub mod chain;
pub mod clock;
pub mod config;
pub mod error;
pub mod interval;
pub mod plan;
pub mod request;

pub use anchor::{
    classify, classify_text, has_location, is_physical_location, Anchor, AnchorType,
};
pub use calendar::{
    source_from_config, CalendarEvent, CalendarSource, FileCalendarSource, HttpCalendarSource,
    StaticCalendarSource,
};
pub use chain::{
    place_evening_routine, Chain, ChainBuilder, ChainKind, ChainOutcome, ChainStatus, ChainStep,
    DropReason, DroppedChain,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{CalendarSourceKind, ChainPolicy, Config};
pub use error::{CalendarError, ConfigError, CoreError, Result, ValidationError};
pub use interval::{compute_home_intervals, wake_ramp, HomeInterval, WakeRamp};
pub use plan::{assemble, DailyPlanResponse, DailyPlanner};
pub use request::{validate, EnergyLevel, RawParams, ValidatedParams};

//! Calendar-event collaborator.
//!
//! The scheduler only ever reads events. Sources are injected into the
//! planner; nothing here is a process-wide singleton.

mod http;

pub use http::HttpCalendarSource;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{CalendarConfig, CalendarSourceKind};
use crate::error::{CalendarError, CoreError};

/// A calendar event as supplied by the calendar collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(alias = "startTime")]
    pub start_time: DateTime<Utc>,
    #[serde(alias = "endTime")]
    pub end_time: DateTime<Utc>,
}

impl CalendarEvent {
    /// Create an event with no description or location
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            location: None,
            start_time,
            end_time,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Either a bare list of events or `{ "events": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum EventsPayload {
    List(Vec<CalendarEvent>),
    Wrapped { events: Vec<CalendarEvent> },
}

impl EventsPayload {
    fn into_events(self) -> Vec<CalendarEvent> {
        match self {
            Self::List(events) | Self::Wrapped { events } => events,
        }
    }
}

/// Parse an events document in either accepted shape.
pub fn parse_events(json: &str) -> Result<Vec<CalendarEvent>, CalendarError> {
    serde_json::from_str::<EventsPayload>(json)
        .map(EventsPayload::into_events)
        .map_err(|e| CalendarError::Parse(e.to_string()))
}

/// Source of calendar events for one user and date.
#[async_trait]
pub trait CalendarSource: Send + Sync {
    /// Fetch every event for the user on the given date. A single read, no retries.
    async fn events_for_date(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<CalendarEvent>, CalendarError>;
}

/// In-memory events keyed by user and date.
#[derive(Debug, Clone, Default)]
pub struct StaticCalendarSource {
    events: HashMap<(String, NaiveDate), Vec<CalendarEvent>>,
}

impl StaticCalendarSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(
        mut self,
        user_id: impl Into<String>,
        date: NaiveDate,
        events: Vec<CalendarEvent>,
    ) -> Self {
        self.events.insert((user_id.into(), date), events);
        self
    }
}

#[async_trait]
impl CalendarSource for StaticCalendarSource {
    async fn events_for_date(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        Ok(self
            .events
            .get(&(user_id.to_string(), date))
            .cloned()
            .unwrap_or_default())
    }
}

/// Events stored as `<root>/<user_id>/<YYYY-MM-DD>.json`.
#[derive(Debug, Clone)]
pub struct FileCalendarSource {
    root: PathBuf,
}

impl FileCalendarSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, user_id: &str, date: NaiveDate) -> Result<PathBuf, CalendarError> {
        validate_user_id(user_id)?;
        Ok(self
            .root
            .join(user_id)
            .join(format!("{}.json", date.format("%Y-%m-%d"))))
    }
}

#[async_trait]
impl CalendarSource for FileCalendarSource {
    async fn events_for_date(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let path = self.path_for(user_id, date)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => parse_events(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no events file for date");
                Ok(Vec::new())
            }
            Err(source) => Err(CalendarError::Io { path, source }),
        }
    }
}

/// Build the configured calendar source.
///
/// # Errors
/// Returns an error if the http source has no usable `base_url` or the
/// events directory cannot be resolved.
pub fn source_from_config(config: &CalendarConfig) -> Result<Arc<dyn CalendarSource>, CoreError> {
    match config.source {
        CalendarSourceKind::File => Ok(Arc::new(FileCalendarSource::new(config.events_dir()?))),
        CalendarSourceKind::Http => {
            let base_url = config.base_url.as_deref().ok_or_else(|| {
                CalendarError::NotConfigured("calendar.base_url is required for the http source".into())
            })?;
            Ok(Arc::new(HttpCalendarSource::new(base_url, config.api_token.clone())?))
        }
    }
}

/// User ids become path segments, so they must not escape the root.
pub(crate) fn validate_user_id(user_id: &str) -> Result<(), CalendarError> {
    let bad = user_id.is_empty()
        || user_id == "."
        || user_id == ".."
        || user_id.contains(['/', '\\', '\0']);
    if bad {
        return Err(CalendarError::InvalidUser(user_id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn sample() -> CalendarEvent {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        CalendarEvent::new("e1", "Lecture", start, start + chrono::Duration::hours(1))
            .with_location("Hall A")
    }

    #[test]
    fn parses_bare_and_wrapped_payloads() {
        let bare = r#"[{"id":"a","title":"Lecture","start_time":"2025-03-10T09:00:00Z","end_time":"2025-03-10T10:00:00Z"}]"#;
        let wrapped = r#"{"events":[{"id":"a","startTime":"2025-03-10T09:00:00Z","endTime":"2025-03-10T10:00:00Z","location":null}]}"#;

        let a = parse_events(bare).unwrap();
        let b = parse_events(wrapped).unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].title, "Lecture");
        assert_eq!(b[0].title, "");
        assert_eq!(a[0].start_time, b[0].start_time);
    }

    #[test]
    fn rejects_malformed_payload() {
        assert!(matches!(parse_events("{\"nope\": 1}"), Err(CalendarError::Parse(_))));
    }

    #[tokio::test]
    async fn static_source_returns_events_for_matching_key_only() {
        let source = StaticCalendarSource::new().with_events("u1", date(), vec![sample()]);
        assert_eq!(source.events_for_date("u1", date()).await.unwrap().len(), 1);
        assert!(source.events_for_date("u2", date()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_source_reads_user_date_file() {
        let dir = TempDir::new().unwrap();
        let user_dir = dir.path().join("u1");
        std::fs::create_dir_all(&user_dir).unwrap();
        std::fs::write(
            user_dir.join("2025-03-10.json"),
            serde_json::to_string(&vec![sample()]).unwrap(),
        )
        .unwrap();

        let source = FileCalendarSource::new(dir.path());
        let events = source.events_for_date("u1", date()).await.unwrap();
        assert_eq!(events, vec![sample()]);
    }

    #[tokio::test]
    async fn file_source_missing_file_is_empty_day() {
        let dir = TempDir::new().unwrap();
        let source = FileCalendarSource::new(dir.path());
        assert!(source.events_for_date("u1", date()).await.unwrap().is_empty());
    }

    #[test]
    fn http_source_requires_base_url() {
        let config = CalendarConfig {
            source: CalendarSourceKind::Http,
            ..CalendarConfig::default()
        };
        assert!(matches!(
            source_from_config(&config),
            Err(CoreError::Calendar(CalendarError::NotConfigured(_)))
        ));

        let config = CalendarConfig {
            base_url: Some("https://cal.example.com".into()),
            ..config
        };
        assert!(source_from_config(&config).is_ok());
    }

    #[tokio::test]
    async fn file_source_rejects_path_like_user_ids() {
        let dir = TempDir::new().unwrap();
        let source = FileCalendarSource::new(dir.path());
        for user in ["", "..", "a/b", "a\\b"] {
            let result = source.events_for_date(user, date()).await;
            assert!(matches!(result, Err(CalendarError::InvalidUser(_))), "{user:?}");
        }
    }
}

//! Anchor classification.
//!
//! An anchor is a fixed calendar commitment for the day. Classification is a
//! best-effort keyword match over the event title and description; the
//! must-attend flag depends only on whether the event has a location.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::CalendarEvent;

/// Kind of fixed commitment an anchor represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorType {
    Class,
    Appointment,
    Workshop,
    Seminar,
    Generic,
}

impl AnchorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Appointment => "appointment",
            Self::Workshop => "workshop",
            Self::Seminar => "seminar",
            Self::Generic => "generic",
        }
    }

    /// Name of the preparation step for this kind of anchor
    pub fn prep_step_name(&self) -> &'static str {
        match self {
            Self::Class => "review notes",
            Self::Appointment => "gather documents",
            Self::Workshop => "pack materials",
            Self::Seminar => "skim reading",
            Self::Generic => "get ready",
        }
    }
}

impl std::fmt::Display for AnchorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword sets checked in order; first match wins.
const KEYWORDS: &[(&[&str], AnchorType)] = &[
    (&["lecture", "class"], AnchorType::Class),
    (&["tutorial"], AnchorType::Class),
    (&["workshop"], AnchorType::Workshop),
    (&["seminar"], AnchorType::Seminar),
    (&["appointment", "doctor", "dentist"], AnchorType::Appointment),
];

/// Classify a calendar event by keywords in its title and description.
pub fn classify(event: &CalendarEvent) -> AnchorType {
    classify_text(&event.title, event.description.as_deref())
}

/// Keyword classification of a bare title and optional description.
pub fn classify_text(title: &str, description: Option<&str>) -> AnchorType {
    let haystack = format!("{} {}", title, description.unwrap_or_default()).to_lowercase();

    KEYWORDS
        .iter()
        .find(|(words, _)| words.iter().any(|w| haystack.contains(w)))
        .map(|(_, kind)| *kind)
        .unwrap_or(AnchorType::Generic)
}

/// Whether the event has a non-blank location.
pub fn has_location(event: &CalendarEvent) -> bool {
    is_physical_location(event.location.as_deref())
}

/// A location counts only when it has non-whitespace content.
pub fn is_physical_location(location: Option<&str>) -> bool {
    location.is_some_and(|loc| !loc.trim().is_empty())
}

/// A fixed commitment derived from a calendar event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub anchor_type: AnchorType,
    pub must_attend: bool,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Anchor {
    /// Build an anchor from a calendar event.
    pub fn from_event(event: &CalendarEvent) -> Self {
        let must_attend = has_location(event);
        Self {
            id: event.id.clone(),
            title: event.title.clone(),
            anchor_type: classify(event),
            must_attend,
            start_time: event.start_time,
            end_time: event.end_time,
            location: if must_attend {
                event.location.as_ref().map(|l| l.trim().to_string())
            } else {
                None
            },
        }
    }

    /// Get duration in minutes
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }
}

/// Classify every event of the day.
pub fn anchors_from_events(events: &[CalendarEvent]) -> Vec<Anchor> {
    events.iter().map(Anchor::from_event).collect()
}

//! HTTP calendar-event source.
//!
//! `GET {base_url}/users/{user_id}/events?date=YYYY-MM-DD`, optionally with a
//! bearer token. One request per call; retries belong to whoever operates the
//! calendar service.

use async_trait::async_trait;
use chrono::NaiveDate;
use url::Url;

use super::{parse_events, validate_user_id, CalendarEvent, CalendarSource};
use crate::error::CalendarError;

/// Calendar source backed by a remote JSON API.
#[derive(Debug, Clone)]
pub struct HttpCalendarSource {
    client: reqwest::Client,
    base_url: Url,
    api_token: Option<String>,
}

impl HttpCalendarSource {
    /// Create a new source.
    ///
    /// # Errors
    /// Returns an error if `base_url` is not an absolute http(s) URL.
    pub fn new(base_url: &str, api_token: Option<String>) -> Result<Self, CalendarError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(CalendarError::NotConfigured(format!(
                "base url cannot be a base: {base_url}"
            )));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            api_token,
        })
    }

    fn events_url(&self, user_id: &str, date: NaiveDate) -> Result<Url, CalendarError> {
        validate_user_id(user_id)?;
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CalendarError::NotConfigured(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["users", user_id, "events"]);
        url.query_pairs_mut()
            .append_pair("date", &date.format("%Y-%m-%d").to_string());
        Ok(url)
    }
}

#[async_trait]
impl CalendarSource for HttpCalendarSource {
    async fn events_for_date(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let url = self.events_url(user_id, date)?;
        let mut request = self.client.get(url.clone());
        if let Some(ref token) = self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::warn!(%url, status = status.as_u16(), "calendar service rejected request");
            return Err(CalendarError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let events = parse_events(&body)?;
        tracing::debug!(%url, count = events.len(), "fetched calendar events");
        Ok(events)
    }
}

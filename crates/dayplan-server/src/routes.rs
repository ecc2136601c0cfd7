//! HTTP routes.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::get,
    Extension, Router,
};
use dayplan_core::{CoreError, DailyPlanResponse, RawParams, ValidationError};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::auth::{require_user, UserId};
use crate::state::AppState;

/// Errors returned by API handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, json!({ "error": "unauthorized" })),
            ApiError::Core(CoreError::Validation(err)) => {
                let error = match &err {
                    ValidationError::InvalidWindow { .. } => "invalid_window",
                    ValidationError::InvalidParameter { .. } => "invalid_parameter",
                };
                (
                    StatusCode::BAD_REQUEST,
                    json!({ "error": error, "details": err.to_string() }),
                )
            }
            ApiError::Core(CoreError::Calendar(err)) => {
                tracing::warn!(error = %err, "calendar source failed");
                (
                    StatusCode::BAD_GATEWAY,
                    json!({ "error": "calendar_unavailable", "details": err.to_string() }),
                )
            }
            ApiError::Core(err) => {
                tracing::error!(error = %err, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal_error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/chains/today", get(chains_today))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    "OK"
}

/// GET /api/chains/today
pub async fn chains_today(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
    Query(params): Query<RawParams>,
) -> Result<Json<DailyPlanResponse>, ApiError> {
    let plan = state
        .planner
        .plan_for_user(state.calendar.as_ref(), state.clock.as_ref(), &user.0, &params)
        .await?;
    Ok(Json(plan))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenIdentityProvider;
    use axum::body::Body;
    use axum::http::{header, Request};
    use chrono::{NaiveDate, TimeZone, Utc};
    use dayplan_core::config::ApiToken;
    use dayplan_core::{
        CalendarError, CalendarEvent, CalendarSource, Config, DailyPlanner, FixedClock,
        StaticCalendarSource,
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state() -> AppState {
        let day = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap();
        let calendar = StaticCalendarSource::new().with_events(
            "alice",
            day,
            vec![CalendarEvent::new("c1", "Lecture", start, start + chrono::Duration::hours(1))
                .with_location("Hall A")],
        );
        let identity = TokenIdentityProvider::from_tokens(&[ApiToken {
            token: "secret".into(),
            user_id: "alice".into(),
        }]);
        AppState::new(
            DailyPlanner::new(&Config::default()).unwrap(),
            Arc::new(calendar),
            Arc::new(identity),
            Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 3, 10, 6, 0, 0).unwrap())),
        )
    }

    async fn get(uri: &str, token: Option<&str>) -> (StatusCode, serde_json::Value) {
        get_with(state(), uri, token).await
    }

    async fn get_with(
        state: AppState,
        uri: &str,
        token: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let response = create_router(state)
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn health_needs_no_auth() {
        let response = create_router(state())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_or_bad_token_is_401() {
        let (status, body) = get("/api/chains/today", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "error": "unauthorized" }));

        let (status, _) = get("/api/chains/today?energy=bogus", Some("wrong")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn returns_plan_for_default_date() {
        let (status, body) = get("/api/chains/today", Some("secret")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["date"], "2025-03-10");
        assert_eq!(body["anchors"][0]["id"], "c1");
        assert_eq!(body["anchors"][0]["type"], "class");
        assert_eq!(body["chains"][0]["chain_completion_deadline"], "2025-03-10T10:00:00Z");
        assert_eq!(body["chains"][0]["status"], "pending");
        assert_eq!(body["home_intervals"][0]["duration"], 180);
        assert_eq!(body["wake_ramp"]["start"], "2025-03-10T07:00:00Z");
    }

    #[tokio::test]
    async fn honours_query_parameters() {
        let (status, body) = get(
            "/api/chains/today?date=2025-03-10&wakeTime=2025-03-10T09:00:00Z&sleepTime=2025-03-10T17:00:00Z&energy=high",
            Some("secret"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["home_intervals"][0]["start"], "2025-03-10T09:00:00Z");
        // sleep before 18:00 relaxes the evening floor, so the routine starts at
        // wake and sorts ahead of the lecture chain
        assert_eq!(body["chains"][0]["kind"], "evening_routine");
        assert_eq!(body["chains"][0]["start_time"], "2025-03-10T09:00:00Z");
        // 09:00-10:00 has room for the 45 minute chain
        assert_eq!(body["chains"][1]["anchor"]["id"], "c1");
        assert_eq!(body["chains"][1]["start_time"], "2025-03-10T09:15:00Z");
    }

    #[tokio::test]
    async fn invalid_energy_is_400_with_details() {
        let (status, body) = get("/api/chains/today?energy=turbo", Some("secret")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_parameter");
        assert!(body["details"].as_str().unwrap().contains("energy"));
    }

    #[tokio::test]
    async fn invalid_date_is_400() {
        let (status, body) = get("/api/chains/today?date=10/03/2025", Some("secret")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["details"].as_str().unwrap().contains("date"));
    }

    #[tokio::test]
    async fn calendar_failure_is_502() {
        struct UnavailableCalendar;

        #[async_trait::async_trait]
        impl CalendarSource for UnavailableCalendar {
            async fn events_for_date(
                &self,
                _user_id: &str,
                _date: NaiveDate,
            ) -> Result<Vec<CalendarEvent>, CalendarError> {
                Err(CalendarError::Api {
                    status: 503,
                    message: "maintenance".into(),
                })
            }
        }

        let base = state();
        let state = AppState::new(
            DailyPlanner::new(&Config::default()).unwrap(),
            Arc::new(UnavailableCalendar),
            base.identity.clone(),
            base.clock.clone(),
        );

        let (status, body) = get_with(state, "/api/chains/today", Some("secret")).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "calendar_unavailable");
        assert!(body["details"].as_str().unwrap().contains("503"));
    }

    #[tokio::test]
    async fn inverted_window_is_400() {
        let (status, body) = get(
            "/api/chains/today?wakeTime=2025-03-10T20:00:00Z&sleepTime=2025-03-10T08:00:00Z",
            Some("secret"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_window");
    }
}

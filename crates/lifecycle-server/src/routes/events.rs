use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use lifecycle_core::engine::HandleReport;
use lifecycle_core::error::LifecycleError;
use lifecycle_core::sources::DomainEvent;

use crate::error::AppError;
use crate::state::AppState;

/// POST /api/events: render and dispatch one resolved domain event.
///
/// Responds 200 with the handling report, or 202 when every root of the
/// event was incomplete and nothing was rendered.
pub async fn post_event(
    State(app): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<HandleReport>), AppError> {
    let event: DomainEvent = serde_json::from_slice(&body).map_err(LifecycleError::from)?;
    let report = app.engine.handle(&event).await?;
    let status = if report.rendered == 0 && report.skipped > 0 {
        StatusCode::ACCEPTED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(report)))
}

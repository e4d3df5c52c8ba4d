use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lifecycle_core::error::LifecycleError;

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

fn status_for(e: &LifecycleError) -> StatusCode {
    match e {
        LifecycleError::IncompleteEvent(_) => StatusCode::ACCEPTED,
        LifecycleError::Json(_)
        | LifecycleError::Yaml(_)
        | LifecycleError::PreferenceParse { .. }
        | LifecycleError::InvalidRenderTarget(_)
        | LifecycleError::InvalidRenderingStyle(_)
        | LifecycleError::InvalidGoalState(_) => StatusCode::BAD_REQUEST,
        LifecycleError::Delivery(_) => StatusCode::BAD_GATEWAY,
        LifecycleError::ContributorFailed { .. }
        | LifecycleError::ContributorTimedOut { .. }
        | LifecycleError::UnsupportedLifecycle(_)
        | LifecycleError::ConfigNotFound(_)
        | LifecycleError::Io(_)
        | LifecycleError::Regex(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.0.downcast_ref::<LifecycleError>() {
            Some(LifecycleError::IncompleteEvent(reason)) => {
                let body = serde_json::json!({ "rendered": 0, "skipped": 1, "reason": reason });
                return (StatusCode::ACCEPTED, axum::Json(body)).into_response();
            }
            Some(e) => status_for(e),
            None => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_maps_to_502() {
        let err = AppError(LifecycleError::Delivery("connection refused".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn incomplete_event_maps_to_202() {
        let err = AppError(LifecycleError::IncompleteEvent("no commits".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::ACCEPTED);
    }

    #[test]
    fn json_error_maps_to_400() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = AppError(LifecycleError::Json(json_err).into());
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unsupported_lifecycle_maps_to_500() {
        let err = AppError(LifecycleError::UnsupportedLifecycle("push".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn non_lifecycle_error_maps_to_500() {
        let err = AppError(anyhow::anyhow!("something unexpected"));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn response_body_is_json() {
        let err = AppError(LifecycleError::Delivery("down".into()).into());
        let response = err.into_response();
        let ct = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .expect("should have content-type");
        assert!(ct.to_str().unwrap().contains("application/json"));
    }
}

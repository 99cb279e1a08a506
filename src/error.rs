use thiserror::Error;

use crate::api::ApiError;
use crate::model::RequestError;
use crate::tracker::TrackError;

#[derive(Debug, Error)]
pub enum GenboardError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] RequestError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Track(#[from] TrackError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T, E = GenboardError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_keep_their_message() {
        let err: GenboardError = ApiError::Status {
            status: 422,
            message: "grade_level: field required".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "API error (status 422): grade_level: field required"
        );
    }

    #[test]
    fn invalid_request_is_prefixed() {
        let err: GenboardError = RequestError::GradeOutOfRange(14).into();
        assert_eq!(err.to_string(), "Invalid request: grade level 14 is outside 1-12");
    }
}

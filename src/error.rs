use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not signed in")]
    Unauthenticated,

    #[error("login failed")]
    BadCredentials,

    #[error("that name is already taken")]
    DuplicateName,

    #[error("this room only holds two accounts")]
    CapacityExceeded,

    #[error("file type not allowed")]
    InvalidMediaType,

    #[error("a message needs text or a file")]
    EmptyMessage,

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::FORBIDDEN,
            AppError::BadCredentials => StatusCode::UNAUTHORIZED,
            AppError::DuplicateName | AppError::CapacityExceeded => StatusCode::CONFLICT,
            AppError::InvalidMediaType | AppError::EmptyMessage => StatusCode::BAD_REQUEST,
            AppError::Storage(_)
            | AppError::Io(_)
            | AppError::Session(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            (status, "something went wrong on our end".to_owned()).into_response()
        } else {
            (status, self.to_string()).into_response()
        }
    }
}

impl From<axum::Error> for AppError {
    fn from(err: axum::Error) -> Self {
        Self::Other(anyhow::Error::from(err))
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        Self::Other(anyhow::Error::from(err))
    }
}

use std::error::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum CoderoomErrorType {
    NotFound,
    AlreadyExists,
    InvalidPath,
    IOError,
    InternalError,
}

impl Into<warp::http::StatusCode> for CoderoomErrorType {
    fn into(self) -> warp::http::StatusCode {
        match self {
            CoderoomErrorType::NotFound => warp::http::StatusCode::NOT_FOUND,
            CoderoomErrorType::AlreadyExists => warp::http::StatusCode::CONFLICT,
            CoderoomErrorType::InvalidPath => warp::http::StatusCode::BAD_REQUEST,
            _ => warp::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug)]
pub(crate) struct CoderoomError {
    pub(crate) error_type: CoderoomErrorType,
    pub(crate) message: String,
}

impl warp::Reply for CoderoomError {
    fn into_response(self) -> warp::reply::Response {
        warp::reply::with_status(warp::reply::json(&self.message), self.error_type.into())
            .into_response()
    }
}

impl CoderoomError {
    pub(crate) fn new(error_type: CoderoomErrorType, message: String) -> Self {
        Self {
            error_type,
            message,
        }
    }
}

impl std::fmt::Display for CoderoomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.error_type, self.message)
    }
}

impl From<std::io::Error> for CoderoomError {
    fn from(error: std::io::Error) -> Self {
        Self {
            error_type: CoderoomErrorType::IOError,
            message: error.to_string(),
        }
    }
}

impl From<sled::Error> for CoderoomError {
    fn from(error: sled::Error) -> Self {
        Self {
            error_type: CoderoomErrorType::IOError,
            message: error.to_string(),
        }
    }
}

impl From<regex::Error> for CoderoomError {
    fn from(error: regex::Error) -> Self {
        Self {
            error_type: CoderoomErrorType::InvalidPath,
            message: error.to_string(),
        }
    }
}

impl Error for CoderoomError {}

pub(crate) type Result<T> = std::result::Result<T, CoderoomError>;

use std::io::Cursor;

use rocket::{
    http::{ContentType, Status},
    response::{self, Responder},
    Request, Response,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure taxonomy of the review pipeline, mapped onto the HTTP surface:
/// validation 400, unknown id 404, state precondition 409, unauthorized
/// caller 403. Unexpected failures fall through to the 500 catcher.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("contribution {0} not found")]
    NotFound(u64),
    #[error("{0}")]
    Conflict(String),
    #[error("administrator token missing or invalid")]
    Unauthorized,
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::Validation(_) => Status::BadRequest,
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::Conflict(_) => Status::Conflict,
            ApiError::Unauthorized => Status::Forbidden,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Unauthorized => "unauthorized",
        }
    }
}

/// Structured body returned for every failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _req: &'r Request<'_>) -> response::Result<'static> {
        let body = ErrorBody::new(self.kind(), self.to_string());
        let body = serde_json::to_string(&body).map_err(|_| Status::InternalServerError)?;
        Response::build()
            .status(self.status())
            .header(ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}

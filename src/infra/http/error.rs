use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use metrics::counter;
use serde::Serialize;

use crate::application::accounts::AccountError;
use crate::application::blog::BlogError;
use crate::application::catalog::CatalogError;
use crate::application::error::ErrorReport;
use crate::application::repos::RepoError;
use crate::application::sessions::SessionError;
use crate::domain::error::DomainError;
use crate::domain::policy::AccessDenied;
use crate::domain::validation::ValidationErrors;

pub const ACCESS_DENIED_TOTAL: &str = "skystore_access_denied_total";

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const FORBIDDEN: &str = "forbidden";
    pub const NOT_FOUND: &str = "not_found";
    pub const VALIDATION: &str = "validation_failed";
    pub const DUPLICATE: &str = "duplicate";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const INTEGRITY: &str = "integrity_error";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const REPO: &str = "repo_error";
    pub const INVALID_CREDENTIALS: &str = "invalid_credentials";
    pub const INACTIVE: &str = "inactive_account";
    pub const INTERNAL: &str = "internal_error";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<ValidationErrors>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    hint: Option<String>,
    fields: Option<ValidationErrors>,
    source: &'static str,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            hint: None,
            fields: None,
            source: "infra::http",
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_source(mut self, source: &'static str) -> Self {
        self.source = source;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            codes::UNAUTHORIZED,
            "Authentication required",
        )
    }

    pub fn forbidden() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            codes::FORBIDDEN,
            "You do not have permission to perform this action",
        )
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message)
    }

    pub fn validation(errors: ValidationErrors) -> Self {
        let mut error = Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            codes::VALIDATION,
            "Submitted data is invalid",
        );
        error.fields = Some(errors);
        error
    }

    pub fn internal(hint: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::INTERNAL,
            "Internal server error",
        )
        .with_hint(hint)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = match (&self.hint, &self.fields) {
            (Some(hint), _) => format!("{}: {hint}", self.code),
            (None, Some(fields)) => format!("{}: {fields}", self.code),
            (None, None) => format!("{}: {}", self.code, self.message),
        };
        // 5xx hints carry internal detail and stay in the log only.
        let hint = if self.status.is_server_error() {
            None
        } else {
            self.hint
        };
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message,
                hint,
                fields: self.fields,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message(self.source, self.status, detail).attach(&mut response);
        response
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { entity } => {
                ApiError::not_found(format!("{entity} not found")).with_source("domain")
            }
            DomainError::Validation(errors) => ApiError::validation(errors).with_source("domain"),
        }
    }
}

impl From<AccessDenied> for ApiError {
    fn from(denied: AccessDenied) -> Self {
        counter!(ACCESS_DENIED_TOTAL, "gate" => denied.gate.name()).increment(1);
        let error = if denied.requires_login() {
            ApiError::unauthorized()
        } else {
            ApiError::forbidden()
        };
        error
            .with_hint(format!("gate: {}", denied.gate.name()))
            .with_source("domain::policy")
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        let error = match err {
            RepoError::Duplicate { constraint } => {
                ApiError::new(StatusCode::CONFLICT, codes::DUPLICATE, "Duplicate record")
                    .with_hint(constraint)
            }
            RepoError::NotFound => ApiError::not_found("Resource not found"),
            RepoError::InvalidInput { message } => {
                ApiError::new(StatusCode::BAD_REQUEST, codes::INVALID_INPUT, "Invalid input")
                    .with_hint(message)
            }
            RepoError::Integrity { message } => ApiError::new(
                StatusCode::CONFLICT,
                codes::INTEGRITY,
                "Integrity constraint violated",
            )
            .with_hint(message),
            RepoError::Timeout => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::DB_TIMEOUT,
                "Database timeout",
            ),
            RepoError::Persistence(message) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::REPO,
                "Persistence error",
            )
            .with_hint(message),
        };
        error.with_source("application::repos")
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Repo(err) => err.into(),
            SessionError::Invalid | SessionError::Expired => ApiError::unauthorized()
                .with_hint(err.to_string())
                .with_source("application::sessions"),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Domain(err) => err.into(),
            CatalogError::Access(denied) => denied.into(),
            CatalogError::Repo(err) => err.into(),
        }
    }
}

impl From<BlogError> for ApiError {
    fn from(err: BlogError) -> Self {
        match err {
            BlogError::Domain(err) => err.into(),
            BlogError::Access(denied) => denied.into(),
            BlogError::Repo(err) => err.into(),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Domain(err) => err.into(),
            AccountError::Access(denied) => denied.into(),
            AccountError::Repo(err) => err.into(),
            AccountError::Session(err) => err.into(),
            AccountError::InvalidCredentials => ApiError::new(
                StatusCode::UNAUTHORIZED,
                codes::INVALID_CREDENTIALS,
                "Invalid email or password.",
            )
            .with_source("application::accounts"),
            AccountError::Inactive => ApiError::new(
                StatusCode::FORBIDDEN,
                codes::INACTIVE,
                "This account is inactive.",
            )
            .with_source("application::accounts"),
            AccountError::Hashing(message) => {
                ApiError::internal(message).with_source("application::accounts")
            }
        }
    }
}

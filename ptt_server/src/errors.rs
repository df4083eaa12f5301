use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use ptt_engine::{lifecycle::LifecycleError, AccountApiError, ApprovalApiError, AuthApiError, PttFlowError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("No API key was provided in the ptt_api_key header")]
    MissingApiKey,
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Invalid request. {0}")]
    InvalidRequest(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("Could not serialize access token. {0}")]
    CouldNotSerializeAccessToken(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("The request conflicts with the current state. {0}")]
    Conflict(String),
    #[error("The request cannot be carried out. {0}")]
    Unprocessable(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::MissingApiKey => StatusCode::UNAUTHORIZED,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::InvalidApiKey => StatusCode::UNAUTHORIZED,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken(_) => StatusCode::BAD_REQUEST,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::CouldNotSerializeAccessToken(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No access token was found in the request. Authenticate at /auth first.")]
    MissingToken,
    #[error("The API key is not recognised.")]
    InvalidApiKey,
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Access token is invalid. {0}")]
    ValidationError(String),
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
}

impl From<PttFlowError> for ServerError {
    fn from(e: PttFlowError) -> Self {
        match e {
            PttFlowError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            PttFlowError::AccountError(e) => e.into(),
            PttFlowError::Lifecycle(ref l) => match l {
                LifecycleError::IllegalTransition { .. } => Self::Conflict(e.to_string()),
                LifecycleError::CreditLimitExceeded { .. } | LifecycleError::InsufficientTreasury { .. } => {
                    Self::Unprocessable(e.to_string())
                },
                LifecycleError::WrongCounterparty { .. } => Self::InvalidRequest(e.to_string()),
                LifecycleError::Unbalanced(_) => Self::BackendError(e.to_string()),
            },
            PttFlowError::PttNotFound(_) |
            PttFlowError::OrganizationNotFound(_) |
            PttFlowError::DocumentNotFound(_) |
            PttFlowError::OfferNotFound(_) => Self::NoRecordFound(e.to_string()),
            PttFlowError::DocumentAlreadyReviewed(_) |
            PttFlowError::OfferNotOpen(_) |
            PttFlowError::UnexpectedStatus { .. } |
            PttFlowError::ConcurrentModification(_) => Self::Conflict(e.to_string()),
            PttFlowError::InvalidRequest(s) => Self::InvalidRequest(s),
            PttFlowError::Forbidden(s) => Self::InsufficientPermissions(s),
        }
    }
}

impl From<AccountApiError> for ServerError {
    fn from(e: AccountApiError) -> Self {
        match e {
            AccountApiError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            AccountApiError::QueryError(s) => Self::InvalidRequest(s),
        }
    }
}

impl From<AuthApiError> for ServerError {
    fn from(e: AuthApiError) -> Self {
        match e {
            AuthApiError::InvalidApiKey => Self::AuthenticationError(AuthError::InvalidApiKey),
            AuthApiError::RoleNotAllowed(_) => {
                Self::AuthenticationError(AuthError::InsufficientPermissions(e.to_string()))
            },
            AuthApiError::UserNotFound(_) | AuthApiError::OrganizationNotFound(_) => Self::NoRecordFound(e.to_string()),
            AuthApiError::UserAlreadyExists => Self::Conflict(e.to_string()),
            AuthApiError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            AuthApiError::RoleNotFound => {
                Self::BackendError(format!("Role definitions in Database and Code have diverged. {e}"))
            },
        }
    }
}

impl From<ApprovalApiError> for ServerError {
    fn from(e: ApprovalApiError) -> Self {
        match e {
            ApprovalApiError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            ApprovalApiError::ActionNotFound(_) => Self::NoRecordFound(e.to_string()),
            ApprovalApiError::AlreadyDecided(_) => Self::Conflict(e.to_string()),
            ApprovalApiError::NotPermitted(s) => Self::InsufficientPermissions(s),
            ApprovalApiError::MissingReason => Self::InvalidRequest(e.to_string()),
            ApprovalApiError::InvalidAction(e) => e.into(),
            ApprovalApiError::ExecutionFailed(_) => Self::Conflict(e.to_string()),
        }
    }
}

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read configuration: {0}")]
    ConfigurationError(#[from] config::ConfigError),
    #[error(transparent)]
    ApiError(#[from] ApiError),
    #[error(transparent)]
    SessionError(#[from] SessionError),
    #[error(transparent)]
    StoreError(#[from] StoreError),
    #[error(transparent)]
    AuthError(#[from] AuthError),
}

impl Error {
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Error::ApiError(err) => err.user_message(fallback),
            Error::StoreError(err) => err.user_message(fallback),
            Error::AuthError(err) => err.user_message(fallback),
            other => other.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[source] BoxError),
    #[error("remote service returned {status_code}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Remote {
        status_code: u16,
        message: Option<String>,
    },
    #[error("unexpected response body: {0}")]
    InvalidResponse(#[source] BoxError),
    #[error("failed to build request url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::InvalidResponse(Box::new(err))
        } else {
            ApiError::Network(Box::new(err))
        }
    }
}

impl ApiError {
    /// Message shown to the user: the service's own error text when it sent one.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Remote {
                message: Some(message),
                ..
            } if !message.is_empty() => message.to_owned(),
            _ => fallback.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid product: {0}")]
    Validation(#[from] validator::ValidationErrors),
    #[error("target price is not a number: {0}")]
    InvalidPrice(#[from] rust_decimal::Error),
    #[error("you have reached the maximum limit of {limit} products")]
    CapacityExceeded { limit: usize },
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl StoreError {
    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation(_) | StoreError::InvalidPrice(_))
    }

    pub fn is_network(&self) -> bool {
        matches!(self, StoreError::Api(ApiError::Network(_)))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, StoreError::Api(ApiError::Remote { .. }))
    }

    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            StoreError::Api(err) => err.user_message(fallback),
            other => other.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("invalid credentials: {0}")]
    Validation(#[from] validator::ValidationErrors),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("not signed in, run `price-tracker login` first")]
    NotSignedIn,
}

impl AuthError {
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            AuthError::Api(err) => err.user_message(fallback),
            other => other.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("failed to read with serde: {0}")]
    SerdeError(#[from] serde_json::error::Error),
    #[error("session storage lock poisoned")]
    Poisoned,
}

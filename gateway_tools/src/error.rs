use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Could not obtain an access token: {0}")]
    Authentication(String),
    #[error("Invalid REST request: {0}")]
    RestRequestError(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("The provider did not respond in time")]
    Timeout,
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("The provider declined the request: {0}")]
    Declined(String),
    #[error("Invalid currency amount: {0}")]
    InvalidCurrencyAmount(String),
}

impl GatewayApiError {
    /// Classifies a transport error from `reqwest`, keeping timeouts distinct.
    pub fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::RestResponseError(e.to_string())
        }
    }

    /// True when the provider answered and said no, as opposed to the call not getting through.
    pub fn is_rejection(&self) -> bool {
        match self {
            Self::Declined(_) => true,
            Self::QueryError { status, .. } => (400..500).contains(status) && *status != 401 && *status != 408,
            _ => false,
        }
    }
}

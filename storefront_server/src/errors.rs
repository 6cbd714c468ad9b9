use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use serde_json::json;
use storefront_engine::{
    gateways::{InitiationFailed, RedirectPaymentError},
    traits::{CartError, DeliveryError, ExchangeRateError, GatewayFailure, InventoryError},
    CommitRejection,
    OrderFlowError,
    OrderQueryError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("Invalid request. {0}")]
    ValidationError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("No user or session identity was supplied")]
    MissingIdentity,
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Insufficient stock for variant {variant_id}. {requested} requested, {available} available")]
    InsufficientStock { variant_id: i64, requested: i64, available: i64 },
    #[error("The request conflicts with the current state. {0}")]
    Conflict(String),
    #[error("Payment provider error. {0}")]
    GatewayError(String),
    #[error("The payment provider did not respond in time")]
    GatewayTimeout,
    #[error("Payments in this currency are temporarily unavailable. {0}")]
    RateUnavailable(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::MissingIdentity => StatusCode::UNAUTHORIZED,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::InsufficientStock { .. } => StatusCode::CONFLICT,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::GatewayError(_) => StatusCode::BAD_GATEWAY,
            Self::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::RateUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            Self::InsufficientStock { variant_id, requested, available } => json!({
                "error": self.to_string(),
                "variant_id": variant_id,
                "requested": requested,
                "available": available,
            }),
            _ => json!({ "error": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).insert_header(ContentType::json()).body(body.to_string())
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            OrderFlowError::Rejected(CommitRejection::InsufficientStock { variant_id, requested, available }) => {
                Self::InsufficientStock { variant_id, requested, available }
            },
            e @ OrderFlowError::Rejected(CommitRejection::CartChanged) => Self::Conflict(e.to_string()),
            OrderFlowError::Rejected(r) => Self::ValidationError(r.to_string()),
            OrderFlowError::OrderNotFound(n) => Self::NoRecordFound(format!("Order {n} does not exist")),
            e @ OrderFlowError::AlreadyTerminal { .. } => Self::Conflict(e.to_string()),
            e @ OrderFlowError::IllegalTransition { .. } => Self::Conflict(e.to_string()),
            e @ OrderFlowError::OrderNumberExhausted(_) => {
                error!("💻️ {e}");
                Self::BackendError(e.to_string())
            },
        }
    }
}

impl From<OrderQueryError> for ServerError {
    fn from(e: OrderQueryError) -> Self {
        match e {
            OrderQueryError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            OrderQueryError::OrderNotFound(n) => Self::NoRecordFound(format!("Order {n} does not exist")),
        }
    }
}

impl From<CartError> for ServerError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            CartError::InsufficientStock { variant_id, requested, available } => {
                Self::InsufficientStock { variant_id, requested, available }
            },
            e @ CartError::InvalidQuantity(_) => Self::ValidationError(e.to_string()),
            e @ (CartError::VariantNotFound(_) | CartError::ItemNotFound(_)) => Self::NoRecordFound(e.to_string()),
        }
    }
}

impl From<InventoryError> for ServerError {
    fn from(e: InventoryError) -> Self {
        match e {
            InventoryError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            InventoryError::InsufficientStock { variant_id, requested, available } => {
                Self::InsufficientStock { variant_id, requested, available }
            },
            e @ InventoryError::UnknownVariant(_) => Self::NoRecordFound(e.to_string()),
            e @ InventoryError::DuplicateSku(_) => Self::Conflict(e.to_string()),
            e @ InventoryError::InvalidQuantity(_) => Self::ValidationError(e.to_string()),
        }
    }
}

impl From<DeliveryError> for ServerError {
    fn from(e: DeliveryError) -> Self {
        match e {
            DeliveryError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            e => Self::ValidationError(e.to_string()),
        }
    }
}

impl From<ExchangeRateError> for ServerError {
    fn from(e: ExchangeRateError) -> Self {
        match e {
            ExchangeRateError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            e @ ExchangeRateError::RateDoesNotExist(_) => Self::NoRecordFound(e.to_string()),
            e @ ExchangeRateError::InvalidRate(_) => Self::ValidationError(e.to_string()),
            e @ ExchangeRateError::RateIsStale(_) => Self::RateUnavailable(e.to_string()),
        }
    }
}

impl From<GatewayFailure> for ServerError {
    fn from(e: GatewayFailure) -> Self {
        match e {
            GatewayFailure::Timeout => Self::GatewayTimeout,
            e => Self::GatewayError(e.to_string()),
        }
    }
}

impl From<InitiationFailed> for ServerError {
    fn from(e: InitiationFailed) -> Self {
        match e {
            e @ InitiationFailed::InvalidParameters(_) => Self::ValidationError(e.to_string()),
            e @ (InitiationFailed::OrderNotPayable { .. } | InitiationFailed::PaymentInProgress(_)) => {
                Self::Conflict(e.to_string())
            },
            InitiationFailed::RateUnavailable(s) => Self::RateUnavailable(s),
            InitiationFailed::Gateway(g) => g.into(),
            InitiationFailed::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
        }
    }
}

impl From<RedirectPaymentError> for ServerError {
    fn from(e: RedirectPaymentError) -> Self {
        match e {
            e @ RedirectPaymentError::PaymentNotFound(_) => Self::NoRecordFound(e.to_string()),
            e @ RedirectPaymentError::PaymentMismatch { .. } => Self::ValidationError(e.to_string()),
            e @ RedirectPaymentError::VerificationFailed(_) => Self::GatewayError(e.to_string()),
            RedirectPaymentError::Gateway(g) => g.into(),
            e @ RedirectPaymentError::NothingToCancel(_) => Self::Conflict(e.to_string()),
            RedirectPaymentError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
        }
    }
}

#[cfg(test)]
mod test {
    use storefront_engine::db_types::{OrderNumber, OrderStatusType};

    use super::*;

    #[test]
    fn taxonomy_maps_to_status_codes() {
        let e: ServerError = OrderFlowError::Rejected(CommitRejection::EmptyCart).into();
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
        let e: ServerError =
            OrderFlowError::Rejected(CommitRejection::InsufficientStock { variant_id: 3, requested: 2, available: 1 })
                .into();
        assert_eq!(e.status_code(), StatusCode::CONFLICT);
        let e: ServerError = OrderFlowError::Rejected(CommitRejection::CartChanged).into();
        assert_eq!(e.status_code(), StatusCode::CONFLICT);
        let e: ServerError = OrderFlowError::AlreadyTerminal {
            order_number: OrderNumber::from("ORD-1"),
            status: OrderStatusType::Cancelled,
        }
        .into();
        assert_eq!(e.status_code(), StatusCode::CONFLICT);
        let e: ServerError = OrderQueryError::OrderNotFound(OrderNumber::from("ORD-1")).into();
        assert_eq!(e.status_code(), StatusCode::NOT_FOUND);
        let e: ServerError = InitiationFailed::Gateway(GatewayFailure::Timeout).into();
        assert_eq!(e.status_code(), StatusCode::GATEWAY_TIMEOUT);
        let e: ServerError = InitiationFailed::Gateway(GatewayFailure::Rejected("no".into())).into();
        assert_eq!(e.status_code(), StatusCode::BAD_GATEWAY);
        let e: ServerError = InitiationFailed::RateUnavailable("USD/KES".into()).into();
        assert_eq!(e.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ServerError::MissingIdentity.status_code(), StatusCode::UNAUTHORIZED);
    }
}

//! Error types for the rental billing engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable error code surfaced to the API layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input failed validation
    ValidationError,
    /// Plan quota reached for an entity type
    PlanLimitExceeded,
    /// Plan does not exist
    PlanNotFound,
    /// Merchant does not exist
    MerchantNotFound,
    /// Subscription does not exist
    SubscriptionNotFound,
    /// Subscription period ended
    SubscriptionExpired,
    /// Subscription was cancelled
    SubscriptionCancelled,
    /// Subscription is paused
    SubscriptionPaused,
    /// Payment is overdue
    SubscriptionPastDue,
    /// Trial ended without conversion
    TrialExpired,
    /// Grace window after expiry has elapsed
    GracePeriodExceeded,
    /// Status change not permitted by the lifecycle
    InvalidStatusTransition,
    /// Operation not permitted for the current status
    OperationNotAllowed,
    /// Billing configuration is invalid
    ConfigError,
    /// Unexpected failure
    InternalError,
}

impl ErrorCode {
    /// HTTP status the API layer should answer with
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ValidationError | Self::InvalidStatusTransition => 400,
            Self::SubscriptionExpired
            | Self::SubscriptionPastDue
            | Self::TrialExpired
            | Self::GracePeriodExceeded => 402,
            Self::PlanLimitExceeded
            | Self::SubscriptionCancelled
            | Self::SubscriptionPaused
            | Self::OperationNotAllowed => 403,
            Self::PlanNotFound | Self::MerchantNotFound | Self::SubscriptionNotFound => 404,
            Self::ConfigError | Self::InternalError => 500,
        }
    }

    /// Translation key for the client-side message table
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::ValidationError => "errors.validationError",
            Self::PlanLimitExceeded => "errors.planLimitExceeded",
            Self::PlanNotFound => "errors.planNotFound",
            Self::MerchantNotFound => "errors.merchantNotFound",
            Self::SubscriptionNotFound => "errors.subscriptionNotFound",
            Self::SubscriptionExpired => "errors.subscriptionExpired",
            Self::SubscriptionCancelled => "errors.subscriptionCancelled",
            Self::SubscriptionPaused => "errors.subscriptionPaused",
            Self::SubscriptionPastDue => "errors.subscriptionPastDue",
            Self::TrialExpired => "errors.trialExpired",
            Self::GracePeriodExceeded => "errors.gracePeriodExceeded",
            Self::InvalidStatusTransition => "errors.invalidStatusTransition",
            Self::OperationNotAllowed => "errors.operationNotAllowed",
            Self::ConfigError => "errors.configError",
            Self::InternalError => "errors.internalError",
        }
    }
}

/// Rental billing error type
#[derive(Error, Debug)]
pub enum RentalError {
    /// Invalid input
    #[error("validation error: {0}")]
    Validation(String),

    /// Plan quota reached
    #[error("plan limit exceeded for {entity}: {current} of {limit} used")]
    PlanLimitExceeded {
        /// Entity type name
        entity: String,
        /// Entities currently stored
        current: u64,
        /// Finite limit of the plan
        limit: u64,
    },

    /// Lifecycle forbids the status change
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// Status forbids the operation
    #[error("operation {operation} not allowed while subscription is {status}")]
    OperationNotAllowed {
        /// Operation name
        operation: String,
        /// Current status
        status: String,
    },

    /// Subscription state rejects access
    #[error("{message}")]
    Subscription {
        /// Classified error code
        code: ErrorCode,
        /// Human readable detail
        message: String,
    },

    /// Missing record
    #[error("not found: {id}")]
    NotFound {
        /// Which kind of record is missing
        code: ErrorCode,
        /// Identifier that was looked up
        id: String,
    },

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Persistence layer failure
    #[error("repository error: {0}")]
    Repository(String),
}

impl RentalError {
    /// Error code for the API envelope
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::ValidationError,
            Self::PlanLimitExceeded { .. } => ErrorCode::PlanLimitExceeded,
            Self::InvalidTransition { .. } => ErrorCode::InvalidStatusTransition,
            Self::OperationNotAllowed { .. } => ErrorCode::OperationNotAllowed,
            Self::Subscription { code, .. } => *code,
            Self::NotFound { code, .. } => *code,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Repository(_) => ErrorCode::InternalError,
        }
    }

    /// Shorthand for a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Result type for the rental billing engine
pub type RentalResult<T> = Result<T, RentalError>;

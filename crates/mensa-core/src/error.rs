//! Error types and result handling for marketplace operations.
//!
//! Defines a structured error taxonomy with stable codes for client
//! disambiguation. Covers request validation, capacity rejection,
//! downstream collaborator failures, and event processing errors.

use thiserror::Error;

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Marketplace error taxonomy with stable codes.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // Request errors (M1001-M1003)
    /// Malformed request shape (M1001).
    #[error("[M1001] invalid request: {message}")]
    Validation {
        /// Description of the validation failure
        message: String,
    },

    /// Action tag outside the recognized set (M1002).
    #[error("[M1002] unsupported action: {action}")]
    UnsupportedAction {
        /// The unrecognized action wire name
        action: String,
    },

    /// In-flight request ceiling reached (M1003).
    #[error("[M1003] capacity exceeded: {current} of {ceiling} requests in flight")]
    CapacityExceeded {
        /// In-flight count observed at rejection time
        current: usize,
        /// Configured ceiling
        ceiling: usize,
    },

    // Downstream errors (M2001-M2002)
    /// A collaborator service call failed (M2001).
    #[error("[M2001] {collaborator} call failed: {message}")]
    Downstream {
        /// Name of the collaborator that failed
        collaborator: String,
        /// Error message propagated from the collaborator
        message: String,
    },

    /// Integration event handler failure (M2002).
    ///
    /// Isolated per event and retried with backoff; never propagated to
    /// the originating request.
    #[error("[M2002] event processing failed: {message}")]
    EventProcessing {
        /// Description of the handler failure
        message: String,
    },

    // System errors (M3001-M3002)
    /// Bounded event queue at capacity (M3001).
    #[error("[M3001] event queue full for {source_component}/{priority}")]
    QueueFull {
        /// Source component of the rejected event
        source_component: String,
        /// Priority lane of the rejected event
        priority: String,
    },

    /// Invalid configuration values (M3002).
    #[error("[M3002] invalid configuration: {message}")]
    Configuration {
        /// Description of the configuration problem
        message: String,
    },
}

impl CoreError {
    /// Creates a validation error from a message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    /// Creates an unsupported-action error.
    pub fn unsupported_action(action: impl Into<String>) -> Self {
        Self::UnsupportedAction { action: action.into() }
    }

    /// Creates a capacity error from the observed counter state.
    pub fn capacity(current: usize, ceiling: usize) -> Self {
        Self::CapacityExceeded { current, ceiling }
    }

    /// Creates a downstream collaborator error.
    pub fn downstream(collaborator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Downstream { collaborator: collaborator.into(), message: message.into() }
    }

    /// Creates an event processing error.
    pub fn event_processing(message: impl Into<String>) -> Self {
        Self::EventProcessing { message: message.into() }
    }

    /// Creates a queue-full error for a source/priority lane.
    pub fn queue_full(source: impl Into<String>, priority: impl Into<String>) -> Self {
        Self::QueueFull { source_component: source.into(), priority: priority.into() }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Returns the stable error code (M1001-M3002).
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "M1001",
            Self::UnsupportedAction { .. } => "M1002",
            Self::CapacityExceeded { .. } => "M1003",
            Self::Downstream { .. } => "M2001",
            Self::EventProcessing { .. } => "M2002",
            Self::QueueFull { .. } => "M3001",
            Self::Configuration { .. } => "M3002",
        }
    }

    /// Returns whether the failed operation may succeed on a later attempt.
    ///
    /// Request-shape and configuration errors are permanent; downstream
    /// and queue-pressure failures are transient.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Downstream { .. } | Self::EventProcessing { .. } | Self::QueueFull { .. }
        )
    }
}

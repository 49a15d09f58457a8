//! Error types for the tempo pipeline.
//!
//! Errors carry an [`ErrorContext`] describing where in the pipeline they were
//! raised. Only invalid configuration and undecodable input are errors; data
//! conditions that should not abort a batch are reported as
//! [`DataQualityIssue`] records instead and travel with the game report.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for pipeline operations
pub type TempoResult<T> = Result<T, TempoError>;

/// Structured context for pipeline errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorContext {
    /// The operation being performed (e.g., "smooth", "detect_change_points")
    pub operation: Option<String>,
    /// Additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with an operation name.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    /// Set additional details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref op) = self.operation {
            parts.push(format!("operation={}", op));
        }
        if let Some(ref details) = self.details {
            parts.push(format!("details={}", details));
        }
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Error type for pipeline operations
#[derive(Debug, thiserror::Error)]
pub enum TempoError {
    /// Invalid caller-supplied parameters (bandwidth, threshold, allowance...).
    #[error("Configuration error: {message} {context}")]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    /// Input could not be decoded.
    #[error("Parse error: {message} {context}")]
    Parse {
        message: String,
        context: ErrorContext,
    },
}

impl TempoError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a configuration error with context.
    pub fn configuration_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Configuration {
            message: message.into(),
            context,
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Whether this error comes from invalid caller-supplied parameters rather
    /// than undecodable input.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Get the error context.
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Configuration { context, .. } => context,
            Self::Parse { context, .. } => context,
        }
    }

    /// Add or update the operation in the error context.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        match &mut self {
            Self::Configuration { context, .. }
            | Self::Parse { context, .. } => {
                context.operation = Some(operation.into());
            }
        }
        self
    }
}

/// Category of a non-fatal data-quality finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MalformedClock,
    MalformedPeriod,
    MalformedScore,
    UnrecognizedEvent,
    NegativeTfs,
    ClockOutOfOrder,
    UnattributedShot,
}

/// A data-quality finding reported alongside the results.
///
/// The offending possession (if any) stays in the possession table but is
/// excluded from aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityIssue {
    pub kind: IssueKind,
    pub period: Option<u32>,
    pub possession_index: Option<usize>,
    pub event_index: Option<usize>,
    pub message: String,
}

impl DataQualityIssue {
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            period: None,
            possession_index: None,
            event_index: None,
            message: message.into(),
        }
    }

    pub fn at_period(mut self, period: u32) -> Self {
        self.period = Some(period);
        self
    }

    pub fn at_possession(mut self, index: usize) -> Self {
        self.possession_index = Some(index);
        self
    }

    pub fn at_event(mut self, index: usize) -> Self {
        self.event_index = Some(index);
        self
    }
}

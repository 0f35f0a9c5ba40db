use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::DisplayState;

/// Result type alias using MarqueeError
pub type Result<T> = std::result::Result<T, MarqueeError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Stable classification shared by every crate in the workspace. Each kind
/// maps to a stable `ERR_*` code that outer layers (HTTP, CLI) translate
/// into their own status vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExErrorKind {
    // Lookup / uniqueness
    NotFound,
    AlreadyExists,
    PriorityCollision,

    // Concurrency
    VersionConflict,

    // Validation
    InvalidInput,
    InvalidTransition,
    NotServable,

    // Activation flow
    Expired,
    AlreadyActive,

    // Caller-driven termination
    Cancelled,
    Timeout,

    // Integration
    Persistence,
    Serialization,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::PriorityCollision => "ERR_PRIORITY_COLLISION",
            ExErrorKind::VersionConflict => "ERR_VERSION_CONFLICT",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidTransition => "ERR_INVALID_TRANSITION",
            ExErrorKind::NotServable => "ERR_NOT_SERVABLE",
            ExErrorKind::Expired => "ERR_EXPIRED",
            ExErrorKind::AlreadyActive => "ERR_ALREADY_ACTIVE",
            ExErrorKind::Cancelled => "ERR_CANCELLED",
            ExErrorKind::Timeout => "ERR_TIMEOUT",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Whether a caller should re-read current state and try again
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExErrorKind::VersionConflict)
    }
}

/// Canonical structured error type
///
/// Flattened view of a `MarqueeError` with classification fields for
/// programmatic handling. Correlation ids travel on `OpContext` and are
/// logged next to it.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    message: String,
}

impl ExError {
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            message: String::new(),
        }
    }

    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Domain error taxonomy for Marquee operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarqueeError {
    // ===== Displays =====
    #[error("Display not found: {display_id}")]
    DisplayNotFound { display_id: String },

    #[error("Display name already taken: {name}")]
    DisplayNameTaken { name: String },

    /// Id collision on insert (display id or device code id)
    #[error("Entity already exists: {entity_id}")]
    AlreadyExists { entity_id: String },

    /// The stored version moved since it was read; re-read and retry
    #[error("Version conflict on display {display_id}: expected version {expected_version}")]
    VersionConflict {
        display_id: String,
        expected_version: u64,
    },

    #[error("Invalid location: {reason}")]
    InvalidLocation { reason: String },

    #[error("Cannot {operation} display {display_id} in state {from}")]
    InvalidTransition {
        display_id: String,
        from: DisplayState,
        operation: String,
    },

    #[error("Display {display_id} is {state} and cannot be served content")]
    DisplayNotServable {
        display_id: String,
        state: DisplayState,
    },

    // ===== Activation =====
    #[error("Device code not found")]
    DeviceCodeNotFound,

    #[error("User code not found: {user_code}")]
    UserCodeNotFound { user_code: String },

    #[error("Code {code_id} expired at {expired_at}")]
    CodeExpired {
        code_id: String,
        expired_at: DateTime<Utc>,
    },

    #[error("Code {code_id} was already activated")]
    CodeAlreadyActive {
        code_id: String,
        display_id: Option<String>,
    },

    // ===== Redirect rules =====
    #[error("Redirect rule not found: {rule_name}")]
    RuleNotFound { rule_name: String },

    #[error("Redirect rule already exists: {rule_name}")]
    RuleAlreadyExists { rule_name: String },

    #[error("Priority {priority} is already used by rule {existing_rule}")]
    PriorityCollision { priority: i64, existing_rule: String },

    #[error("Invalid schedule on rule {rule_name}: {reason}")]
    InvalidSchedule { rule_name: String, reason: String },

    /// A rule's priority moved between planning and applying a reorder
    #[error("Rule {rule_name} changed while reordering")]
    StaleRuleSnapshot { rule_name: String },

    // ===== Generic validation =====
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // ===== Caller-driven termination =====
    #[error("Operation {op} was cancelled")]
    Cancelled { op: String },

    #[error("Operation {op} exceeded its deadline")]
    DeadlineExceeded { op: String },

    // ===== Integration =====
    /// Store failure; the underlying cause is preserved as text
    #[error("Persistence failure in {op}: {message}")]
    Persistence { op: String, message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl MarqueeError {
    /// Classify into the canonical kind taxonomy
    pub fn kind(&self) -> ExErrorKind {
        match self {
            MarqueeError::DisplayNotFound { .. }
            | MarqueeError::DeviceCodeNotFound
            | MarqueeError::UserCodeNotFound { .. }
            | MarqueeError::RuleNotFound { .. } => ExErrorKind::NotFound,
            MarqueeError::DisplayNameTaken { .. }
            | MarqueeError::AlreadyExists { .. }
            | MarqueeError::RuleAlreadyExists { .. } => ExErrorKind::AlreadyExists,
            MarqueeError::PriorityCollision { .. } => ExErrorKind::PriorityCollision,
            MarqueeError::VersionConflict { .. } | MarqueeError::StaleRuleSnapshot { .. } => {
                ExErrorKind::VersionConflict
            }
            MarqueeError::InvalidLocation { .. }
            | MarqueeError::InvalidSchedule { .. }
            | MarqueeError::InvalidInput { .. }
            | MarqueeError::InvalidConfig { .. } => ExErrorKind::InvalidInput,
            MarqueeError::InvalidTransition { .. } => ExErrorKind::InvalidTransition,
            MarqueeError::DisplayNotServable { .. } => ExErrorKind::NotServable,
            MarqueeError::CodeExpired { .. } => ExErrorKind::Expired,
            MarqueeError::CodeAlreadyActive { .. } => ExErrorKind::AlreadyActive,
            MarqueeError::Cancelled { .. } => ExErrorKind::Cancelled,
            MarqueeError::DeadlineExceeded { .. } => ExErrorKind::Timeout,
            MarqueeError::Persistence { .. } => ExErrorKind::Persistence,
            MarqueeError::Serialization { .. } => ExErrorKind::Serialization,
            MarqueeError::Internal { .. } => ExErrorKind::Internal,
        }
    }

    /// True for concurrent-modification failures the caller should retry
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    pub fn invalid_input(reason: impl Into<String>) -> Self {
        MarqueeError::InvalidInput {
            reason: reason.into(),
        }
    }

    fn entity_id(&self) -> Option<&str> {
        match self {
            MarqueeError::DisplayNotFound { display_id }
            | MarqueeError::VersionConflict { display_id, .. }
            | MarqueeError::InvalidTransition { display_id, .. }
            | MarqueeError::DisplayNotServable { display_id, .. } => Some(display_id),
            MarqueeError::DisplayNameTaken { name } => Some(name),
            MarqueeError::AlreadyExists { entity_id } => Some(entity_id),
            MarqueeError::CodeExpired { code_id, .. }
            | MarqueeError::CodeAlreadyActive { code_id, .. } => Some(code_id),
            MarqueeError::RuleNotFound { rule_name }
            | MarqueeError::RuleAlreadyExists { rule_name }
            | MarqueeError::InvalidSchedule { rule_name, .. }
            | MarqueeError::StaleRuleSnapshot { rule_name } => Some(rule_name),
            MarqueeError::PriorityCollision { existing_rule, .. } => Some(existing_rule),
            _ => None,
        }
    }

    fn op(&self) -> Option<&str> {
        match self {
            MarqueeError::Cancelled { op }
            | MarqueeError::DeadlineExceeded { op }
            | MarqueeError::Persistence { op, .. } => Some(op),
            _ => None,
        }
    }
}

impl From<&MarqueeError> for ExError {
    fn from(err: &MarqueeError) -> Self {
        let mut ex = ExError::new(err.kind()).with_message(err.to_string());
        if let Some(id) = err.entity_id() {
            ex = ex.with_entity_id(id);
        }
        if let Some(op) = err.op() {
            ex = ex.with_op(op);
        }
        ex
    }
}

impl From<MarqueeError> for ExError {
    fn from(err: MarqueeError) -> Self {
        ExError::from(&err)
    }
}

impl From<serde_json::Error> for MarqueeError {
    fn from(err: serde_json::Error) -> Self {
        MarqueeError::Serialization {
            message: err.to_string(),
        }
    }
}

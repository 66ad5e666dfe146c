//! IMM client error types
//!
//! Error definitions separating status codes returned by the IMM service from
//! misuse detected locally, with transient/permanent classification.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Status code kinds returned by the IMM service (`SaAisErrorT` minus `SA_AIS_OK`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AisErrorKind {
    Library,
    Version,
    Init,
    Timeout,
    TryAgain,
    InvalidParam,
    NoMemory,
    BadHandle,
    Busy,
    Access,
    NotExist,
    NameTooLong,
    Exist,
    NoSpace,
    Interrupt,
    NameNotFound,
    NoResources,
    NotSupported,
    BadOperation,
    FailedOperation,
    MessageError,
    QueueFull,
    QueueNotAvailable,
    BadFlags,
    TooBig,
    NoSections,
    NoOp,
    RepairPending,
    NoBindings,
    Unavailable,
}

impl AisErrorKind {
    /// Every kind, ordered by native code.
    pub const ALL: [AisErrorKind; 30] = [
        AisErrorKind::Library,
        AisErrorKind::Version,
        AisErrorKind::Init,
        AisErrorKind::Timeout,
        AisErrorKind::TryAgain,
        AisErrorKind::InvalidParam,
        AisErrorKind::NoMemory,
        AisErrorKind::BadHandle,
        AisErrorKind::Busy,
        AisErrorKind::Access,
        AisErrorKind::NotExist,
        AisErrorKind::NameTooLong,
        AisErrorKind::Exist,
        AisErrorKind::NoSpace,
        AisErrorKind::Interrupt,
        AisErrorKind::NameNotFound,
        AisErrorKind::NoResources,
        AisErrorKind::NotSupported,
        AisErrorKind::BadOperation,
        AisErrorKind::FailedOperation,
        AisErrorKind::MessageError,
        AisErrorKind::QueueFull,
        AisErrorKind::QueueNotAvailable,
        AisErrorKind::BadFlags,
        AisErrorKind::TooBig,
        AisErrorKind::NoSections,
        AisErrorKind::NoOp,
        AisErrorKind::RepairPending,
        AisErrorKind::NoBindings,
        AisErrorKind::Unavailable,
    ];

    /// Native `SaAisErrorT` value (`SA_AIS_ERR_LIBRARY` is 2).
    #[must_use]
    pub fn code(self) -> u32 {
        // ALL is ordered by code, starting right after SA_AIS_OK (1).
        Self::ALL
            .iter()
            .position(|k| *k == self)
            .map_or(0, |i| i as u32 + 2)
    }

    /// Map a native status code back to a kind.
    ///
    /// Returns `None` for `SA_AIS_OK` and for codes outside the known range.
    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        let index = code.checked_sub(2)? as usize;
        Self::ALL.get(index).copied()
    }

    /// Canonical `SA_AIS_ERR_*` name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AisErrorKind::Library => "SA_AIS_ERR_LIBRARY",
            AisErrorKind::Version => "SA_AIS_ERR_VERSION",
            AisErrorKind::Init => "SA_AIS_ERR_INIT",
            AisErrorKind::Timeout => "SA_AIS_ERR_TIMEOUT",
            AisErrorKind::TryAgain => "SA_AIS_ERR_TRY_AGAIN",
            AisErrorKind::InvalidParam => "SA_AIS_ERR_INVALID_PARAM",
            AisErrorKind::NoMemory => "SA_AIS_ERR_NO_MEMORY",
            AisErrorKind::BadHandle => "SA_AIS_ERR_BAD_HANDLE",
            AisErrorKind::Busy => "SA_AIS_ERR_BUSY",
            AisErrorKind::Access => "SA_AIS_ERR_ACCESS",
            AisErrorKind::NotExist => "SA_AIS_ERR_NOT_EXIST",
            AisErrorKind::NameTooLong => "SA_AIS_ERR_NAME_TOO_LONG",
            AisErrorKind::Exist => "SA_AIS_ERR_EXIST",
            AisErrorKind::NoSpace => "SA_AIS_ERR_NO_SPACE",
            AisErrorKind::Interrupt => "SA_AIS_ERR_INTERRUPT",
            AisErrorKind::NameNotFound => "SA_AIS_ERR_NAME_NOT_FOUND",
            AisErrorKind::NoResources => "SA_AIS_ERR_NO_RESOURCES",
            AisErrorKind::NotSupported => "SA_AIS_ERR_NOT_SUPPORTED",
            AisErrorKind::BadOperation => "SA_AIS_ERR_BAD_OPERATION",
            AisErrorKind::FailedOperation => "SA_AIS_ERR_FAILED_OPERATION",
            AisErrorKind::MessageError => "SA_AIS_ERR_MESSAGE_ERROR",
            AisErrorKind::QueueFull => "SA_AIS_ERR_QUEUE_FULL",
            AisErrorKind::QueueNotAvailable => "SA_AIS_ERR_QUEUE_NOT_AVAILABLE",
            AisErrorKind::BadFlags => "SA_AIS_ERR_BAD_FLAGS",
            AisErrorKind::TooBig => "SA_AIS_ERR_TOO_BIG",
            AisErrorKind::NoSections => "SA_AIS_ERR_NO_SECTIONS",
            AisErrorKind::NoOp => "SA_AIS_ERR_NO_OP",
            AisErrorKind::RepairPending => "SA_AIS_ERR_REPAIR_PENDING",
            AisErrorKind::NoBindings => "SA_AIS_ERR_NO_BINDINGS",
            AisErrorKind::Unavailable => "SA_AIS_ERR_UNAVAILABLE",
        }
    }

    /// Check if the service may accept the same request later.
    #[must_use]
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            AisErrorKind::Timeout
                | AisErrorKind::TryAgain
                | AisErrorKind::Busy
                | AisErrorKind::NoResources
                | AisErrorKind::Unavailable
                | AisErrorKind::QueueFull
                | AisErrorKind::Interrupt
        )
    }
}

impl fmt::Display for AisErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AisErrorKind {
    type Err = ImmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ImmError::InvalidArgument {
                message: format!("unknown AIS error name '{s}'"),
            })
    }
}

/// Error returned by IMM client operations.
#[derive(Debug, Error)]
pub enum ImmError {
    // Service status (propagated unchanged)
    /// The IMM service, or the session state machine, rejected the call.
    #[error("{kind}: {context}")]
    Ais {
        kind: AisErrorKind,
        context: String,
    },

    // Local validation
    /// A distinguished name could not be split into RDN and parent.
    #[error("invalid DN format: '{dn}'")]
    InvalidFormat { dn: String },

    /// An attribute flag symbol is not part of the flag table.
    #[error("unknown attribute flag '{symbol}'")]
    UnknownFlag { symbol: String },

    /// The class schema has no attribute flagged RDN.
    #[error("class '{class_name}' has no RDN attribute")]
    NoRdnAttribute { class_name: String },

    /// The caller supplied a system-managed or synthesized attribute.
    #[error("attribute '{attribute}' is reserved and cannot be supplied")]
    ReservedAttribute { attribute: String },

    /// A value does not match the declared attribute type.
    #[error("attribute '{attribute}' expects {expected} values")]
    TypeMismatch { attribute: String, expected: String },

    /// An argument (type name, scope name, etc.) is not recognised.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// An expected system attribute is missing from an object.
    #[error("object '{dn}' has no '{attribute}' attribute")]
    MissingAttribute { dn: String, attribute: String },

    // Export
    /// Writing the XML dump failed.
    #[error("export failed: {message}")]
    Export {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ImmError {
    /// Create a status error with the given kind.
    pub fn ais(kind: AisErrorKind, context: impl Into<String>) -> Self {
        ImmError::Ais {
            kind,
            context: context.into(),
        }
    }

    /// Create an export error with source.
    pub fn export_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ImmError::Export {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The AIS status kind, for errors that carry one.
    #[must_use]
    pub fn ais_kind(&self) -> Option<AisErrorKind> {
        match self {
            ImmError::Ais { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Check whether this error carries the given status kind.
    #[must_use]
    pub fn is(&self, kind: AisErrorKind) -> bool {
        self.ais_kind() == Some(kind)
    }

    /// Check if the error was detected locally, before any service call.
    #[must_use]
    pub fn is_local_validation(&self) -> bool {
        matches!(
            self,
            ImmError::InvalidFormat { .. }
                | ImmError::UnknownFlag { .. }
                | ImmError::NoRdnAttribute { .. }
                | ImmError::ReservedAttribute { .. }
                | ImmError::TypeMismatch { .. }
                | ImmError::InvalidArgument { .. }
        )
    }

    /// Check if this error is transient and the caller may retry.
    ///
    /// The client never retries on its own.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.ais_kind().is_some_and(AisErrorKind::is_transient)
    }

    /// Check if this error is permanent and retry won't help.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Get an error code for classification.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            ImmError::Ais { kind, .. } => kind.as_str(),
            ImmError::InvalidFormat { .. } => "INVALID_FORMAT",
            ImmError::UnknownFlag { .. } => "UNKNOWN_FLAG",
            ImmError::NoRdnAttribute { .. } => "NO_RDN_ATTRIBUTE",
            ImmError::ReservedAttribute { .. } => "RESERVED_ATTRIBUTE",
            ImmError::TypeMismatch { .. } => "TYPE_MISMATCH",
            ImmError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            ImmError::MissingAttribute { .. } => "MISSING_ATTRIBUTE",
            ImmError::Export { .. } => "EXPORT_FAILED",
        }
    }
}

/// Result type for IMM client operations.
pub type ImmResult<T> = Result<T, ImmError>;

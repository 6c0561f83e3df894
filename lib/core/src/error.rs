use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::types::DataType;

pub type Result<T> = std::result::Result<T, Error>;

/// Closed taxonomy of outcomes reported by every collection operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusCode {
    Ok,
    NotFound,
    AlreadyExists,
    InvalidArgument,
    PermissionDenied,
    FailedPrecondition,
    ResourceExhausted,
    Unavailable,
    InternalError,
    NotSupported,
    Unknown,
}

impl StatusCode {
    pub const ALL: [StatusCode; 11] = [
        StatusCode::Ok,
        StatusCode::NotFound,
        StatusCode::AlreadyExists,
        StatusCode::InvalidArgument,
        StatusCode::PermissionDenied,
        StatusCode::FailedPrecondition,
        StatusCode::ResourceExhausted,
        StatusCode::Unavailable,
        StatusCode::InternalError,
        StatusCode::NotSupported,
        StatusCode::Unknown,
    ];

    #[inline]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn from_i32(code: i32) -> Option<Self> {
        usize::try_from(code).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::NotFound => "NOT_FOUND",
            StatusCode::AlreadyExists => "ALREADY_EXISTS",
            StatusCode::InvalidArgument => "INVALID_ARGUMENT",
            StatusCode::PermissionDenied => "PERMISSION_DENIED",
            StatusCode::FailedPrecondition => "FAILED_PRECONDITION",
            StatusCode::ResourceExhausted => "RESOURCE_EXHAUSTED",
            StatusCode::Unavailable => "UNAVAILABLE",
            StatusCode::InternalError => "INTERNAL_ERROR",
            StatusCode::NotSupported => "NOT_SUPPORTED",
            StatusCode::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A result code plus message. Batch writes report one of these per item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    code: StatusCode,
    message: String,
}

impl Default for Status {
    fn default() -> Self {
        Self::ok()
    }
}

impl Status {
    #[inline]
    #[must_use]
    pub fn ok() -> Self {
        Self {
            code: StatusCode::Ok,
            message: String::new(),
        }
    }

    #[must_use]
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NotFound, message)
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(StatusCode::AlreadyExists, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(StatusCode::InvalidArgument, message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PermissionDenied, message)
    }

    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FailedPrecondition, message)
    }

    pub fn resource_exhausted(message: impl Into<String>) -> Self {
        Self::new(StatusCode::ResourceExhausted, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::InternalError, message)
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NotSupported, message)
    }

    #[inline]
    pub fn is_ok(&self) -> bool {
        self.code == StatusCode::Ok
    }

    #[inline]
    pub fn code(&self) -> StatusCode {
        self.code
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Converts a non-OK status into the matching [`Error`] variant.
    pub fn into_result(self) -> Result<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(Error::from(self))
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            f.write_str("OK")
        } else {
            write!(f, "Error({}): {}", self.code.as_i32(), self.message)
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Unknown error: {0}")]
    Unknown(String),

    /// A field was read back with a data type its stored value cannot be
    /// decoded as. Raised locally, never by the engine.
    #[error("cannot decode field `{field}` as {requested}: {reason}")]
    Decode {
        field: String,
        requested: DataType,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    pub fn code(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NotFound,
            Error::AlreadyExists(_) => StatusCode::AlreadyExists,
            Error::InvalidArgument(_) | Error::Decode { .. } => StatusCode::InvalidArgument,
            Error::PermissionDenied(_) => StatusCode::PermissionDenied,
            Error::FailedPrecondition(_) => StatusCode::FailedPrecondition,
            Error::ResourceExhausted(_) => StatusCode::ResourceExhausted,
            Error::Unavailable(_) => StatusCode::Unavailable,
            Error::Internal(_) | Error::Io(_) | Error::Serialization(_) => {
                StatusCode::InternalError
            }
            Error::NotSupported(_) => StatusCode::NotSupported,
            Error::Unknown(_) => StatusCode::Unknown,
        }
    }

    #[inline]
    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Decode { .. })
    }

    /// The bare message, without the kind prefix added by `Display`.
    pub fn message(&self) -> String {
        match self {
            Error::NotFound(m)
            | Error::AlreadyExists(m)
            | Error::InvalidArgument(m)
            | Error::PermissionDenied(m)
            | Error::FailedPrecondition(m)
            | Error::ResourceExhausted(m)
            | Error::Unavailable(m)
            | Error::Internal(m)
            | Error::NotSupported(m)
            | Error::Unknown(m)
            | Error::Serialization(m) => m.clone(),
            Error::Io(e) => e.to_string(),
            Error::Decode { .. } => self.to_string(),
        }
    }

    pub(crate) fn decode(field: &str, requested: DataType, reason: impl Into<String>) -> Self {
        Error::Decode {
            field: field.to_string(),
            requested,
            reason: reason.into(),
        }
    }

    /// Attaches the field name to a decode error raised below the `Doc` layer.
    pub(crate) fn for_field(self, name: &str) -> Self {
        match self {
            Error::Decode {
                requested, reason, ..
            } => Error::Decode {
                field: name.to_string(),
                requested,
                reason,
            },
            other => other,
        }
    }
}

impl From<Status> for Error {
    fn from(status: Status) -> Self {
        let Status { code, message } = status;
        match code {
            StatusCode::NotFound => Error::NotFound(message),
            StatusCode::AlreadyExists => Error::AlreadyExists(message),
            StatusCode::InvalidArgument => Error::InvalidArgument(message),
            StatusCode::PermissionDenied => Error::PermissionDenied(message),
            StatusCode::FailedPrecondition => Error::FailedPrecondition(message),
            StatusCode::ResourceExhausted => Error::ResourceExhausted(message),
            StatusCode::Unavailable => Error::Unavailable(message),
            StatusCode::InternalError => Error::Internal(message),
            StatusCode::NotSupported => Error::NotSupported(message),
            StatusCode::Unknown => Error::Unknown(message),
            StatusCode::Ok => Error::Unknown(format!("ok status raised as error: {}", message)),
        }
    }
}

impl From<&Error> for Status {
    fn from(err: &Error) -> Self {
        Status::new(err.code(), err.message())
    }
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        Status::from(&err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_status_display() {
        let s = Status::default();
        assert!(s.is_ok());
        assert_eq!(s.code(), StatusCode::Ok);
        assert_eq!(s.to_string(), "OK");
    }

    #[test]
    fn test_error_status_display_uses_numeric_code() {
        let s = Status::already_exists("pk p1");
        assert_eq!(s.to_string(), "Error(2): pk p1");
    }

    #[test]
    fn test_status_maps_to_matching_error_kind() {
        for code in StatusCode::ALL.iter().copied().skip(1) {
            let err = Error::from(Status::new(code, "boom"));
            assert_eq!(err.code(), code);
            assert_eq!(err.message(), "boom");
        }
    }

    #[test]
    fn test_into_result() {
        assert!(Status::ok().into_result().is_ok());
        let err = Status::not_found("missing").into_result().unwrap_err();
        assert!(matches!(err, Error::NotFound(ref m) if m == "missing"));
    }

    #[test]
    fn test_code_numeric_roundtrip() {
        for code in StatusCode::ALL {
            assert_eq!(StatusCode::from_i32(code.as_i32()), Some(code));
        }
        assert_eq!(StatusCode::from_i32(11), None);
        assert_eq!(StatusCode::from_i32(-1), None);
    }

    #[test]
    fn test_decode_error_is_local() {
        let err = Error::decode("vec", DataType::VectorFp32, "stored as STRING");
        assert!(err.is_decode());
        assert_eq!(err.code(), StatusCode::InvalidArgument);
    }
}

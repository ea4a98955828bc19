use std::fmt;

/// Errors raised by the value layer.
///
/// The core never recovers from these; it raises and leaves the decision to
/// outer layers. Every variant names the operation that failed so rendered
/// messages read as `op: description`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The value's tag does not support the requested operation.
    TypeMismatch { op: &'static str, message: String },
    /// Too few or too many arguments for a callable's declared shape.
    Arity { callee: String, message: &'static str },
    /// An index fell outside a sequence where clamping does not apply.
    Range { op: &'static str, message: String },
    /// A storage request could not be satisfied.
    Allocation { op: &'static str, message: String },
    /// A length or size computation exceeded representable bounds.
    Overflow { op: &'static str, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

pub const MISSING_REQUIRED: &str = "missing required arguments";
pub const TOO_MANY: &str = "too many arguments";

impl Error {
    pub fn type_mismatch(op: &'static str, message: impl Into<String>) -> Self {
        Error::TypeMismatch {
            op,
            message: message.into(),
        }
    }

    pub fn range(op: &'static str, message: impl Into<String>) -> Self {
        Error::Range {
            op,
            message: message.into(),
        }
    }

    pub fn allocation(op: &'static str, message: impl Into<String>) -> Self {
        Error::Allocation {
            op,
            message: message.into(),
        }
    }

    pub fn overflow(op: &'static str, message: impl Into<String>) -> Self {
        Error::Overflow {
            op,
            message: message.into(),
        }
    }

    pub fn missing_arguments(callee: impl Into<String>) -> Self {
        Error::Arity {
            callee: callee.into(),
            message: MISSING_REQUIRED,
        }
    }

    pub fn too_many_arguments(callee: impl Into<String>) -> Self {
        Error::Arity {
            callee: callee.into(),
            message: TOO_MANY,
        }
    }

    /// Short machine-friendly name of the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::TypeMismatch { .. } => "type-mismatch",
            Error::Arity { .. } => "arity",
            Error::Range { .. } => "range",
            Error::Allocation { .. } => "allocation",
            Error::Overflow { .. } => "overflow",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TypeMismatch { op, message }
            | Error::Range { op, message }
            | Error::Allocation { op, message }
            | Error::Overflow { op, message } => write!(f, "{}: {}", op, message),
            Error::Arity { callee, message } => write!(f, "{}: {}", callee, message),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_operation() {
        let err = Error::type_mismatch("less", "cannot compare #<function> and 1");
        assert_eq!(err.to_string(), "less: cannot compare #<function> and 1");
        assert_eq!(err.kind(), "type-mismatch");
    }

    #[test]
    fn arity_errors_carry_fixed_messages() {
        assert_eq!(
            Error::missing_arguments("#<function>").to_string(),
            "#<function>: missing required arguments"
        );
        assert_eq!(
            Error::too_many_arguments("f").to_string(),
            "f: too many arguments"
        );
    }
}

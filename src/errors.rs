//! Error types for contig alignment modification
//!

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AlnError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlnError {
    /// A caller-supplied value violates a documented precondition, or upstream alignment input is
    /// malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The alignment logic reached a state that should be impossible for valid input
    #[error("Internal consistency error: {0}")]
    InternalConsistency(String),
}

/// Return early with an `AlnError::InvalidArgument` error
///
macro_rules! invalid_arg {
    ($($arg:tt)+) => {
        return Err($crate::errors::AlnError::InvalidArgument(format!($($arg)+)))
    };
}

/// Return early with an `AlnError::InternalConsistency` error
///
macro_rules! inconsistent {
    ($($arg:tt)+) => {
        return Err($crate::errors::AlnError::InternalConsistency(format!($($arg)+)))
    };
}

pub(crate) use {inconsistent, invalid_arg};

#[cfg(test)]
mod tests {
    use super::*;

    fn fail_with_invalid_arg(x: usize) -> Result<usize> {
        if x > 2 {
            invalid_arg!("value too large: {x}");
        }
        Ok(x)
    }

    #[test]
    fn test_invalid_arg_macro() {
        assert_eq!(fail_with_invalid_arg(1), Ok(1));
        let err = fail_with_invalid_arg(3).unwrap_err();
        assert_eq!(err, AlnError::InvalidArgument("value too large: 3".to_string()));
        assert!(format!("{err}").contains("Invalid argument"));
    }

    #[test]
    fn test_internal_consistency_display() {
        let err = AlnError::InternalConsistency("empty block".to_string());
        let msg = format!("{err}");
        assert!(msg.contains("Internal consistency"));
        assert!(msg.contains("empty block"));
    }
}

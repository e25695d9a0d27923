use thiserror::Error;

use crate::descriptor::DataType;

/// Failure to reorder or interpret a word sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unsupported byte format: {0:?}")]
    UnsupportedByteFormat(String),
    #[error("unsupported data type: {0:?}")]
    UnsupportedDataType(String),
    #[error("{data_type} needs {expected} registers, got {actual}")]
    WordCount {
        data_type: DataType,
        expected: usize,
        actual: usize,
    },
}

/// Failure attached to a single configured register.
///
/// None of these stop the polling loop: the register is skipped (for good
/// when rejected at load, for one cycle otherwise) and the error is logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("error parsing register {register}: {reason}")]
    Config { register: String, reason: String },

    #[error("register {register}: unsupported function code {code}")]
    UnsupportedFunctionCode { register: String, code: String },

    #[error("register {register}: unsupported byte format {format:?}")]
    UnsupportedByteFormat { register: String, format: String },

    #[error("register {register}: unsupported data type {data_type:?}")]
    UnsupportedDataType { register: String, data_type: String },

    #[error(
        "error reading register {register} at address {address} using function code {function_code}: {cause}"
    )]
    Transport {
        register: String,
        address: u16,
        function_code: u8,
        cause: String,
    },

    #[error("error processing register {register}: {source}")]
    Decode {
        register: String,
        #[source]
        source: DecodeError,
    },
}

impl RegisterError {
    pub fn config(register: &str, reason: impl Into<String>) -> Self {
        Self::Config {
            register: register.to_owned(),
            reason: reason.into(),
        }
    }

    /// Attaches a register name to a decoder failure.
    pub fn from_decode(register: &str, err: DecodeError) -> Self {
        let register = register.to_owned();
        match err {
            DecodeError::UnsupportedByteFormat(format) => {
                Self::UnsupportedByteFormat { register, format }
            }
            DecodeError::UnsupportedDataType(data_type) => {
                Self::UnsupportedDataType {
                    register,
                    data_type,
                }
            }
            source @ DecodeError::WordCount { .. } => Self::Decode { register, source },
        }
    }

    pub fn register(&self) -> &str {
        match self {
            Self::Config { register, .. }
            | Self::UnsupportedFunctionCode { register, .. }
            | Self::UnsupportedByteFormat { register, .. }
            | Self::UnsupportedDataType { register, .. }
            | Self::Transport { register, .. }
            | Self::Decode { register, .. } => register,
        }
    }
}

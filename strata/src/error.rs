use std::path::PathBuf;

use strata_tools::toolchain::ToolError;
use thiserror::Error;

/// Everything that can go wrong while recovering and resolving string literals.
#[derive(Error, Debug)]
pub enum StrataError {
    #[error("Malformed {record} record: expected {expected} bytes but decoded {actual}")]
    MalformedConstantRecord {
        record: String,
        expected: usize,
        actual: usize,
    },

    #[error("Operand {value} of {record} record does not fit into {width} bytes")]
    OperandOverflow {
        record: String,
        value: u64,
        width: u32,
    },

    #[error("IO error on {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid ELF file {0}: {1}")]
    InvalidElf(String, String),

    #[error("Could not decode batch data: {0}")]
    Decode(String),

    #[error("Could not encode batch data: {0}")]
    Encode(String),

    #[error("Got {actual} position maps for {expected} string sections")]
    MismatchedSections {
        expected: usize,
        actual: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Tool(#[from] ToolError),
}

impl StrataError {
    pub(crate) fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }

    /// Errors that abort the processing of a single file but leave its siblings in a batch alone.
    /// Everything else is fatal for the whole invocation.
    pub fn is_per_file(&self) -> bool {
        matches!(self, Self::MalformedConstantRecord { .. } | Self::OperandOverflow { .. } | Self::IoError { .. } | Self::InvalidElf(..))
    }
}

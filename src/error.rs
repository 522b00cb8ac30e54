use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by [`Logger`](crate::Logger) operations.
///
/// Exceeding a protocol limit (a format string over 255 bytes, more than 255
/// arguments) is a programming error and panics instead.
#[derive(Debug, Error)]
pub enum Error {
    /// The index sink rejected a record. The logger is poisoned.
    #[error("failed to write index record: {0}")]
    IndexSink(#[source] io::Error),

    /// The data sink rejected a record. The logger is poisoned.
    #[error("failed to write data record: {0}")]
    DataSink(#[source] io::Error),

    /// A previous sink failure left the streams corrupt; nothing more is written.
    #[error("logger is poisoned by an earlier sink failure")]
    Poisoned,

    /// Every value of the configured index width is already assigned.
    #[error("format string index space of {width} byte(s) is exhausted")]
    IndexExhausted { width: usize },

    /// The argument list does not have the shape registered for the format string.
    #[error("arguments do not match the signature registered for {format:?}")]
    SignatureMismatch { format: &'static str },

    /// No format string is registered under this index.
    #[error("no format string registered with index {0}")]
    UnknownIndex(u64),

    /// Opening a file sink failed.
    #[error("failed to create {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Whether this error came from a sink write.
    pub fn is_sink_failure(&self) -> bool {
        matches!(self, Error::IndexSink(_) | Error::DataSink(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

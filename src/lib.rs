//! # Binary Log
//!
//! An encoder for latency-sensitive logging. Instead of formatting text on the
//! hot path, each log statement is written as a compact binary record and the
//! human-readable line is rebuilt offline.
//!
//! ## Key Features
//!
//! * Format strings are deduplicated: each distinct text is described once,
//!   in the index stream, and data records refer to it by a small integer
//! * Argument types are recorded once per format string, never per call
//! * Arguments wrapped in [`Const`] are written once, with the format string,
//!   and omitted from every data record
//! * No allocation on the steady-state logging path
//!
//! ## Main Components
//!
//! * [`Logger`]: registers format strings and packs arguments into records
//! * [`log_record!`]: call-site macro with a per-site index cache and
//!   compile-time protocol limit checks
//! * [`Loggable`] / [`TypeTag`]: the closed set of wire types
//! * [`FormatTable`]: append-only text to index mapping owned by a logger
//! * [`files`]: opening a data file and its `.index` companion
//!
//! ## Dedup policy
//!
//! Format strings are identified by their text. The same text used at two
//! call sites shares one index, one set of type tags and one set of constant
//! values; reusing it with a different argument shape is rejected with
//! [`Error::SignatureMismatch`].
//!
//! ## Quick Start
//!
//! ```
//! use binary_log::{Const, Logger, log_record};
//!
//! let mut logger = Logger::new(Vec::new(), Vec::new());
//!
//! log_record!(logger, "Hello, world!").unwrap();
//! log_record!(logger, "Temperature: {} C", 25.5).unwrap();
//! log_record!(logger, "Status: {}, Count: {}", true, 42).unwrap();
//! log_record!(logger, "region={} latency_us={}", Const("eu-west"), 118u32).unwrap();
//!
//! let (index, data) = logger.into_sinks();
//! assert!(!index.is_empty() && !data.is_empty());
//! ```

pub mod call_site;
pub mod error;
pub mod files;
pub mod format_table;
pub mod loggable;
pub mod logger;
pub mod type_tag;

pub use call_site::{CallSite, MAX_ARG_COUNT, MAX_FORMAT_LEN};
pub use error::{Error, Result};
pub use files::FileLogger;
pub use format_table::{FormatIndex, FormatTable, Signature};
pub use loggable::{Const, Loggable};
pub use logger::Logger;
pub use type_tag::TypeTag;

use std::io::Write;

use tracing::{debug, error, warn};

use crate::call_site::{next_logger_id, CallSite, MAX_ARG_COUNT, MAX_FORMAT_LEN};
use crate::error::{Error, Result};
use crate::format_table::{FormatIndex, FormatTable, Signature};
use crate::loggable::Loggable;

/// Initial capacity of the scratch buffer records are assembled in.
pub const DEFAULT_RECORD_CAPACITY: usize = 256;

/// Core of the binary log encoder.
///
/// A `Logger` turns each log statement into records on two append-only sinks:
///
/// * the **index sink** receives one record per distinct format string, the
///   first time it is seen: the format text, each argument's [`TypeTag`], and
///   the value of every [`Const`] argument;
/// * the **data sink** receives one record per log statement: the format
///   string index followed by the values of the non-constant arguments.
///
/// Human-readable formatting is left to an offline decoder that replays the
/// index stream to learn the shape of each data record.
///
/// # Wire format
///
/// Index record:
///
/// ```text
/// u8  format_len
/// u8  format[format_len]
/// u8  arg_count
/// u8  type_tag[arg_count]
/// arg_count x { u8 is_constant; value if is_constant }
/// ```
///
/// Data record:
///
/// ```text
/// Ix  format_index            (little-endian, Ix::WIDTH bytes)
/// value of each non-constant argument, in positional order
/// ```
///
/// Scalars are little-endian at their natural width; strings use a 4-byte
/// little-endian length prefix; C strings are written with their terminator.
///
/// # Sinks
///
/// Sinks are any [`std::io::Write`]. Each record is assembled in an internal
/// buffer and handed over with one `write_all`, so a protocol-limit violation
/// never leaves a partial record behind. Pass `&mut W` to keep ownership of a
/// sink, or use [`Logger::into_sinks`] to get owned sinks back.
///
/// When a sink write fails the logger is poisoned: the error is returned once
/// and every later call fails with [`Error::Poisoned`] without touching either
/// sink.
///
/// # Thread Safety
///
/// **Important**: Logger is NOT thread-safe and is designed to be used by a single thread.
/// Independent loggers on different threads need no coordination.
///
/// # Type Parameters
///
/// * `I` - The index sink
/// * `D` - The data sink
/// * `Ix` - Width of the format string index in data records (default `u8`)
///
/// [`TypeTag`]: crate::TypeTag
/// [`Const`]: crate::Const
///
/// # Examples
///
/// ```
/// use binary_log::{Const, Logger, log_record};
///
/// let mut index = Vec::new();
/// let mut data = Vec::new();
/// {
///     let mut logger = Logger::new(&mut index, &mut data);
///     log_record!(logger, "value={}", 42i32).unwrap();
///     log_record!(logger, "value={}", 7i32).unwrap();
/// }
/// assert_eq!(index, b"\x08value={}\x01\x03\x00");
/// assert_eq!(data, [0, 42, 0, 0, 0, 0, 7, 0, 0, 0]);
/// ```
pub struct Logger<I, D, Ix: FormatIndex = u8> {
    id: u32,
    index_sink: I,
    data_sink: D,
    table: FormatTable<Ix>,
    record: Vec<u8>,
    poisoned: bool,
}

impl<I: Write, D: Write> Logger<I, D> {
    /// Creates a logger with a one-byte format string index.
    ///
    /// # Examples
    ///
    /// ```
    /// # use binary_log::Logger;
    /// let logger = Logger::new(Vec::new(), Vec::new());
    /// assert_eq!(logger.format_count(), 0);
    /// ```
    pub fn new(index_sink: I, data_sink: D) -> Self {
        Self::with_index_width(index_sink, data_sink)
    }
}

impl<I: Write, D: Write, Ix: FormatIndex> Logger<I, D, Ix> {
    /// Creates a logger whose data records carry an `Ix`-wide index.
    ///
    /// ```
    /// # use binary_log::Logger;
    /// let logger = Logger::<_, _, u16>::with_index_width(Vec::new(), Vec::new());
    /// # drop(logger);
    /// ```
    pub fn with_index_width(index_sink: I, data_sink: D) -> Self {
        Self {
            id: next_logger_id(),
            index_sink,
            data_sink,
            table: FormatTable::new(),
            record: Vec::with_capacity(DEFAULT_RECORD_CAPACITY),
            poisoned: false,
        }
    }

    /// Pre-sizes the record buffer so that records up to `capacity` bytes are
    /// assembled without reallocating.
    pub fn with_record_capacity(mut self, capacity: usize) -> Self {
        self.record.reserve(capacity.saturating_sub(self.record.len()));
        self
    }

    /// Resolves `format` to its index, registering it on first sight.
    ///
    /// Returns the index and whether this call registered it. Registration
    /// writes one index record describing `args`; a repeated format string
    /// writes nothing but must come with arguments of the registered shape.
    ///
    /// # Panics
    ///
    /// If `format` is longer than 255 bytes or `args` has more than 255
    /// entries. Nothing is written in that case.
    pub fn register_or_lookup(
        &mut self,
        format: &'static str,
        args: &[&dyn Loggable],
    ) -> Result<(Ix, bool)> {
        check_protocol_limits(format, args.len());
        self.ensure_writable()?;

        if let Some(index) = self.table.lookup(format) {
            self.check_signature(index, args)?;
            return Ok((index, false));
        }

        let index = self
            .table
            .next_index()
            .ok_or(Error::IndexExhausted { width: Ix::WIDTH })?;

        self.record.clear();
        encode_index_record(&mut self.record, format, args);
        if let Err(e) = self.index_sink.write_all(&self.record) {
            return Err(self.poison(Error::IndexSink(e)));
        }

        let assigned = self.table.insert(format, Signature::of(args));
        debug_assert_eq!(assigned, Some(index));
        debug!(
            logger = self.id,
            index = %index,
            format_string = format,
            args = args.len(),
            "registered format string"
        );
        Ok((index, true))
    }

    /// Writes the data record of one log statement.
    ///
    /// Arguments registered as constant for `index` are skipped; their value
    /// already lives in the index record. `args` must have the type tags and
    /// constness registered for `index`, otherwise nothing is written and
    /// [`Error::SignatureMismatch`] is returned. The index must have been returned
    /// by [`register_or_lookup`](Self::register_or_lookup) on this logger.
    pub fn write_data_record(&mut self, index: Ix, args: &[&dyn Loggable]) -> Result<()> {
        self.ensure_writable()?;

        let entry = self
            .table
            .get(index)
            .ok_or_else(|| Error::UnknownIndex(index.into()))?;
        if !entry.signature.matches(args) {
            return Err(Error::SignatureMismatch {
                format: entry.format,
            });
        }

        self.record.clear();
        index.write_le(&mut self.record);
        for (arg, &constant) in args.iter().zip(&entry.signature.constants[..]) {
            if !constant {
                arg.encode(&mut self.record);
            }
        }

        if let Err(e) = self.data_sink.write_all(&self.record) {
            return Err(self.poison(Error::DataSink(e)));
        }
        Ok(())
    }

    /// Logs one statement, identifying the format string by its text.
    pub fn log(&mut self, format: &'static str, args: &[&dyn Loggable]) -> Result<()> {
        let (index, _) = self.register_or_lookup(format, args)?;
        self.write_data_record(index, args)
    }

    /// Logs one statement from a call site, reusing the index the site cached
    /// for this logger. This is what [`log_record!`](crate::log_record) calls.
    #[inline]
    pub fn log_at(&mut self, site: &CallSite, args: &[&dyn Loggable]) -> Result<()> {
        if let Some(cached) = site.cached(self.id) {
            if let Ok(index) = Ix::try_from(cached) {
                return self.write_data_record(index, args);
            }
        }

        let (index, _) = self.register_or_lookup(site.format(), args)?;
        site.store(self.id, index.into());
        self.write_data_record(index, args)
    }

    /// Flushes both sinks.
    pub fn flush(&mut self) -> Result<()> {
        self.ensure_writable()?;
        if let Err(e) = self.index_sink.flush() {
            return Err(self.poison(Error::IndexSink(e)));
        }
        if let Err(e) = self.data_sink.flush() {
            return Err(self.poison(Error::DataSink(e)));
        }
        Ok(())
    }
}

impl<I, D, Ix: FormatIndex> Logger<I, D, Ix> {
    /// Number of distinct format strings registered so far.
    pub fn format_count(&self) -> usize {
        self.table.len()
    }

    /// Argument shape registered for `index`.
    pub fn signature(&self, index: Ix) -> Option<&Signature> {
        self.table.get(index).map(|e| &e.signature)
    }

    pub fn format_table(&self) -> &FormatTable<Ix> {
        &self.table
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn index_sink(&self) -> &I {
        &self.index_sink
    }

    pub fn data_sink(&self) -> &D {
        &self.data_sink
    }

    /// Consumes the logger and returns `(index_sink, data_sink)`.
    pub fn into_sinks(self) -> (I, D) {
        (self.index_sink, self.data_sink)
    }

    #[inline(always)]
    fn ensure_writable(&self) -> Result<()> {
        if self.poisoned {
            Err(Error::Poisoned)
        } else {
            Ok(())
        }
    }

    fn poison(&mut self, err: Error) -> Error {
        self.poisoned = true;
        error!(logger = self.id, error = %err, "sink write failed, logger poisoned");
        err
    }

    fn check_signature(&self, index: Ix, args: &[&dyn Loggable]) -> Result<()> {
        let entry = self
            .table
            .get(index)
            .ok_or_else(|| Error::UnknownIndex(index.into()))?;
        if entry.signature.matches(args) {
            Ok(())
        } else {
            warn!(
                logger = self.id,
                index = %index,
                format_string = entry.format,
                "argument shape differs from registration"
            );
            Err(Error::SignatureMismatch {
                format: entry.format,
            })
        }
    }
}

/// Panics when a record would exceed the one-byte length or count fields.
#[inline]
fn check_protocol_limits(format: &str, arg_count: usize) {
    assert!(
        format.len() <= MAX_FORMAT_LEN,
        "format string of {} bytes exceeds the {MAX_FORMAT_LEN}-byte limit",
        format.len()
    );
    assert!(
        arg_count <= MAX_ARG_COUNT,
        "{arg_count} arguments exceed the {MAX_ARG_COUNT}-argument limit"
    );
}

fn encode_index_record(out: &mut Vec<u8>, format: &str, args: &[&dyn Loggable]) {
    out.push(format.len() as u8);
    out.extend_from_slice(format.as_bytes());
    out.push(args.len() as u8);
    out.extend(args.iter().map(|arg| arg.type_tag().as_u8()));
    for arg in args {
        if arg.is_constant() {
            out.push(1);
            arg.encode(out);
        } else {
            out.push(0);
        }
    }
}

/// Logs a record with the given format string and arguments.
///
/// This macro is the primary interface for logging. It:
/// 1. Declares a static [`CallSite`] caching the format string index
/// 2. Rejects more than 255 arguments or a format string over 255 bytes at
///    compile time
/// 3. Calls [`Logger::log_at`] with the arguments as `&dyn Loggable`
///
/// Wrap an argument in [`Const`](crate::Const) to write its value once, in the
/// index record, instead of on every call.
///
/// # Returns
///
/// [`Result`](crate::Result) of the logging operation
///
/// # Examples
///
/// ```
/// # use binary_log::{Const, Logger, log_record};
/// let mut logger = Logger::new(Vec::new(), Vec::new());
///
/// log_record!(logger, "Hello, world!").unwrap();
/// log_record!(logger, "Temperature: {} C", 25.5).unwrap();
/// log_record!(logger, "Status: {}, Count: {}", true, 42).unwrap();
/// log_record!(logger, "service={} port={}", Const("gateway"), 8080u16).unwrap();
///
/// let values = vec![1, 2, 3];
/// log_record!(logger, "Length: {}", values.len()).unwrap();
/// assert_eq!(logger.format_count(), 5);
/// ```
///
/// 255 arguments is the most one record can describe:
///
/// ```
/// # use binary_log::{Logger, log_record};
/// let mut logger = Logger::new(Vec::new(), Vec::new());
/// log_record!(
///     logger,
///     "wide",
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
/// )
/// .unwrap();
/// assert_eq!(logger.signature(0).unwrap().arg_count(), 255);
/// ```
///
/// One more fails to compile:
///
/// ```compile_fail
/// # use binary_log::{Logger, log_record};
/// let mut logger = Logger::new(Vec::new(), Vec::new());
/// log_record!(
///     logger,
///     "too wide",
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
///     0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8,
/// )
/// .unwrap();
/// ```
#[macro_export]
macro_rules! log_record {
    ($logger:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        const _: () = assert!(
            0usize $(+ $crate::__count_one!($arg))* <= $crate::MAX_ARG_COUNT,
            "log_record! takes at most 255 arguments"
        );
        static SITE: $crate::CallSite = $crate::CallSite::new($fmt);
        $logger.log_at(&SITE, &[$(&$arg as &dyn $crate::Loggable),*])
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __count_one {
    ($arg:expr) => {
        1usize
    };
}

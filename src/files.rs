use std::ffi::OsString;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::logger::Logger;

/// Suffix appended to the data file path to name its index file.
pub const INDEX_SUFFIX: &str = ".index";

/// A logger writing to a buffered data file and index file.
pub type FileLogger<Ix = u8> = Logger<BufWriter<File>, BufWriter<File>, Ix>;

/// Path of the index file that accompanies the data file at `path`.
///
/// ```
/// # use binary_log::files::index_path;
/// # use std::path::Path;
/// assert_eq!(index_path(Path::new("logs/app.bin")), Path::new("logs/app.bin.index"));
/// ```
pub fn index_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(INDEX_SUFFIX);
    PathBuf::from(name)
}

fn create(path: PathBuf) -> Result<BufWriter<File>> {
    match File::create(&path) {
        Ok(file) => Ok(BufWriter::new(file)),
        Err(source) => Err(Error::Create { path, source }),
    }
}

/// Creates (or truncates) the data file at `path` and its index file, and
/// returns `(index_sink, data_sink)`.
pub fn open_sinks(path: impl AsRef<Path>) -> Result<(BufWriter<File>, BufWriter<File>)> {
    let path = path.as_ref();
    let data = create(path.to_path_buf())?;
    let index = create(index_path(path))?;
    Ok((index, data))
}

impl FileLogger {
    /// Creates a logger writing records to `path` and format strings to
    /// `path` + `.index`. Existing files are truncated.
    ///
    /// Buffered records reach the files on [`Logger::flush`] or when the
    /// logger is dropped.
    ///
    /// ```no_run
    /// use binary_log::{Logger, log_record};
    ///
    /// let mut logger = Logger::create("app.bin")?;
    /// log_record!(logger, "started pid={}", std::process::id())?;
    /// logger.flush()?;
    /// # Ok::<(), binary_log::Error>(())
    /// ```
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let (index, data) = open_sinks(path)?;
        Ok(Logger::new(index, data))
    }
}

use std::env;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

use binary_log::files::index_path;
use binary_log::{log_record, Const, Logger};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: binary_log <path> [iterations]";

fn main() -> ExitCode {
    let (writer, _guard) = tracing_appender::non_blocking(std::io::stderr());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(writer)
        .init();

    let mut args = env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("{USAGE}");
        return ExitCode::FAILURE;
    };
    let iterations = match args.next().map(|s| s.parse::<u32>()) {
        None => 1000,
        Some(Ok(n)) => n,
        Some(Err(e)) => {
            eprintln!("invalid iteration count: {e}\n{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    match run(&path, iterations) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "demo failed");
            ExitCode::FAILURE
        }
    }
}

fn run(path: &str, iterations: u32) -> binary_log::Result<()> {
    let mut logger = Logger::create(path)?;

    log_record!(logger, "service {} starting, version {}", Const("demo"), Const(env!("CARGO_PKG_VERSION")))?;
    for i in 0..iterations {
        let temperature = 20.0 + f64::from(i % 50) * 0.25;
        log_record!(logger, "iteration={} temperature={} unit={}", i, temperature, Const('C'))?;
        if i % 100 == 0 {
            log_record!(logger, "checkpoint {} of {}", i, Const(iterations))?;
        }
    }
    log_record!(logger, "service {} stopped", Const("demo"))?;
    logger.flush()?;
    let formats = logger.format_count();
    drop(logger);

    let data_len = file_len(Path::new(path));
    let index_len = file_len(&index_path(Path::new(path)));
    info!(
        path,
        iterations,
        formats,
        data_bytes = ?data_len,
        index_bytes = ?index_len,
        "wrote binary log"
    );
    Ok(())
}

/// Size of a written file, or `None` (with a warning) if it cannot be stat'ed.
fn file_len(path: &Path) -> Option<u64> {
    match fs::metadata(path) {
        Ok(meta) => Some(meta.len()),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot stat output file");
            None
        }
    }
}

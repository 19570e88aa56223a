//! Logging setup for the CLI.

use std::path::Path;

use ftlog::{appender::FileAppender, LevelFilter, LoggerGuard};

/// Starts the global logger at the given level.
///
/// Records go to `log_path` when one is given, creating its parent
/// directories, and to stderr otherwise. Stdout is left to the scores.
///
/// The returned guard must be kept alive until the program exits so that
/// buffered records are flushed.
pub fn configure_logger(log_path: Option<&Path>, level: LevelFilter) -> Result<LoggerGuard, String> {
    let builder = ftlog::Builder::new().max_log_level(level);

    let builder = match log_path {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir).map_err(|e| e.to_string())?;
            }
            builder.root(FileAppender::new(path))
        }
        None => builder.root(std::io::stderr()),
    };

    builder.try_init().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use ftlog::LevelFilter;

    #[test]
    fn file_logger() -> Result<(), String> {
        let dir = tempdir::TempDir::new("outliers-shell").map_err(|e| e.to_string())?;
        let path = dir.path().join("nested").join("run.log");

        let guard = super::configure_logger(Some(&path), LevelFilter::Info)?;
        assert!(path.parent().is_some_and(std::path::Path::is_dir));

        // The global logger can only be set once.
        assert!(super::configure_logger(None, LevelFilter::Info).is_err());

        drop(guard);
        Ok(())
    }
}

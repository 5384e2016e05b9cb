//! Wires `env_logger`, optionally redirecting output to a rotating file via `file-rotate` when a
//! log file path is configured. Mirrors this codebase's `logs_filepath: Option<String>` field.

use std::io::Write;

use file_rotate::suffix::AppendCount;
use file_rotate::{ContentLimit, FileRotate};

/// Initializes the global logger. `logs_filepath` of `None` logs to stdout/stderr as
/// `env_logger` does by default; `Some(path)` redirects to a size-rotated file.
pub fn init(logs_filepath: Option<&str>) {
    let mut builder = env_logger::Builder::from_default_env();

    if let Some(path) = logs_filepath {
        let rotated = FileRotate::new(
            path,
            AppendCount::new(5),
            ContentLimit::Bytes(10 * 1024 * 1024),
            file_rotate::compression::Compression::None,
            #[cfg(unix)]
            None,
        );
        let target = std::sync::Mutex::new(rotated);
        builder.target(env_logger::Target::Pipe(Box::new(WriterAdapter(target))));
    }

    let _ = builder.try_init();
}

struct WriterAdapter(std::sync::Mutex<FileRotate<AppendCount>>);

impl Write for WriterAdapter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.lock().unwrap().flush()
    }
}

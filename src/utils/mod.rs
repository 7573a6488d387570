//! Utility functions and types

pub mod data_loader;

pub use data_loader::{DataLoader, DataSaver};

use std::time::{Duration, Instant};

/// Simple wall-clock timer used for log fields.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self { start: Instant::now() }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Write a file atomically: the content goes to a temporary file in the
/// destination directory which is then renamed over `path`. Readers see
/// either the previous file or the complete new one.
pub fn write_atomic<F>(path: &std::path::Path, write: F) -> crate::error::Result<()>
where
    F: FnOnce(&mut std::fs::File) -> crate::error::Result<()>,
{
    use std::io::Write;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    write(tmp.as_file_mut())?;
    tmp.as_file_mut().flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

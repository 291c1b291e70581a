use anyhow::Result;
use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only audit trail, one line per processed note. The file name
/// carries the run start time so successive runs never clobber each other.
pub struct ProgressLog {
    path: PathBuf,
    file: File,
}

impl ProgressLog {
    /// Open the log for this run in the current directory.
    pub fn create_for_run() -> Result<Self> {
        let name = format!(
            "notedate_progress_{}.txt",
            Local::now().format("%Y%m%d_%H%M%S")
        );
        Self::create(Path::new(&name))
    }

    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&mut self, processed: u32, total: u32, title: &str) -> Result<()> {
        writeln!(self.file, "Processed {processed}/{total}: {title}")?;
        Ok(())
    }
}

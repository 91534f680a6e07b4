use crate::repositories::Repository;
use anyhow::Result;
use std::path::Path;

pub trait Exporter {
    /// Write the books to a file, reporting regularly when progress has been
    /// made.
    fn export_file(
        &mut self,
        repo: &Repository,
        export_to: &Path,
        report_progress: impl Fn(u64, u64),
    ) -> Result<()>;
}

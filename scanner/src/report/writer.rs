use crate::report::model::ReportModel;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Publishes scan reports to disk and the console.
pub struct ReportWriter {
    path: PathBuf,
}

impl ReportWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[cfg(test)]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub fn publish(&self, model: &ReportModel) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating report directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(model).context("encoding scan report")?;
        fs::write(&self.path, json)
            .with_context(|| format!("writing scan report {}", self.path.display()))?;

        for entry in &model.entries {
            println!(
                "[report] {} t={} ch={} {:.2} km | flags: {}",
                entry.record.source_file.display(),
                entry.record.key.time_index,
                entry.record.key.channel_index,
                entry.record.distance_km,
                entry.flags
            );
        }
        for failed in &model.failed_files {
            println!("[report] unreadable: {}", failed.display());
        }
        self.publish_status(&format!(
            "{} matches from {} files ({} unreadable) -> {}",
            model.entries.len(),
            model.files_scanned,
            model.failed_files.len(),
            self.path.display()
        ));
        Ok(())
    }

    pub fn publish_status(&self, message: &str) {
        println!("[report] {}", message);
    }

    #[cfg(test)]
    pub fn load(path: &std::path::Path) -> Result<ReportModel> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading scan report {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing scan report {}", path.display()))
    }
}

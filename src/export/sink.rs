//! Where finished export documents go: a viewer window when one can be
//! opened, otherwise a plain saved download.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    pub file_name: String,
    pub mime: &'static str,
    pub body: String,
}

pub trait ExportSink {
    /// `Ok(None)` means the window was blocked; the caller falls back to a download.
    fn open_window(&mut self, doc: &ExportDocument) -> anyhow::Result<Option<String>>;
    fn save_download(&mut self, doc: &ExportDocument) -> anyhow::Result<String>;
}

/// Writes under `<workspace>/exports/` and hands the file to the system
/// viewer when `open_windows` is set.
#[derive(Debug, Clone)]
pub struct WorkspaceSink {
    dir: PathBuf,
    open_windows: bool,
}

impl WorkspaceSink {
    pub fn new(workspace: &Path, open_windows: bool) -> Self {
        Self {
            dir: workspace.join("exports"),
            open_windows,
        }
    }

    fn write(&self, doc: &ExportDocument) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&doc.file_name);
        std::fs::write(&path, &doc.body)?;
        Ok(path)
    }
}

impl ExportSink for WorkspaceSink {
    fn open_window(&mut self, doc: &ExportDocument) -> anyhow::Result<Option<String>> {
        if !self.open_windows {
            return Ok(None);
        }
        let path = self.write(doc)?;
        match open::that(&path) {
            Ok(()) => Ok(Some(path.to_string_lossy().to_string())),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "viewer blocked; saving instead");
                Ok(None)
            }
        }
    }

    fn save_download(&mut self, doc: &ExportDocument) -> anyhow::Result<String> {
        let path = self.write(doc)?;
        Ok(path.to_string_lossy().to_string())
    }
}

/// Keeps documents in memory. `blocked` simulates a refused window.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub blocked: bool,
    pub windows: Vec<ExportDocument>,
    pub downloads: Vec<ExportDocument>,
}

impl ExportSink for MemorySink {
    fn open_window(&mut self, doc: &ExportDocument) -> anyhow::Result<Option<String>> {
        if self.blocked {
            return Ok(None);
        }
        self.windows.push(doc.clone());
        Ok(Some(format!("window:{}", doc.file_name)))
    }

    fn save_download(&mut self, doc: &ExportDocument) -> anyhow::Result<String> {
        self.downloads.push(doc.clone());
        Ok(format!("download:{}", doc.file_name))
    }
}

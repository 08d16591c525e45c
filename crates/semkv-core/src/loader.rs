use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::Document;

/// A document together with the file it was read from.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub document: Document,
}

/// Collects one document per file with a given extension under a directory.
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    extension: String,
    limit: Option<usize>,
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self { extension: "txt".to_string(), limit: None }
    }
}

impl DocumentLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    /// Only read the first `limit` files (after sorting).
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Walks `data_dir` recursively in path order. Files that cannot be read
    /// or are not UTF-8 are skipped with a warning.
    pub fn load_directory(&self, data_dir: &Path) -> Result<Vec<SourceDocument>> {
        if !data_dir.is_dir() {
            return Err(Error::NotFound(format!("document directory {}", data_dir.display())));
        }
        let mut files = self.list_files(data_dir);
        if files.is_empty() {
            info!(dir = %data_dir.display(), ext = %self.extension, "no matching files");
            return Ok(vec![]);
        }
        if let Some(limit) = self.limit {
            if files.len() > limit {
                files.truncate(limit);
                info!(limit, "limited to first files");
            }
        }
        let mut docs = Vec::with_capacity(files.len());
        for (file_index, path) in files.iter().enumerate() {
            debug!(n = file_index + 1, total = files.len(), path = %path.display(), "reading file");
            match read_utf8(path) {
                Ok(text) => docs.push(SourceDocument { path: path.clone(), document: Document::new(text) }),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable document"),
            }
        }
        info!(files = files.len(), documents = docs.len(), "loaded documents");
        Ok(docs)
    }

    fn list_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(root) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some(self.extension.as_str()) {
                files.push(path.to_path_buf());
            }
        }
        files.sort();
        files
    }
}

fn read_utf8(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
    String::from_utf8(bytes).map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })
}

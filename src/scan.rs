//! Document discovery

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Extension scanned when none is configured
pub const DEFAULT_EXTENSION: &str = "arxml";

/// Error building a scanner
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Invalid exclude pattern: {0}")]
    InvalidGlob(#[from] globset::Error),
}

/// Walks a directory tree and yields matching documents in a stable order
#[derive(Debug, Clone)]
pub struct Scanner {
    root: PathBuf,
    extensions: Vec<String>,
    excludes: GlobSet,
    follow_links: bool,
}

impl Scanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            root: std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf()),
            extensions: vec![DEFAULT_EXTENSION.to_string()],
            excludes: GlobSet::empty(),
            follow_links: false,
        }
    }

    /// Replace the accepted extensions (leading dots are ignored)
    pub fn with_extensions<S: AsRef<str>>(mut self, extensions: &[S]) -> Self {
        let extensions: Vec<String> = extensions
            .iter()
            .map(|e| e.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        if !extensions.is_empty() {
            self.extensions = extensions;
        }
        self
    }

    /// Skip paths (relative to the root) matching any of these globs
    pub fn with_excludes<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self, ScanError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(Glob::new(pattern.as_ref())?);
        }
        self.excludes = builder.build()?;
        Ok(self)
    }

    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `path` relative to the scan root
    pub fn relative<'p>(&self, path: &'p Path) -> &'p Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }

    fn is_excluded(&self, entry: &DirEntry) -> bool {
        let rel = self.relative(entry.path());
        !rel.as_os_str().is_empty() && self.excludes.is_match(rel)
    }

    fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let e = e.to_lowercase();
                self.extensions.iter().any(|x| *x == e)
            })
            .unwrap_or(false)
    }

    /// Walk the tree. Files precede subdirectories and siblings are sorted
    /// by name; each call walks again.
    pub fn scan(&self) -> impl Iterator<Item = PathBuf> + '_ {
        WalkDir::new(&self.root)
            .follow_links(self.follow_links)
            .sort_by(|a, b| {
                a.file_type()
                    .is_dir()
                    .cmp(&b.file_type().is_dir())
                    .then_with(|| a.file_name().cmp(b.file_name()))
            })
            .into_iter()
            .filter_entry(move |entry| !self.is_excluded(entry))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(DirEntry::into_path)
            .filter(move |path| self.has_extension(path))
    }
}

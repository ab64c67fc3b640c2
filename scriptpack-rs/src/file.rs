//! Transient file records passed through the bundle task.

use crate::error::BuildError;
use sourcemap::SourceMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A file flowing through the pipeline.
///
/// `path` always lives under `base`; `relative()` is what lands under the
/// destination directory. Contents start out empty and are filled by the
/// bundle step.
#[derive(Debug)]
pub struct FileRecord {
    pub cwd: PathBuf,
    pub base: PathBuf,
    pub path: PathBuf,
    pub contents: Option<Vec<u8>>,
    pub source_map: Option<SourceMap>,
    /// Every path the record has had, oldest first.
    pub history: Vec<PathBuf>,
}

impl FileRecord {
    pub fn new(cwd: impl Into<PathBuf>, base: impl Into<PathBuf>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            cwd: cwd.into(),
            base: base.into(),
            history: vec![path.clone()],
            path,
            contents: None,
            source_map: None,
        }
    }

    pub fn relative(&self) -> PathBuf {
        self.path
            .strip_prefix(&self.base)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| self.path.file_name().map(PathBuf::from).unwrap_or_default())
    }

    /// The path the record had when it entered the pipeline.
    pub fn original_path(&self) -> &Path {
        self.history.first().unwrap_or(&self.path)
    }

    pub fn contents_str(&self) -> Result<&str, BuildError> {
        let contents = self.contents.as_deref().unwrap_or_default();
        std::str::from_utf8(contents).map_err(|err| BuildError::map(self.original_path(), err))
    }

    pub fn rename(&mut self, options: &RenameOptions) {
        let renamed = options.apply(&self.path);
        if renamed != self.path {
            self.path = renamed.clone();
            self.history.push(renamed);
        }
    }

    /// Writes the contents to `dest`, keeping the path relative to `base`.
    pub fn write_to(&self, dest: &Path) -> Result<PathBuf, BuildError> {
        let out_path = dest.join(self.relative());
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|err| BuildError::io(parent, err))?;
        }
        fs::write(&out_path, self.contents.as_deref().unwrap_or_default())
            .map_err(|err| BuildError::io(&out_path, err))?;
        Ok(out_path)
    }
}

/// Renames a path's file name, leaving its directory alone:
/// `prefix + stem + suffix + extname`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameOptions {
    pub prefix: String,
    pub suffix: String,
    /// Replacement extension including the dot; the current one is kept when `None`.
    pub extname: Option<String>,
}

impl RenameOptions {
    pub fn suffix(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            ..Default::default()
        }
    }

    pub fn apply(&self, path: &Path) -> PathBuf {
        let Some(file_name) = path.file_name() else {
            return path.to_path_buf();
        };
        let file_name = file_name.to_string_lossy();
        let (stem, ext) = split_extension(&file_name);
        let ext = self.extname.as_deref().unwrap_or(ext);
        path.with_file_name(format!("{}{}{}{}", self.prefix, stem, self.suffix, ext))
    }
}

/// Splits at the last dot, keeping the dot with the extension. A leading
/// dot belongs to the stem.
fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => file_name.split_at(idx),
        _ => (file_name, ""),
    }
}

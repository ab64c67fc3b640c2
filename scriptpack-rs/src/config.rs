//! Static build configuration.
//!
//! The defaults reproduce the stock setup: every `.js` file in the working
//! directory except already minified outputs, bundled back into the same
//! directory. A `scriptpack.toml` file overrides any subset of the fields.

use crate::bundler::BundleType;
use crate::error::BuildError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "scriptpack.toml";

/// Options for the source map steps of the bundle task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceMapsConfig {
    /// Pick up the inline map emitted by the bundler and maps of the original sources.
    pub load_maps: bool,
    /// Directory of the map files, relative to each output file.
    pub dest_path: String,
    /// Keep `sourcesContent` in the written maps.
    pub include_content: bool,
    /// Append a `sourceMappingURL` comment to each bundle.
    pub add_comment: bool,
    pub source_root: Option<String>,
}

impl Default for SourceMapsConfig {
    fn default() -> Self {
        Self {
            load_maps: true,
            dest_path: "./".to_string(),
            include_content: true,
            add_comment: true,
            source_root: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Ordered entry patterns; a leading `!` marks an exclusion.
    pub scripts: Vec<String>,
    /// Destination directory for bundles and maps.
    pub dest: PathBuf,
    /// Suffix inserted before the extension of every output file.
    pub suffix: String,
    pub minify: bool,
    pub bundle_type: BundleType,
    pub sourcemaps: SourceMapsConfig,

    /// Directory that relative patterns and `dest` resolve against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            scripts: vec!["./*.js".to_string(), "!./*.min.js".to_string()],
            dest: PathBuf::from("./"),
            suffix: ".min".to_string(),
            minify: true,
            bundle_type: BundleType::Classic,
            sourcemaps: SourceMapsConfig::default(),
            base_dir: PathBuf::from("."),
        }
    }
}

impl BuildConfig {
    /// Parses a configuration file. Relative paths in it resolve against the
    /// directory that holds the file.
    pub fn from_file(path: &Path) -> Result<Self, BuildError> {
        let text = fs::read_to_string(path).map_err(|err| BuildError::io(path, err))?;
        let mut config = Self::from_toml_str(&text).map_err(|source| BuildError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        config.base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Loads `scriptpack.toml` from `dir` when present, defaults otherwise.
    pub fn discover(dir: &Path) -> Result<Self, BuildError> {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            log::debug!("Loading configuration from {}", candidate.display());
            Self::from_file(&candidate)
        } else {
            Ok(Self {
                base_dir: dir.to_path_buf(),
                ..Default::default()
            })
        }
    }

    /// Destination directory, resolved against `base_dir`.
    pub fn dest_dir(&self) -> PathBuf {
        self.base_dir.join(&self.dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_stock_setup() {
        let config = BuildConfig::default();
        assert_eq!(config.scripts, vec!["./*.js", "!./*.min.js"]);
        assert_eq!(config.dest, PathBuf::from("./"));
        assert_eq!(config.suffix, ".min");
        assert!(config.sourcemaps.load_maps);
        assert_eq!(config.sourcemaps.dest_path, "./");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = BuildConfig::from_toml_str(
            r#"
dest = "dist"
bundle_type = "module"

[sourcemaps]
include_content = false
"#,
        )
        .unwrap();
        assert_eq!(config.dest, PathBuf::from("dist"));
        assert_eq!(config.bundle_type, BundleType::Module);
        assert!(!config.sourcemaps.include_content);
        assert!(config.sourcemaps.add_comment);
        assert_eq!(config.scripts, BuildConfig::default().scripts);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(BuildConfig::from_toml_str("destination = \"dist\"").is_err());
        assert!(BuildConfig::from_toml_str("[sourcemaps]\nwrite = true").is_err());
    }

    #[test]
    fn test_from_file_sets_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "dest = \"out\"\n").unwrap();

        let config = BuildConfig::from_file(&path).unwrap();
        assert_eq!(config.base_dir, dir.path());
        assert_eq!(config.dest_dir(), dir.path().join("out"));
    }

    #[test]
    fn test_from_file_reports_path_on_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "scripts = 3\n").unwrap();

        let err = BuildConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, BuildError::Config { .. }));
        assert!(err.to_string().contains(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_discover_without_file_uses_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = BuildConfig::discover(dir.path()).unwrap();
        assert_eq!(config.base_dir, dir.path());
        assert_eq!(config.scripts, BuildConfig::default().scripts);
    }
}

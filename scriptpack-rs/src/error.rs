use std::path::PathBuf;

/// Errors raised while configuring or running a build.
///
/// Every variant names the file, pattern or task it concerns so a failed run
/// can be diagnosed from the log alone.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Failed to resolve module graph for {path}: {source:#}")]
    Resolution {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid source map for {path}: {message}")]
    MapComposition { path: PathBuf, message: String },

    #[error("Invalid configuration file {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid glob pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Task `{0}` is not registered")]
    UnknownTask(String),

    #[error("Task `{0}` depends on itself")]
    TaskCycle(String),
}

impl BuildError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn map(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        BuildError::MapComposition {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

//! The bundle task.
//!
//! Every selected entry goes through the same steps, in order:
//! bundle → buffer → rename → source map init → source map and dest write.
//! Entries are processed one at a time and the first failure aborts the run.

use crate::bundler::{self, BundleOptions};
use crate::config::BuildConfig;
use crate::error::BuildError;
use crate::file::{FileRecord, RenameOptions};
use crate::select::{select_entries, Entry};
use crate::sourcemaps::{self, InitOptions, WriteOptions};
use futures::future::LocalBoxFuture;
use std::path::{Path, PathBuf};

/// Paths written for one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenBundle {
    pub entry: PathBuf,
    pub bundle: PathBuf,
    pub map: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct BuildSummary {
    pub outputs: Vec<WrittenBundle>,
}

/// Task action registered as `scripts`.
pub fn scripts_task(config: &BuildConfig) -> LocalBoxFuture<'_, Result<(), BuildError>> {
    Box::pin(async move {
        let summary = run_scripts(config).await?;
        log::info!("Bundled {} file(s)", summary.outputs.len());
        Ok(())
    })
}

pub async fn run_scripts(config: &BuildConfig) -> Result<BuildSummary, BuildError> {
    let cwd = std::path::absolute(&config.base_dir)
        .map_err(|err| BuildError::io(&config.base_dir, err))?;
    let entries = select_entries(&cwd, &config.scripts)?;
    if entries.is_empty() {
        log::warn!("No files matched {:?}", config.scripts);
    }

    let mut summary = BuildSummary::default();
    for entry in &entries {
        summary.outputs.push(process_entry(config, &cwd, entry).await?);
    }
    Ok(summary)
}

pub async fn process_entry(
    config: &BuildConfig,
    cwd: &Path,
    entry: &Entry,
) -> Result<WrittenBundle, BuildError> {
    let mut file = FileRecord::new(cwd, &entry.base, &entry.path);
    log::info!("bundling {}", file.path.display());

    // Bundle with debug annotations, then buffer the whole output.
    let emit = bundler::bundle(&file.path, bundle_options(config))
        .await
        .map_err(|source| BuildError::Resolution {
            path: entry.path.clone(),
            source,
        })?;
    file.contents = Some(emit.code.into_bytes());

    file.rename(&RenameOptions::suffix(config.suffix.as_str()));

    sourcemaps::init(
        &mut file,
        &InitOptions {
            load_maps: config.sourcemaps.load_maps,
        },
    )?;

    let dest = config.dest_dir();
    let map_file = sourcemaps::write(&mut file, &dest, &write_options(config))?;
    let map = match map_file {
        Some(map_file) => {
            let written = map_file.write_to(&dest)?;
            log::info!("wrote {}", written.display());
            Some(written)
        }
        None => None,
    };
    let bundle = file.write_to(&dest)?;
    log::info!("wrote {}", bundle.display());

    Ok(WrittenBundle {
        entry: entry.path.clone(),
        bundle,
        map,
    })
}

fn bundle_options(config: &BuildConfig) -> BundleOptions {
    BundleOptions {
        bundle_type: config.bundle_type,
        minify: config.minify,
        transpile_options: Default::default(),
    }
}

fn write_options(config: &BuildConfig) -> WriteOptions {
    WriteOptions {
        dest_path: config.sourcemaps.dest_path.clone(),
        include_content: config.sourcemaps.include_content,
        add_comment: config.sourcemaps.add_comment,
        source_root: config.sourcemaps.source_root.clone(),
    }
}

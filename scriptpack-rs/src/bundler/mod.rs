// Copyright 2018-2024 the Deno authors. All rights reserved. MIT license.
// Adapted from deno_emit 0.46.0

//! JavaScript bundler.
//!
//! Builds the module graph of a local entry file with deno_graph, then
//! bundles it with the SWC bundler into a single script:
//! 1. `loader` serves `file:` modules from disk
//! 2. `resolve` applies node-style resolution (extensions, `index`, `node_modules`)
//! 3. `emit` transpiles TypeScript/JSX/JSON modules, follows `require()` calls
//!    and generates code plus a source map
//! 4. `import_meta` replaces `import.meta` with an object literal

mod emit;
mod import_meta;
mod loader;
mod resolve;
mod text;

use anyhow::{anyhow, Result};
use deno_graph::BuildOptions;
use deno_graph::GraphKind;
use deno_graph::ModuleGraph;
use std::path::Path;

pub use emit::bundle_graph;
pub use emit::BundleEmit;
pub use emit::BundleOptions;
pub use emit::BundleType;
pub use loader::FsGraphLoader;
pub use resolve::{resolve_path, NodeStyleResolver};

pub use deno_ast::ModuleSpecifier;
pub use deno_ast::TranspileOptions;

/// Bundles the module graph rooted at `entry`.
pub async fn bundle(entry: &Path, options: BundleOptions) -> Result<BundleEmit> {
    let entry = std::path::absolute(entry)?;
    let root = ModuleSpecifier::from_file_path(&entry)
        .map_err(|_| anyhow!("Cannot convert {} to a module specifier", entry.display()))?;

    let loader = FsGraphLoader;
    let resolver = NodeStyleResolver;
    let mut graph = ModuleGraph::new(GraphKind::CodeOnly);
    graph
        .build(
            vec![root],
            vec![],
            &loader,
            BuildOptions {
                resolver: Some(resolver.as_resolver()),
                ..Default::default()
            },
        )
        .await;
    graph.valid()?;
    log::debug!(
        "Module graph of {} has {} module(s)",
        entry.display(),
        graph.modules().count()
    );

    bundle_graph(&graph, options)
}

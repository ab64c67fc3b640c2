//! Node-style module resolution on the local filesystem.
//!
//! Relative and absolute specifiers probe the exact path, then the known
//! extensions, then a directory's `package.json` `main` field and `index`
//! files. Bare specifiers are looked up in the `node_modules` directories of
//! the referrer and its ancestors.

use deno_ast::ModuleSpecifier;
use deno_graph::source::{ResolutionKind, ResolveError, Resolver};
use deno_graph::Range;
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths::normalize_path;

const EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "ts", "tsx", "jsx", "json"];

/// Resolves `specifier` imported from the file at `referrer`.
pub fn resolve_path(specifier: &str, referrer: &Path) -> Option<PathBuf> {
    let referrer_dir = referrer.parent().unwrap_or_else(|| Path::new("/"));

    if is_relative(specifier) || Path::new(specifier).is_absolute() {
        let candidate = normalize_path(&referrer_dir.join(specifier));
        return load_as_file(&candidate).or_else(|| load_as_directory(&candidate));
    }

    for dir in referrer_dir.ancestors() {
        if dir.file_name().is_some_and(|name| name == "node_modules") {
            continue;
        }
        let candidate = dir.join("node_modules").join(specifier);
        if let Some(found) = load_as_file(&candidate).or_else(|| load_as_directory(&candidate)) {
            return Some(found);
        }
    }
    None
}

fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

fn load_as_file(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    let file_name = path.file_name()?.to_string_lossy().into_owned();
    EXTENSIONS
        .iter()
        .map(|ext| path.with_file_name(format!("{file_name}.{ext}")))
        .find(|candidate| candidate.is_file())
}

fn load_as_directory(path: &Path) -> Option<PathBuf> {
    if !path.is_dir() {
        return None;
    }
    if let Some(main) = package_main(&path.join("package.json")) {
        let main = path.join(main);
        if let Some(found) = load_as_file(&main).or_else(|| load_index(&main)) {
            return Some(found);
        }
    }
    load_index(path)
}

fn load_index(dir: &Path) -> Option<PathBuf> {
    EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("index.{ext}")))
        .find(|candidate| candidate.is_file())
}

fn package_main(package_json: &Path) -> Option<String> {
    let text = fs::read_to_string(package_json).ok()?;
    let value: serde_json::Value = serde_json::from_str(&text).ok()?;
    value
        .get("main")
        .and_then(|main| main.as_str())
        .filter(|main| !main.is_empty())
        .map(str::to_string)
}

/// Resolves a specifier against a `file:` referrer, returning a `file:` URL.
pub fn resolve_specifier(specifier: &str, referrer: &ModuleSpecifier) -> Option<ModuleSpecifier> {
    if referrer.scheme() != "file" {
        return None;
    }
    let referrer_path = referrer.to_file_path().ok()?;
    let resolved = resolve_path(specifier, &referrer_path)?;
    ModuleSpecifier::from_file_path(resolved).ok()
}

/// Graph resolver: filesystem lookup first, plain URL resolution otherwise.
#[derive(Debug, Default)]
pub struct NodeStyleResolver;

impl NodeStyleResolver {
    pub fn as_resolver(&self) -> &dyn Resolver {
        self
    }
}

impl Resolver for NodeStyleResolver {
    fn resolve(
        &self,
        specifier: &str,
        referrer_range: &Range,
        _mode: ResolutionKind,
    ) -> Result<ModuleSpecifier, ResolveError> {
        if let Some(resolved) = resolve_specifier(specifier, &referrer_range.specifier) {
            return Ok(resolved);
        }
        deno_graph::resolve_import(specifier, &referrer_range.specifier).map_err(|err| err.into())
    }
}

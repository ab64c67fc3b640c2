//! Source map steps of the bundle task.
//!
//! [`init`] picks up the map a file already carries (the bundler's inline
//! map) and composes it with the maps of the original sources. [`write`]
//! rewrites the map for its output location and turns it into a separate
//! `.map` file record.

use crate::error::BuildError;
use crate::file::FileRecord;
use crate::paths::{normalize_path, relative_path};
use base64::Engine;
use deno_ast::ModuleSpecifier;
use regex::Regex;
use sourcemap::{SourceMap, SourceMapBuilder};
use std::collections::HashSet;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

lazy_static! {
    static ref SOURCE_MAPPING_URL_RE: Regex = Regex::new(
        r"(?m)^[ \t]*(?://[#@][ \t]+sourceMappingURL=([^\s'\x22]+)|/\*[#@][ \t]+sourceMappingURL=([^\s*'\x22]+)[ \t]*\*/)[ \t]*(?:\r?\n)?"
    )
    .unwrap();
}

/// Sentinel id the builder uses for tokens without a source.
const NO_SOURCE: u32 = !0;

#[derive(Debug, Clone, Copy)]
pub struct InitOptions {
    pub load_maps: bool,
}

#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Map directory relative to the output file.
    pub dest_path: String,
    pub include_content: bool,
    pub add_comment: bool,
    pub source_root: Option<String>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            dest_path: "./".to_string(),
            include_content: true,
            add_comment: true,
            source_root: None,
        }
    }
}

/// Location and URL of the last `sourceMappingURL` comment in `text`.
pub fn find_source_mapping_url(text: &str) -> Option<(Range<usize>, String)> {
    let caps = SOURCE_MAPPING_URL_RE.captures_iter(text).last()?;
    let whole = caps.get(0)?;
    let url = caps.get(1).or_else(|| caps.get(2))?;
    Some((whole.range(), url.as_str().to_string()))
}

/// Loads the map behind a `sourceMappingURL`. `data:` URLs are decoded in
/// place; anything else is read as a path relative to `dir`. A referenced
/// file that does not exist yields `None`.
fn load_map(url: &str, dir: Option<&Path>) -> Result<Option<SourceMap>, String> {
    let bytes = if let Some(data) = url.strip_prefix("data:") {
        let (header, payload) = data
            .split_once(',')
            .ok_or_else(|| "malformed data URL".to_string())?;
        if header.split(';').any(|part| part == "base64") {
            base64::prelude::BASE64_STANDARD
                .decode(payload)
                .map_err(|err| format!("invalid base64 payload: {err}"))?
        } else {
            payload.as_bytes().to_vec()
        }
    } else {
        let Some(dir) = dir else {
            return Ok(None);
        };
        let path = dir.join(url);
        match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("Source map {} referenced but not found", path.display());
                return Ok(None);
            }
            Err(err) => return Err(format!("{}: {err}", path.display())),
        }
    };
    SourceMap::from_slice(&bytes)
        .map(Some)
        .map_err(|err| err.to_string())
}

/// Attaches a source map to `file`.
///
/// With `load_maps`, an existing `sourceMappingURL` comment is removed from
/// the contents and its map is loaded and composed. Otherwise, or when there
/// is no such comment, the file gets a map with the file itself as the only
/// source and no mappings.
pub fn init(file: &mut FileRecord, options: &InitOptions) -> Result<(), BuildError> {
    let mut contents = file.contents_str()?.to_string();
    let mut loaded = None;

    if options.load_maps {
        if let Some((range, url)) = find_source_mapping_url(&contents) {
            let dir = file.original_path().parent().map(Path::to_path_buf);
            loaded = load_map(&url, dir.as_deref())
                .map_err(|msg| BuildError::map(file.original_path(), msg))?;
            if loaded.is_some() {
                contents.replace_range(range, "");
            }
        }
    }

    let map = match loaded {
        Some(map) => compose(&map).map_err(|msg| BuildError::map(file.original_path(), msg))?,
        None => empty_map(file, &contents),
    };
    file.contents = Some(contents.into_bytes());
    file.source_map = Some(map);
    Ok(())
}

fn empty_map(file: &FileRecord, contents: &str) -> SourceMap {
    let file_name = file.path.file_name().map(|n| n.to_string_lossy().into_owned());
    let mut builder = SourceMapBuilder::new(file_name.as_deref());
    let src_id = builder.add_source(&file.path.to_string_lossy());
    builder.set_source_contents(src_id, Some(contents));
    builder.into_sourcemap()
}

/// Resolves a source listed in a source's own map against that source.
fn resolve_inner_source(outer_source: &str, inner_source: &str) -> String {
    match ModuleSpecifier::parse(outer_source) {
        Ok(url) => url
            .join(inner_source)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| inner_source.to_string()),
        Err(_) => {
            let dir = Path::new(outer_source).parent().unwrap_or(Path::new(""));
            normalize_path(&dir.join(inner_source))
                .to_string_lossy()
                .into_owned()
        }
    }
}

/// Directory holding `source` when it names a local file.
fn source_dir(source: &str) -> Option<PathBuf> {
    let path = match ModuleSpecifier::parse(source) {
        Ok(url) if url.scheme() == "file" => url.to_file_path().ok()?,
        Ok(_) => return None,
        Err(_) => PathBuf::from(source),
    };
    path.parent().map(Path::to_path_buf)
}

/// Re-targets the mappings of `outer` through the maps its sources carry.
fn compose(outer: &SourceMap) -> Result<SourceMap, String> {
    let mut inner_maps: Vec<Option<SourceMap>> = Vec::new();
    for idx in 0..outer.get_source_count() {
        let source = outer.get_source(idx).unwrap_or_default();
        let inner = match outer
            .get_source_contents(idx)
            .and_then(find_source_mapping_url)
        {
            Some((_, url)) => load_map(&url, source_dir(source).as_deref())
                .map_err(|msg| format!("map of {source}: {msg}"))?,
            None => None,
        };
        inner_maps.push(inner);
    }
    if inner_maps.iter().all(Option::is_none) {
        return Ok(outer.clone());
    }

    let mut builder = SourceMapBuilder::new(outer.get_file());
    let mut with_contents: HashSet<u32> = HashSet::new();
    for token in outer.tokens() {
        let src_id = token.get_src_id();
        let inner = inner_maps.get(src_id as usize).and_then(Option::as_ref);
        let Some(inner) = inner else {
            let raw = builder.add(
                token.get_dst_line(),
                token.get_dst_col(),
                token.get_src_line(),
                token.get_src_col(),
                token.get_source(),
                token.get_name(),
                false,
            );
            if raw.src_id != NO_SOURCE && with_contents.insert(raw.src_id) {
                builder.set_source_contents(raw.src_id, outer.get_source_contents(src_id));
            }
            continue;
        };

        // Positions the inner map cannot account for are dropped.
        let Some(original) = inner.lookup_token(token.get_src_line(), token.get_src_col()) else {
            continue;
        };
        let outer_source = token.get_source().unwrap_or_default();
        let source = original
            .get_source()
            .map(|s| resolve_inner_source(outer_source, s));
        let raw = builder.add(
            token.get_dst_line(),
            token.get_dst_col(),
            original.get_src_line(),
            original.get_src_col(),
            source.as_deref(),
            original.get_name().or(token.get_name()),
            false,
        );
        if raw.src_id != NO_SOURCE && with_contents.insert(raw.src_id) {
            builder.set_source_contents(raw.src_id, inner.get_source_contents(original.get_src_id()));
        }
    }
    Ok(builder.into_sourcemap())
}

/// Writes the map of `file` as a separate record and points `file` at it.
///
/// `dest` is the directory `file` will be written to. Sources in the map
/// become paths relative to the map's own location. Returns `None` when the
/// file carries no map.
pub fn write(
    file: &mut FileRecord,
    dest: &Path,
    options: &WriteOptions,
) -> Result<Option<FileRecord>, BuildError> {
    let Some(map) = file.source_map.take() else {
        return Ok(None);
    };
    let dest = std::path::absolute(dest).map_err(|err| BuildError::io(dest, err))?;

    let relative = file.relative();
    let file_name = relative
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let out_path = normalize_path(&dest.join(&relative));
    let out_dir = out_path.parent().unwrap_or(dest.as_path()).to_path_buf();
    let map_rel = normalize_path(
        &relative
            .parent()
            .unwrap_or(Path::new(""))
            .join(&options.dest_path)
            .join(format!("{file_name}.map")),
    );
    let map_abs = normalize_path(&dest.join(&map_rel));
    let map_dir = map_abs.parent().unwrap_or(dest.as_path()).to_path_buf();

    let rewrite = |source: &str| -> String {
        let path = match ModuleSpecifier::parse(source) {
            Ok(url) if url.scheme() == "file" => url.to_file_path().ok(),
            Ok(_) => None,
            Err(_) if Path::new(source).is_absolute() => Some(PathBuf::from(source)),
            Err(_) => None,
        };
        match path {
            Some(path) => relative_path(&map_dir, &path),
            None => source.to_string(),
        }
    };

    let mut builder = SourceMapBuilder::new(Some(&file_name));
    if let Some(root) = &options.source_root {
        builder.set_source_root(Some(root.as_str()));
    }
    for idx in 0..map.get_source_count() {
        let Some(source) = map.get_source(idx) else {
            continue;
        };
        let src_id = builder.add_source(&rewrite(source));
        if options.include_content {
            builder.set_source_contents(src_id, map.get_source_contents(idx));
        }
    }
    for token in map.tokens() {
        let source = token.get_source().map(|s| rewrite(s));
        builder.add(
            token.get_dst_line(),
            token.get_dst_col(),
            token.get_src_line(),
            token.get_src_col(),
            source.as_deref(),
            token.get_name(),
            false,
        );
    }

    let mut json = Vec::new();
    builder
        .into_sourcemap()
        .to_writer(&mut json)
        .map_err(|err| BuildError::map(&file.path, err))?;

    if options.add_comment {
        let mut contents = file.contents_str()?.to_string();
        if !contents.is_empty() && !contents.ends_with('\n') {
            contents.push('\n');
        }
        contents.push_str("//# sourceMappingURL=");
        contents.push_str(&relative_path(&out_dir, &map_abs));
        file.contents = Some(contents.into_bytes());
    }

    let mut map_file = FileRecord::new(&file.cwd, &file.base, file.base.join(&map_rel));
    map_file.contents = Some(json);
    Ok(Some(map_file))
}

// Copyright 2018-2024 the Deno authors. All rights reserved. MIT license.

use base64::Engine;
use deno_ast::get_syntax;
use deno_ast::swc;
use deno_ast::swc::common::comments::SingleThreadedComments;
use deno_ast::swc::common::{FileName, Mark};
use deno_ast::swc::parser::lexer::Lexer;
use deno_ast::swc::parser::StringInput;
use deno_ast::Marks;
use deno_ast::MediaType;
use deno_ast::ModuleSpecifier;
use deno_ast::ParseDiagnostic;
use deno_ast::SourceMap;
use deno_ast::SourceTextInfo;
use deno_ast::TranspileOptions;
use deno_graph::{Module, ModuleGraph};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{anyhow, bail, Context, Result};

use super::import_meta::ImportMetaHook;
use super::resolve::resolve_specifier;
use super::text::{shebang, strip_bom, transform_json_source, transform_json_source_commonjs};

/// Output format of a bundle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleType {
    /// A plain script: the module graph runs inside an IIFE.
    #[default]
    Classic,
    /// One flattened ES module.
    Module,
}

impl From<BundleType> for swc::bundler::ModuleType {
    fn from(bundle_type: BundleType) -> Self {
        match bundle_type {
            BundleType::Classic => Self::Iife,
            BundleType::Module => Self::Es,
        }
    }
}

#[derive(Default)]
pub struct BundleOptions {
    pub bundle_type: BundleType,
    /// Compact codegen: no indentation or optional whitespace.
    pub minify: bool,
    pub transpile_options: TranspileOptions,
}

/// A bundled script. `code` always ends with an inline
/// `//# sourceMappingURL=data:...` comment whose map carries `sourcesContent`.
#[derive(Debug)]
pub struct BundleEmit {
    pub code: String,
}

const INLINE_MAP_PREFIX: &str = "//# sourceMappingURL=data:application/json;base64,";

struct GraphLoader<'a> {
    cm: &'a SourceMap,
    graph: &'a ModuleGraph,
    transpile_options: &'a TranspileOptions,
}

impl GraphLoader<'_> {
    /// Source text of `specifier`. Modules that are only `require()`d never
    /// enter the graph and are read from disk.
    fn source_of(&self, specifier: &ModuleSpecifier) -> Result<(String, MediaType)> {
        match self.graph.get(specifier) {
            Some(Module::Js(m)) => Ok((m.source.text.to_string(), m.media_type)),
            Some(Module::Json(m)) => Ok((m.source.text.to_string(), m.media_type)),
            Some(other) => bail!("{} is not a local script module", other.specifier()),
            None => {
                let path = specifier
                    .to_file_path()
                    .map_err(|_| anyhow!("{} is not a local file", specifier))?;
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("Unable to read {}", path.display()))?;
                match MediaType::from_specifier(specifier) {
                    MediaType::Json => Ok((
                        transform_json_source_commonjs(strip_bom(&text)),
                        MediaType::JavaScript,
                    )),
                    media_type => Ok((text, media_type)),
                }
            }
        }
    }
}

impl swc::bundler::Load for GraphLoader<'_> {
    fn load(&self, file_name: &FileName) -> Result<swc::bundler::ModuleData> {
        let FileName::Url(specifier) = file_name else {
            bail!("Cannot load {:?}: only URLs are supported", file_name);
        };
        let (text, media_type) = self.source_of(specifier)?;
        let (fm, module) =
            parse_module(specifier, &text, media_type, self.transpile_options, self.cm)
                .with_context(|| format!("Unable to parse {}", specifier))?;
        Ok(swc::bundler::ModuleData {
            fm,
            module,
            helpers: Default::default(),
        })
    }
}

struct GraphResolver<'a>(&'a ModuleGraph);

impl swc::bundler::Resolve for GraphResolver<'_> {
    fn resolve(
        &self,
        referrer: &FileName,
        specifier: &str,
    ) -> Result<swc::loader::resolve::Resolution> {
        let FileName::Url(referrer) = referrer else {
            bail!("Cannot resolve \"{}\" from {:?}", specifier, referrer);
        };
        // `require()` targets are not graph dependencies.
        let resolved = match self.0.resolve_dependency(specifier, referrer, false) {
            Some(resolved) => resolved.clone(),
            None => resolve_specifier(specifier, referrer)
                .ok_or_else(|| anyhow!("Cannot resolve \"{}\" from {}", specifier, referrer))?,
        };
        Ok(swc::loader::resolve::Resolution {
            filename: FileName::Url(resolved),
            slug: None,
        })
    }
}

/// Bundles every module reachable from the graph's first root into one
/// script with an inline source map.
pub fn bundle_graph(graph: &ModuleGraph, options: BundleOptions) -> Result<BundleEmit> {
    let root = graph
        .roots
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("Module graph has no root"))?;

    let globals = swc::common::Globals::new();
    swc::common::GLOBALS.set(&globals, || {
        let cm = SourceMap::default();
        let module = link_modules(&globals, &cm, graph, &root, &options)?;
        let (generated, mut srcmap) = generate_code(&cm, &module, options.minify)?;

        let mut code = String::new();
        let root_text = graph.get(&root).and_then(|m| m.js()).map(|m| &m.source.text);
        if let Some(line) = root_text.and_then(|text| shebang(text)) {
            code.push_str(line);
            code.push('\n');
            for (_, line_col) in srcmap.iter_mut() {
                line_col.line += 1;
            }
        }
        code.push_str(&generated);
        if !code.ends_with('\n') {
            code.push('\n');
        }

        let mut map = Vec::new();
        let map_config = deno_ast::SourceMapConfig {
            inline_sources: true,
            maybe_base: None,
        };
        cm.inner()
            .build_source_map(&srcmap, None, map_config)
            .to_writer(&mut map)?;
        code.push_str(INLINE_MAP_PREFIX);
        base64::prelude::BASE64_STANDARD.encode_string(map, &mut code);
        code.push('\n');

        Ok(BundleEmit { code })
    })
}

/// Runs the SWC bundler and returns the single linked module.
fn link_modules(
    globals: &swc::common::Globals,
    cm: &SourceMap,
    graph: &ModuleGraph,
    root: &ModuleSpecifier,
    options: &BundleOptions,
) -> Result<swc::ast::Module> {
    let loader = GraphLoader {
        cm,
        graph,
        transpile_options: &options.transpile_options,
    };
    let config = swc::bundler::Config {
        module: options.bundle_type.into(),
        require: true,
        // Graph modules that are not local scripts stay as imports.
        external_modules: graph
            .modules()
            .filter(|m| !matches!(m, Module::Js(_) | Module::Json(_)))
            .map(|m| m.specifier().to_string().into())
            .collect(),
        ..Default::default()
    };
    let mut bundler = swc::bundler::Bundler::new(
        globals,
        cm.inner().clone(),
        loader,
        GraphResolver(graph),
        config,
        Box::new(ImportMetaHook),
    );

    let mut entries = HashMap::new();
    entries.insert("bundle".to_string(), FileName::Url(root.clone()));
    let bundles = bundler
        .bundle(entries)
        .with_context(|| format!("Unable to bundle {}", root))?;
    match bundles.into_iter().next() {
        Some(bundle) => Ok(bundle.module),
        None => bail!("Bundling {} produced no output", root),
    }
}

type RawMappings = Vec<(swc::common::BytePos, swc::common::LineCol)>;

fn generate_code(
    cm: &SourceMap,
    module: &swc::ast::Module,
    minify: bool,
) -> Result<(String, RawMappings)> {
    let mut buf = Vec::new();
    let mut srcmap = Vec::new();
    {
        // Config is #[non_exhaustive]
        let mut cfg = swc::codegen::Config::default();
        cfg.minify = minify;
        cfg.target = deno_ast::ES_VERSION;
        let wr = Box::new(swc::codegen::text_writer::JsWriter::new(
            cm.inner().clone(),
            "\n",
            &mut buf,
            Some(&mut srcmap),
        ));
        let mut emitter = swc::codegen::Emitter {
            cfg,
            cm: cm.inner().clone(),
            comments: None,
            wr,
        };
        emitter
            .emit_module(module)
            .context("Unable to generate bundle code")?;
    }
    let code = String::from_utf8(buf).context("Generated code is not valid UTF-8")?;
    Ok((code, srcmap))
}

/// Parses one module and lowers TypeScript/JSX to plain JavaScript.
fn parse_module(
    specifier: &ModuleSpecifier,
    text: &str,
    media_type: MediaType,
    options: &TranspileOptions,
    cm: &SourceMap,
) -> Result<(Rc<swc::common::SourceFile>, swc::ast::Module)> {
    let (text, media_type) = match media_type {
        MediaType::Json => (transform_json_source(strip_bom(text)), MediaType::JavaScript),
        other => (strip_bom(text).to_string(), other),
    };
    let source_file = cm.new_source_file(specifier.clone(), text);
    let info = SourceTextInfo::from_string(source_file.src.to_string());
    let comments = SingleThreadedComments::default();
    let lexer = Lexer::new(
        get_syntax(media_type),
        deno_ast::ES_VERSION,
        StringInput::from(&*source_file),
        Some(&comments),
    );
    let mut parser = swc::parser::Parser::new_from(lexer);
    let module = parser
        .parse_module()
        .map_err(|e| ParseDiagnostic::from_swc_error(e, specifier, info.clone()))?;
    let diagnostics: Vec<_> = parser
        .take_errors()
        .into_iter()
        .map(|e| ParseDiagnostic::from_swc_error(e, specifier, info.clone()))
        .collect();

    let marks = Marks {
        top_level: Mark::fresh(Mark::root()),
        unresolved: Mark::new(),
    };
    let program = deno_ast::fold_program(
        swc::ast::Program::Module(module),
        options,
        cm,
        &comments,
        &marks,
        Box::new(diagnostics.iter()),
    )?;
    match program {
        swc::ast::Program::Module(module) => Ok((source_file, module)),
        swc::ast::Program::Script(_) => bail!("{} did not transpile to a module", specifier),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_type_serde_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            bundle_type: BundleType,
        }
        let w: Wrapper = toml::from_str("bundle_type = \"module\"").unwrap();
        assert_eq!(w.bundle_type, BundleType::Module);
        let w: Wrapper = toml::from_str("bundle_type = \"classic\"").unwrap();
        assert_eq!(w.bundle_type, BundleType::Classic);
        assert!(toml::from_str::<Wrapper>("bundle_type = \"iife\"").is_err());
    }

    #[test]
    fn test_bundle_type_module_kinds() {
        assert!(matches!(
            swc::bundler::ModuleType::from(BundleType::Classic),
            swc::bundler::ModuleType::Iife
        ));
        assert!(matches!(
            swc::bundler::ModuleType::from(BundleType::Module),
            swc::bundler::ModuleType::Es
        ));
    }

    #[test]
    fn test_parse_module_strips_types() {
        let specifier = ModuleSpecifier::parse("file:///src/math.ts").unwrap();
        let cm = SourceMap::default();
        let globals = swc::common::Globals::new();
        let module = swc::common::GLOBALS.set(&globals, || {
            parse_module(
                &specifier,
                "export const n: number = 1;\n",
                MediaType::TypeScript,
                &TranspileOptions::default(),
                &cm,
            )
        });
        let (fm, module) = module.unwrap();
        assert!(fm.src.contains(": number"));
        assert_eq!(module.body.len(), 1);
    }

    #[test]
    fn test_parse_module_reports_syntax_errors() {
        let specifier = ModuleSpecifier::parse("file:///src/broken.js").unwrap();
        let cm = SourceMap::default();
        let globals = swc::common::Globals::new();
        let result = swc::common::GLOBALS.set(&globals, || {
            parse_module(
                &specifier,
                "function ( {",
                MediaType::JavaScript,
                &TranspileOptions::default(),
                &cm,
            )
        });
        assert!(result.is_err());
    }
}

//! `import.meta` for bundled modules.

use deno_ast::swc::ast::{Bool, Expr, KeyValueProp, Lit, PropName, Str};
use deno_ast::swc::bundler::{Hook, ModuleRecord};
use deno_ast::swc::common::Span;

/// Replaces `import.meta` with a plain object literal. Classic bundles are
/// scripts, where `import.meta` is a syntax error.
///
/// `url` is the module's original `file:` URL and `main` is true only for
/// the entry module.
pub struct ImportMetaHook;

impl Hook for ImportMetaHook {
    fn get_import_meta_props(
        &self,
        span: Span,
        module_record: &ModuleRecord,
    ) -> Result<Vec<KeyValueProp>, anyhow::Error> {
        let url = Lit::Str(Str {
            span,
            value: module_record.file_name.to_string().into(),
            raw: None,
        });
        let main = Lit::Bool(Bool {
            span,
            value: module_record.is_entry,
        });
        Ok(vec![meta_prop("url", url), meta_prop("main", main)])
    }
}

fn meta_prop(key: &'static str, value: Lit) -> KeyValueProp {
    KeyValueProp {
        key: PropName::Ident(key.into()),
        value: Box::new(Expr::Lit(value)),
    }
}

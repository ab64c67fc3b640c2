//! Module loader that serves `file:` specifiers from disk.

use deno_graph::source::{LoadError, LoadFuture, LoadOptions, LoadResponse, Loader};
use deno_graph::ModuleSpecifier;
use std::io;
use std::sync::Arc;

/// Loader for building the module graph of local entry files.
///
/// Missing files load as `None` so the graph reports them as unresolved
/// modules with the importing range attached.
#[derive(Debug, Default)]
pub struct FsGraphLoader;

impl FsGraphLoader {
    fn load_module(&self, specifier: &ModuleSpecifier) -> Result<Option<Vec<u8>>, io::Error> {
        if specifier.scheme() != "file" {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("Only local modules can be bundled: {}", specifier),
            ));
        }
        let path = specifier.to_file_path().map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Invalid file URL: {}", specifier),
            )
        })?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
}

impl Loader for FsGraphLoader {
    fn load(&self, specifier: &ModuleSpecifier, _options: LoadOptions) -> LoadFuture {
        let specifier = specifier.clone();
        let result = self.load_module(&specifier);

        Box::pin(async move {
            match result {
                Ok(Some(content)) => Ok(Some(LoadResponse::Module {
                    specifier,
                    maybe_headers: None,
                    content: Arc::from(content),
                    mtime: None,
                })),
                Ok(None) => Ok(None),
                Err(e) => Err(LoadError::Other(Arc::new(e))),
            }
        })
    }
}

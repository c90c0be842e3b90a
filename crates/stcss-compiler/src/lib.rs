//! Compiler core for stcss stylesheets.
//!
//! This crate provides:
//! - A symbol table builder for one stylesheet ([`process_source`])
//! - A resolver that follows imports, aliases and `-st-extends` across files
//! - Variable and custom value evaluation with cycle detection
//! - The transformer producing scoped CSS and an export map
//!
//! # Example
//!
//! ```
//! use stcss_compiler::{MemoryFileSystem, ProcessOptions, Stylable, TransformOptions};
//!
//! let fs = MemoryFileSystem::with_files([(
//!     "/button.st.css",
//!     ":vars { color: red; } .root { color: value(color); } .icon {}",
//! )]);
//! let stylable = Stylable::new(fs, ProcessOptions::default(), TransformOptions::default());
//! let result = stylable.transform_file("/button.st.css").unwrap();
//! assert_eq!(result.exports.get_str("color"), Some("red"));
//! assert!(result.css.contains("color: red;"));
//! ```

mod cache;
mod computed;
mod custom_values;
mod directives;
mod exports;
mod host;
mod js;
mod meta;
mod mixins;
mod namespace;
mod native;
mod processor;
mod resolver;
mod scoping;
mod states;
mod transform;
mod values;

pub use cache::StylesheetCache;
pub use computed::{flatten, get_computed, ComputedVar, FlatVar};
pub use custom_values::{
    ArgResolver, BoxValue, CustomBox, CustomValueError, CustomValueExtension,
    CustomValueRegistry, Evaluated, StArray, StMap,
};
pub use exports::{unescape_css, ExportValue, Exports};
pub use host::{
    normalize_path, resolve_request, FileProcessor, FileSystem, HostError, MemoryFileSystem,
    ModuleHost, OsFileSystem,
};
pub use js::{JsFunction, JsValue};
pub use meta::*;
pub use namespace::{default_namespace, is_valid_namespace, namespace_from_path, NamespaceResolver};
pub use native::{
    is_component_element, is_native_pseudo_class, is_native_pseudo_element, is_vendor_prefixed,
};
pub use processor::{process_source, process_stylesheet, ProcessOptions};
pub use resolver::{
    CssResolve, JsResolve, ResolveError, Resolved, StylableResolver, VisitedSymbols,
};
pub use scoping::{add_root_prefix, ScopedSelector};
pub use states::{state_attribute, state_selector, validate_state, StateIssue};
pub use transform::{StylableTransformer, TransformOptions, TransformResult};
pub use values::{HookTarget, ReplaceValueHook, ValueEvaluator, VarOverrides};

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use smol_str::SmolStr;
use std::rc::Rc;

/// A host, transform options and custom value types bundled together.
pub struct Stylable<F: FileSystem = OsFileSystem> {
    host: FileProcessor<F>,
    options: TransformOptions,
    registry: CustomValueRegistry,
}

impl<F: FileSystem> Stylable<F> {
    pub fn new(fs: F, process: ProcessOptions, options: TransformOptions) -> Self {
        Self {
            host: FileProcessor::new(fs, process),
            options,
            registry: CustomValueRegistry::new(),
        }
    }

    pub fn host(&self) -> &FileProcessor<F> {
        &self.host
    }

    /// Custom value types available to every stylesheet.
    pub fn registry_mut(&mut self) -> &mut CustomValueRegistry {
        &mut self.registry
    }

    /// Makes `value` the exports of the module at `path`.
    pub fn register_module(&self, path: impl Into<Utf8PathBuf>, value: JsValue) {
        self.host.register_module(path, value);
    }

    /// Returns the symbol table of a stylesheet.
    pub fn process(&self, path: impl AsRef<Utf8Path>) -> Result<Rc<StylableMeta>, HostError> {
        self.host.process(path.as_ref())
    }

    /// Processes and transforms a stylesheet.
    pub fn transform_file(&self, path: impl AsRef<Utf8Path>) -> Result<TransformResult, HostError> {
        let meta = self.process(path)?;
        Ok(self.transformer().transform(&meta))
    }

    /// Computed values of a stylesheet's variables.
    pub fn computed(
        &self,
        path: impl AsRef<Utf8Path>,
    ) -> Result<IndexMap<SmolStr, ComputedVar>, HostError> {
        let meta = self.process(path)?;
        Ok(get_computed(
            StylableResolver::new(&self.host),
            &self.registry,
            &meta,
        ))
    }

    /// Flattened variable leaves of a stylesheet.
    pub fn flat_vars(&self, path: impl AsRef<Utf8Path>) -> Result<Vec<FlatVar>, HostError> {
        let meta = self.process(path)?;
        Ok(flatten(
            StylableResolver::new(&self.host),
            &self.registry,
            &meta,
        ))
    }

    fn transformer(&self) -> StylableTransformer<'_> {
        StylableTransformer::new(&self.host, self.options.clone()).with_registry(self.registry.clone())
    }
}

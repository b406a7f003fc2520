//! Named extensions and the modules that provide them.
//!
//! Custom formatters, runners and differs are referred to by name on the
//! command line. A name is only accepted once a module registering it has
//! been loaded with `--require`.

use crate::error::{Error, Result};
use crate::fs::FileSystem;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExtensionKind {
    Formatter,
    Runner,
    Differ,
}

impl ExtensionKind {
    pub fn describe(self) -> &'static str {
        match self {
            ExtensionKind::Formatter => "formatter",
            ExtensionKind::Runner => "runner",
            ExtensionKind::Differ => "differ",
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct Extensions {
    names: BTreeSet<(ExtensionKind, String)>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: ExtensionKind, name: impl Into<String>) {
        self.names.insert((kind, name.into()));
    }

    pub fn contains(&self, kind: ExtensionKind, name: &str) -> bool {
        self.names.contains(&(kind, name.to_string()))
    }

    pub fn names(&self, kind: ExtensionKind) -> impl Iterator<Item = &str> {
        self.names
            .iter()
            .filter(move |(k, _)| *k == kind)
            .map(|(_, name)| name.as_str())
    }
}

/// Loads one `--require` entry. Called once per entry, in command-line order.
pub trait ModuleLoader {
    fn require(
        &mut self,
        module: &str,
        fs: &dyn FileSystem,
        extensions: &mut Extensions,
    ) -> Result<()>;
}

pub type ModuleInit = fn(&mut Extensions);

/// Compiled-in modules keyed by name. Names without a registered module are
/// accepted when they name an existing file, which the execution engine
/// loads later.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<String, ModuleInit>,
    loaded: BTreeSet<String>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, name: impl Into<String>, init: ModuleInit) -> Self {
        self.modules.insert(name.into(), init);
        self
    }

    pub fn loaded(&self) -> impl Iterator<Item = &str> {
        self.loaded.iter().map(String::as_str)
    }
}

impl ModuleLoader for ModuleRegistry {
    fn require(
        &mut self,
        module: &str,
        fs: &dyn FileSystem,
        extensions: &mut Extensions,
    ) -> Result<()> {
        // Requiring twice is a no-op, same as loading a file twice.
        if self.loaded.contains(module) {
            return Ok(());
        }

        if let Some(init) = self.modules.get(module) {
            init(extensions);
        } else if !fs.exists(Path::new(module)) {
            return Err(Error::Require(module.to_string()));
        }

        tracing::debug!(module, "required module");
        self.loaded.insert(module.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::OsFileSystem;
    use std::fs;
    use tempfile::TempDir;

    fn register_custom(extensions: &mut Extensions) {
        extensions.register(ExtensionKind::Formatter, "CustomFormatter");
        extensions.register(ExtensionKind::Runner, "CustomRunner");
    }

    #[test]
    fn test_named_module_registers_extensions() {
        let tmp = TempDir::new().unwrap();
        let fs = OsFileSystem::new(tmp.path());
        let mut registry = ModuleRegistry::new().with_module("custom", register_custom);
        let mut extensions = Extensions::new();

        registry.require("custom", &fs, &mut extensions).unwrap();

        assert!(extensions.contains(ExtensionKind::Formatter, "CustomFormatter"));
        assert!(extensions.contains(ExtensionKind::Runner, "CustomRunner"));
        assert!(!extensions.contains(ExtensionKind::Differ, "CustomRunner"));
        assert_eq!(registry.loaded().collect::<Vec<_>>(), vec!["custom"]);
    }

    #[test]
    fn test_existing_file_is_accepted() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("helper.rb"), "").unwrap();
        let fs = OsFileSystem::new(tmp.path());
        let mut registry = ModuleRegistry::new();
        let mut extensions = Extensions::new();

        registry.require("helper.rb", &fs, &mut extensions).unwrap();
        assert_eq!(extensions.names(ExtensionKind::Formatter).count(), 0);
    }

    #[test]
    fn test_unknown_module_fails() {
        let tmp = TempDir::new().unwrap();
        let fs = OsFileSystem::new(tmp.path());
        let mut registry = ModuleRegistry::new();
        let mut extensions = Extensions::new();

        let err = registry
            .require("nowhere", &fs, &mut extensions)
            .unwrap_err();
        assert_eq!(err.to_string(), "no such file to load -- nowhere");
    }
}

//! Module resolution and loading seams, plus the in-process registry that
//! implements both.

use super::reference::{HookReference, ModuleLocation};
use super::value::ExportedValue;
use anyhow::{anyhow, Result};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Turns a configured reference into a loadable location.
pub trait HookResolver: Send + Sync {
    /// `config_dir` is the directory of the configuration file; relative paths
    /// and package lookups are rooted there.
    fn resolve(&self, reference: &HookReference, config_dir: &Path) -> Result<ModuleLocation>;
}

/// Loads a resolved module and exposes its exported value.
pub trait HookLoader: Send + Sync {
    fn load<'a>(&'a self, location: &'a ModuleLocation) -> BoxFuture<'a, Result<ExportedValue>>;
}

/// Hook modules registered in-process, keyed by absolute path or package name.
#[derive(Debug, Default, Clone)]
pub struct HookRegistry {
    files: HashMap<PathBuf, ExportedValue>,
    packages: HashMap<String, ExportedValue>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a module file under its normalized absolute path. Relative
    /// paths are anchored at `/`.
    pub fn register_file(
        &mut self,
        path: impl Into<PathBuf>,
        value: impl Into<ExportedValue>,
    ) -> &mut Self {
        let location = ModuleLocation::file(Path::new("/"), &path.into());
        if let ModuleLocation::File(path) = location {
            self.files.insert(path, value.into());
        }
        self
    }

    pub fn register_package(
        &mut self,
        name: impl Into<String>,
        value: impl Into<ExportedValue>,
    ) -> &mut Self {
        self.packages.insert(name.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.files.len() + self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HookResolver for HookRegistry {
    fn resolve(&self, reference: &HookReference, config_dir: &Path) -> Result<ModuleLocation> {
        match reference {
            HookReference::Path(path) => {
                let location = ModuleLocation::file(config_dir, path);
                match &location {
                    ModuleLocation::File(resolved) if self.files.contains_key(resolved) => {
                        Ok(location)
                    }
                    _ => Err(anyhow!(
                        "module {} not found (resolved from {})",
                        location,
                        config_dir.display()
                    )),
                }
            }
            HookReference::Package(name) => {
                if self.packages.contains_key(name) {
                    Ok(ModuleLocation::Package(name.clone()))
                } else {
                    Err(anyhow!(
                        "cannot find package {name} from {}",
                        config_dir.display()
                    ))
                }
            }
        }
    }
}

impl HookLoader for HookRegistry {
    fn load<'a>(&'a self, location: &'a ModuleLocation) -> BoxFuture<'a, Result<ExportedValue>> {
        Box::pin(async move {
            let value = match location {
                ModuleLocation::File(path) => self.files.get(path),
                ModuleLocation::Package(name) => self.packages.get(name),
            };
            value
                .cloned()
                .ok_or_else(|| anyhow!("module {location} is not registered"))
        })
    }
}

use anyhow::{bail, Result};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

/// A configured `globalSetup`/`globalTeardown` entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HookReference {
    Path(PathBuf),
    Package(String),
}

impl HookReference {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            bail!("hook reference cannot be empty");
        }

        if is_path_like(raw) {
            Ok(HookReference::Path(PathBuf::from(raw)))
        } else {
            Ok(HookReference::Package(raw.to_owned()))
        }
    }

    pub fn path(path: impl Into<PathBuf>) -> Self {
        HookReference::Path(path.into())
    }

    pub fn package(name: impl Into<String>) -> Self {
        HookReference::Package(name.into())
    }
}

fn is_path_like(raw: &str) -> bool {
    raw == "."
        || raw == ".."
        || raw.starts_with("./")
        || raw.starts_with("../")
        || raw.starts_with(".\\")
        || raw.starts_with("..\\")
        || Path::new(raw).is_absolute()
}

impl FromStr for HookReference {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for HookReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookReference::Path(path) => write!(f, "{}", path.display()),
            HookReference::Package(name) => f.write_str(name),
        }
    }
}

/// Where a resolved hook module lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModuleLocation {
    File(PathBuf),
    Package(String),
}

impl ModuleLocation {
    /// Anchors a path reference at `base` and normalizes `.`/`..` lexically.
    pub fn file(base: &Path, path: &Path) -> Self {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        };
        ModuleLocation::File(normalize(&joined))
    }
}

impl fmt::Display for ModuleLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleLocation::File(path) => write!(f, "{}", path.display()),
            ModuleLocation::Package(name) => f.write_str(name),
        }
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

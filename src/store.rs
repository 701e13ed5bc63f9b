// Copyright (c) 2017-2025 ETH Zurich
// Fabian Schuiki <fschuiki@iis.ee.ethz.ch>

//! The on-disk install store.
//!
//! Packages live under the install root as `<name>/<version>/` trees. A
//! version directory is only considered installed while it carries a
//! readable `.olut/metadata.yaml`. The optional `current` symlink selects
//! one version per package.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::archive::METADATA_NAME;
use crate::debugln;
use crate::error::*;
use crate::metadata::Metadata;

/// The install store rooted at an install path.
pub struct Store<'sess> {
    root: &'sess Path,
}

impl<'sess> Store<'sess> {
    /// Create a store on an install root.
    pub fn new(root: &'sess Path) -> Store<'sess> {
        Store { root }
    }

    /// The directory of a package.
    pub fn package_path(&self, pkg: &str) -> PathBuf {
        self.root.join(pkg)
    }

    /// The directory of a package version.
    pub fn version_path(&self, pkg: &str, version: &str) -> PathBuf {
        self.root.join(pkg).join(version)
    }

    /// The `current` symlink of a package.
    pub fn current_path(&self, pkg: &str) -> PathBuf {
        self.package_path(pkg).join("current")
    }

    /// The persisted metadata document of a package version.
    pub fn metadata_path(&self, pkg: &str, version: &str) -> PathBuf {
        self.version_path(pkg, version).join(METADATA_NAME)
    }

    /// The hook script of a package version.
    pub fn hook_path(&self, pkg: &str, version: &str, hook: &str) -> PathBuf {
        self.version_path(pkg, version).join(".olut").join(hook)
    }

    /// All package names under the install root.
    pub fn list_packages(&self) -> Result<Vec<String>> {
        let mut packages = Vec::new();
        let entries = match fs::read_dir(self.root) {
            Ok(entries) => entries,
            // A missing root simply has nothing installed.
            Err(_) => return Ok(packages),
        };
        for entry in entries {
            let entry = entry
                .map_err(|cause| Error::chain(format!("Cannot read {:?}.", self.root), cause))?;
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            if name.starts_with('.') || !entry.path().is_dir() {
                continue;
            }
            packages.push(name);
        }
        packages.sort();
        Ok(packages)
    }

    /// All installed versions of a package with their metadata, newest first.
    ///
    /// Sorted descending by `install_date`; ties are broken by lexical
    /// version. Directories without a readable metadata document are treated
    /// as not installed.
    pub fn list_versions(&self, pkg: &str) -> Result<Vec<(String, Metadata)>> {
        let mut versions = Vec::new();
        let dir = self.package_path(pkg);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => return Ok(versions),
        };
        for entry in entries {
            let entry =
                entry.map_err(|cause| Error::chain(format!("Cannot read {:?}.", dir), cause))?;
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            let file_type = entry
                .file_type()
                .map_err(|cause| Error::chain(format!("Cannot stat {:?}.", entry.path()), cause))?;
            if name.starts_with('.') || file_type.is_symlink() || !file_type.is_dir() {
                continue;
            }
            let meta_path = self.metadata_path(pkg, &name);
            let meta = match File::open(&meta_path).map_err(Error::from).and_then(Metadata::load) {
                Ok(meta) => meta,
                Err(cause) => {
                    debugln!("store: skipping {:?}: {}", meta_path, cause);
                    continue;
                }
            };
            versions.push((name, meta));
        }
        versions.sort_by(|a, b| {
            let date_a = a.1.get_str("install_date").unwrap_or("");
            let date_b = b.1.get_str("install_date").unwrap_or("");
            date_b.cmp(date_a).then_with(|| b.0.cmp(&a.0))
        });
        Ok(versions)
    }

    /// The current version of a package, if any.
    ///
    /// Resolves the `current` symlink via realpath; a missing or unresolvable
    /// link yields `None`.
    pub fn current(&self, pkg: &str) -> Option<String> {
        let real = fs::canonicalize(self.current_path(pkg)).ok()?;
        let name = real.file_name()?.to_str()?.to_string();
        if name == "current" { None } else { Some(name) }
    }
}

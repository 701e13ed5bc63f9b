// Copyright (c) 2017-2025 ETH Zurich
// Fabian Schuiki <fschuiki@iis.ee.ethz.ch>

//! The package lifecycle.
//!
//! Each (package, version) pair moves through a small state machine:
//! `Absent` → install → `Installed` → activate → `Active`, with deactivate
//! returning to `Installed` and uninstall only permitted from `Installed`.
//! At most one version per package is `Active`, selected by the `current`
//! symlink. State is read through from disk at operation entry and written
//! through by the transitions themselves.

use std::env;
use std::fs;
use std::io;
use std::os::unix::fs::symlink;
use std::path::Path;
use std::process::Command as SysCommand;

use chrono::Local;

use crate::archive;
use crate::error::*;
use crate::metadata::Metadata;
use crate::resolver;
use crate::sess::Session;
use crate::store::Store;
use crate::{debugln, errorln, noteln, warnln};

/// The lifecycle state of a package version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// The version is not installed.
    Absent,
    /// The version is installed but not selected as current.
    Installed,
    /// The version is installed and selected as current.
    Active,
}

/// Orchestrates lifecycle transitions on the install store.
pub struct Lifecycle<'sess> {
    sess: &'sess Session,
    store: Store<'sess>,
}

impl<'sess> Lifecycle<'sess> {
    /// Create a lifecycle controller on the session's install store.
    pub fn new(sess: &'sess Session) -> Lifecycle<'sess> {
        Lifecycle {
            sess,
            store: Store::new(&sess.install_path),
        }
    }

    /// The underlying install store.
    pub fn store(&self) -> &Store<'sess> {
        &self.store
    }

    /// Read the on-disk state of a package version.
    pub fn state_of(&self, pkg: &str, version: &str) -> State {
        if self.store.current(pkg).as_deref() == Some(version) {
            return State::Active;
        }
        if self.store.metadata_path(pkg, version).is_file() {
            return State::Installed;
        }
        State::Absent
    }

    /// Install an archive into the store.
    ///
    /// Extraction is not atomic: a failure mid-way leaves a partial version
    /// directory behind that has to be cleaned up by hand.
    pub fn install(&self, pkgpath: &Path, activate: bool) -> Result<()> {
        fs::create_dir_all(&self.sess.install_path).map_err(|cause| {
            Error::chain(
                format!("Cannot create install root {:?}.", self.sess.install_path),
                cause,
            )
        })?;

        let mut meta = archive::read_metadata(pkgpath)?;
        meta.merge(&self.sess.overrides);
        meta.set(
            "install_date",
            Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        );
        let name = meta.ident("name")?;
        let version = meta.ident("version")?;

        if self.state_of(&name, &version) != State::Absent {
            return Err(Error::AlreadyInstalled { pkg: name, version });
        }
        let target = self.store.version_path(&name, &version);
        fs::create_dir_all(self.store.package_path(&name)).map_err(|cause| {
            Error::chain(
                format!("Cannot create {:?}.", self.store.package_path(&name)),
                cause,
            )
        })?;
        match fs::create_dir(&target) {
            Ok(()) => (),
            Err(cause) if cause.kind() == io::ErrorKind::AlreadyExists => {
                return Err(Error::AlreadyInstalled { pkg: name, version });
            }
            Err(cause) => {
                return Err(Error::chain(format!("Cannot create {:?}.", target), cause));
            }
        }

        let rejected = archive::extract(pkgpath, &target)?;
        if !rejected.is_empty() {
            debugln!("install: skipped {} unsafe entries", rejected.len());
        }

        // The merged document, not the archived one, is authoritative on disk.
        let meta_path = self.store.metadata_path(&name, &version);
        fs::create_dir_all(target.join(".olut"))
            .map_err(|cause| Error::chain(format!("Cannot create {:?}.", meta_path), cause))?;
        let file = fs::File::create(&meta_path)
            .map_err(|cause| Error::chain(format!("Cannot create {:?}.", meta_path), cause))?;
        meta.dump(file)?;

        self.run_hook(&name, &version, "install", &meta)?;
        noteln!("installed {} {}", name, version);
        if activate {
            self.activate(&name, &version, true)?;
        }
        Ok(())
    }

    /// Uninstall every version a specifier resolves to.
    ///
    /// Refuses to touch anything while the selection includes the active
    /// version. A specifier matching nothing is a silent no-op.
    pub fn uninstall(&self, pkg: &str, spec: &str) -> Result<Vec<String>> {
        let versions: Vec<String> = self
            .store
            .list_versions(pkg)?
            .into_iter()
            .map(|(v, _)| v)
            .collect();
        let current = self.store.current(pkg);
        let selected = resolver::resolve(&self.store, pkg, spec, &versions, current.as_deref())?;
        if let Some(active) = selected
            .iter()
            .find(|v| Some(v.as_str()) == current.as_deref())
        {
            return Err(Error::UninstallActive {
                pkg: pkg.to_string(),
                version: active.clone(),
            });
        }
        for version in &selected {
            let path = self.store.version_path(pkg, version);
            fs::remove_dir_all(&path)
                .map_err(|cause| Error::chain(format!("Cannot remove {:?}.", path), cause))?;
            noteln!("uninstalled {} {}", pkg, version);
        }
        // Drop the package directory once the last version is gone.
        if !selected.is_empty() && self.store.list_versions(pkg)?.is_empty() {
            let pkg_dir = self.store.package_path(pkg);
            fs::remove_dir_all(&pkg_dir)
                .map_err(|cause| Error::chain(format!("Cannot remove {:?}.", pkg_dir), cause))?;
        }
        Ok(selected)
    }

    /// Activate the first version a specifier resolves to.
    ///
    /// When the `activate` hook fails and `revert` is set, a prior current
    /// version is restored before the failure propagates.
    pub fn activate(&self, pkg: &str, spec: &str, revert: bool) -> Result<()> {
        let versions: Vec<String> = self
            .store
            .list_versions(pkg)?
            .into_iter()
            .map(|(v, _)| v)
            .collect();
        let current = self.store.current(pkg);
        let selected = resolver::resolve(&self.store, pkg, spec, &versions, current.as_deref())?;
        let target = selected.into_iter().next().ok_or_else(|| Error::NoSuchVersion {
            pkg: pkg.to_string(),
            spec: spec.to_string(),
        })?;
        if current.as_deref() == Some(target.as_str()) {
            debugln!("activate: {} {} is already current", pkg, target);
            return Ok(());
        }
        if self.state_of(pkg, &target) == State::Absent {
            return Err(Error::NoSuchVersion {
                pkg: pkg.to_string(),
                spec: spec.to_string(),
            });
        }

        if current.is_some() {
            self.deactivate(pkg)?;
        }
        let link = self.store.current_path(pkg);
        symlink(&target, &link)
            .map_err(|cause| Error::chain(format!("Cannot create symlink {:?}.", link), cause))?;

        // The guard restores the prior version should the hook fail below.
        let mut guard = RevertGuard {
            lifecycle: self,
            pkg,
            prior: if revert { current } else { None },
        };
        let meta = self.version_metadata(pkg, &target)?;
        self.run_hook(pkg, &target, "activate", &meta)?;
        guard.prior = None;
        noteln!("activated {} {}", pkg, target);
        Ok(())
    }

    /// Deactivate the current version of a package.
    pub fn deactivate(&self, pkg: &str) -> Result<()> {
        let link = self.store.current_path(pkg);
        if fs::symlink_metadata(&link).is_err() {
            debugln!("deactivate: no current for {}", pkg);
            return Ok(());
        }
        match self.store.current(pkg) {
            // The link exists lexically but does not resolve; just drop it.
            None => {
                warnln!("Removing dangling current link {:?}.", link);
                fs::remove_file(&link)
                    .map_err(|cause| Error::chain(format!("Cannot remove {:?}.", link), cause))
            }
            Some(version) => {
                let meta = self.version_metadata(pkg, &version)?;
                self.run_hook(pkg, &version, "deactivate", &meta)?;
                fs::remove_file(&link)
                    .map_err(|cause| Error::chain(format!("Cannot remove {:?}.", link), cause))?;
                noteln!("deactivated {} {}", pkg, version);
                Ok(())
            }
        }
    }

    /// Load the persisted metadata of an installed version.
    fn version_metadata(&self, pkg: &str, version: &str) -> Result<Metadata> {
        let path = self.store.metadata_path(pkg, version);
        let file = fs::File::open(&path)
            .map_err(|cause| Error::chain(format!("Cannot open {:?}.", path), cause))?;
        Metadata::load(file)
    }

    /// Run a lifecycle hook of a package version.
    ///
    /// A missing hook file is a success. The hook's merged output is logged
    /// at debug on success and at error when the hook exits non-zero.
    fn run_hook(&self, pkg: &str, version: &str, hook: &str, meta: &Metadata) -> Result<()> {
        let script = self.store.hook_path(pkg, version, hook);
        if !script.exists() {
            debugln!("hook: no {} hook for {} {}", hook, pkg, version);
            return Ok(());
        }

        let mut cmd = SysCommand::new(&script);
        cmd.env_clear();
        cmd.env("PKG_NAME", pkg);
        cmd.env("PKG_VERSION", version);
        cmd.env("PKG_PATH", self.store.package_path(pkg));
        cmd.env("PKG_VERSION_PATH", self.store.version_path(pkg, version));
        for key in ["USER", "HOME", "PATH"] {
            if let Ok(value) = env::var(key) {
                cmd.env(key, value);
            }
        }
        for (key, value) in meta.scalar_entries() {
            cmd.env(format!("META_{}", key.to_uppercase()), value);
        }

        debugln!("hook: running {:?}", script);
        let output = cmd
            .output()
            .map_err(|cause| Error::chain(format!("Failed to spawn hook {:?}.", script), cause))?;
        let mut merged = String::from_utf8_lossy(&output.stdout).into_owned();
        merged.push_str(&String::from_utf8_lossy(&output.stderr));
        let merged = merged.trim_end();
        if output.status.success() {
            if !merged.is_empty() {
                debugln!("hook: {} {} {}:\n{}", pkg, version, hook, merged);
            }
            Ok(())
        } else {
            if !merged.is_empty() {
                errorln!("hook: {} {} {}:\n{}", pkg, version, hook, merged);
            }
            let status = match output.status.code() {
                Some(code) => format!("exit code {}", code),
                None => "a signal".to_string(),
            };
            Err(Error::HookFailed {
                hook: hook.to_string(),
                pkg: pkg.to_string(),
                version: version.to_string(),
                status,
            })
        }
    }
}

/// Restores the prior current version when an activation fails.
///
/// Armed while `prior` is set; activation disarms it once the hook has
/// succeeded, committing the transition.
struct RevertGuard<'a, 'sess> {
    lifecycle: &'a Lifecycle<'sess>,
    pkg: &'a str,
    prior: Option<String>,
}

impl Drop for RevertGuard<'_, '_> {
    fn drop(&mut self) {
        let Some(prior) = self.prior.take() else {
            return;
        };
        warnln!("Reverting {} to {}.", self.pkg, prior);
        let link = self.lifecycle.store.current_path(self.pkg);
        if let Err(cause) = fs::remove_file(&link) {
            warnln!("Cannot remove {:?} during revert: {}", link, cause);
        }
        if let Err(cause) = self.lifecycle.activate(self.pkg, &prior, false) {
            errorln!("Revert of {} to {} failed: {}", self.pkg, prior, cause);
        }
    }
}

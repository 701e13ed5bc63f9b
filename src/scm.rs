// Copyright (c) 2017-2025 ETH Zurich
// Fabian Schuiki <fschuiki@iis.ee.ethz.ch>

//! SCM introspection used to derive default package metadata.
//!
//! The builder only depends on the [`ScmProvider`] trait; [`Git`] is the
//! stock implementation. It reads the files under `.git/` directly instead
//! of shelling out for refs, and only spawns the git binary once, for the
//! ignore listing.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command as SysCommand;

use chrono::Utc;
use indexmap::IndexMap;
use serde::Serialize;

use crate::error::*;
use crate::metadata::Metadata;
use crate::{debugln, warnln};

/// A source of default package metadata.
pub trait ScmProvider {
    /// Derive a metadata document from the source tree.
    ///
    /// A tree without SCM information yields an empty document.
    fn metadata(&self) -> Result<Metadata>;
}

/// The `scm` mapping persisted into package metadata.
#[derive(Debug, Serialize)]
struct ScmInfo {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    revision: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<String>,
}

/// A git checkout to derive metadata from.
pub struct Git {
    /// The root of the source tree.
    path: PathBuf,
    /// The git binary to invoke for the status listing.
    git: String,
    /// Whether files unknown to git join the exclude list.
    ignore_unknown: bool,
}

impl Git {
    /// Create a new git metadata provider for a source tree.
    pub fn new(path: &Path) -> Git {
        Git {
            path: path.to_path_buf(),
            git: "git".to_string(),
            ignore_unknown: false,
        }
    }

    /// Also exclude files unknown to git (`?? ` status entries).
    pub fn ignore_unknown(mut self, yes: bool) -> Git {
        self.ignore_unknown = yes;
        self
    }

    /// Use a different git binary.
    pub fn with_git<S: Into<String>>(mut self, git: S) -> Git {
        self.git = git.into();
        self
    }

    /// Resolve a symbolic ref to a revision hash.
    ///
    /// Prefers the loose ref file; falls back to `packed-refs`.
    fn resolve_ref(git_dir: &Path, refpath: &str) -> Result<Option<String>> {
        let loose = git_dir.join(refpath);
        if loose.exists() {
            return Ok(Some(read_trimmed(&loose)?));
        }
        let packed = git_dir.join("packed-refs");
        if !packed.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&packed)
            .map_err(|cause| Error::chain(format!("Cannot read {:?}.", packed), cause))?;
        for line in text.lines() {
            if line.starts_with('#') || line.starts_with('^') {
                continue;
            }
            if let Some((hash, name)) = line.split_once(' ') {
                if name == refpath {
                    return Ok(Some(hash.to_string()));
                }
            }
        }
        Ok(None)
    }

    /// Find a tag whose contents equal the given revision.
    fn find_tag(git_dir: &Path, revision: &str) -> Option<String> {
        let entries = fs::read_dir(git_dir.join("refs/tags")).ok()?;
        for entry in entries.flatten() {
            if let Ok(contents) = fs::read_to_string(entry.path()) {
                if contents.trim() == revision {
                    return entry.file_name().to_str().map(String::from);
                }
            }
        }
        None
    }

    /// The `exclude_files` listing from `git status --porcelain --ignored`.
    ///
    /// A failing or missing git binary degrades to an empty listing with a
    /// warning; the build itself does not depend on it.
    fn status_excludes(&self) -> Vec<String> {
        let output = SysCommand::new(&self.git)
            .args(["status", "--porcelain", "--ignored"])
            .current_dir(&self.path)
            .output();
        let output = match output {
            Ok(output) => output,
            Err(cause) => {
                warnln!("Failed to spawn {} status: {}", self.git, cause);
                return Vec::new();
            }
        };
        if !output.status.success() {
            warnln!(
                "{} status in {:?} failed: {}",
                self.git,
                self.path,
                String::from_utf8_lossy(&output.stderr).trim_end()
            );
            return Vec::new();
        }
        parse_status(
            &String::from_utf8_lossy(&output.stdout),
            self.ignore_unknown,
        )
    }
}

impl ScmProvider for Git {
    fn metadata(&self) -> Result<Metadata> {
        let git_dir = self.path.join(".git");
        if !git_dir.exists() {
            debugln!("scm: no .git in {:?}", self.path);
            return Ok(Metadata::default());
        }

        let head = read_trimmed(&git_dir.join("HEAD"))?;
        let (branch, revision) = match head.strip_prefix("ref: ") {
            Some(refpath) => {
                let refpath = refpath.trim();
                let branch = refpath.rsplit('/').next().unwrap_or(refpath).to_string();
                (Some(branch), Git::resolve_ref(&git_dir, refpath)?)
            }
            // A detached HEAD carries the revision itself.
            None => (None, Some(head.clone())),
        };
        let tag = revision
            .as_deref()
            .and_then(|revision| Git::find_tag(&git_dir, revision));
        let url = origin_url(&git_dir)?;
        debugln!(
            "scm: branch {:?} revision {:?} tag {:?} url {:?}",
            branch, revision, tag, url
        );

        let mut meta = Metadata::default();
        if let Some(name) = url.as_deref().and_then(name_from_url) {
            meta.set("name", name);
        }
        if let Some(branch) = &branch {
            let version = match &tag {
                Some(tag) => format!("{}-{}", branch, tag),
                None => format!("{}-{}", branch, Utc::now().format("%Y%m%d%H%M%S")),
            };
            meta.set("version", version);
        }
        let info = ScmInfo {
            kind: "git",
            branch,
            revision,
            url,
            tag,
        };
        let value = serde_yaml_ng::to_value(&info)
            .map_err(|cause| Error::chain("Cannot serialize the scm mapping.", cause))?;
        meta.set("scm", value);

        let excludes = self.status_excludes();
        if !excludes.is_empty() {
            let value = serde_yaml_ng::to_value(&excludes)
                .map_err(|cause| Error::chain("Cannot serialize the exclude listing.", cause))?;
            meta.set("exclude_files", value);
        }
        Ok(meta)
    }
}

fn read_trimmed(path: &Path) -> Result<String> {
    let text = fs::read_to_string(path)
        .map_err(|cause| Error::chain(format!("Cannot read {:?}.", path), cause))?;
    Ok(text.trim().to_string())
}

/// Extract `remote.origin.url` from the repository config.
fn origin_url(git_dir: &Path) -> Result<Option<String>> {
    let path = git_dir.join("config");
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(&path)
        .map_err(|cause| Error::chain(format!("Cannot read {:?}.", path), cause))?;
    let config = parse_config(&text);
    Ok(config
        .get("remote")
        .and_then(|subs| subs.get("origin"))
        .and_then(|section| section.get("url"))
        .cloned())
}

/// Parse a git `config` file.
///
/// The file is a sectioned INI-like format. `[section]` headers map to a
/// section with the empty subsection name; `[section "subname"]` headers
/// nest under their section.
fn parse_config(text: &str) -> IndexMap<String, IndexMap<String, IndexMap<String, String>>> {
    let mut sections: IndexMap<String, IndexMap<String, IndexMap<String, String>>> =
        IndexMap::new();
    let mut section = String::new();
    let mut subsection = String::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(header) = line
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
        {
            match header.split_once(' ') {
                Some((name, sub)) => {
                    section = name.trim().to_string();
                    subsection = sub.trim().trim_matches('"').to_string();
                }
                None => {
                    section = header.trim().to_string();
                    subsection = String::new();
                }
            }
            sections
                .entry(section.clone())
                .or_default()
                .entry(subsection.clone())
                .or_default();
        } else if let Some((key, value)) = line.split_once('=') {
            sections
                .entry(section.clone())
                .or_default()
                .entry(subsection.clone())
                .or_default()
                .insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    sections
}

/// Derive a package name from the basename of a repository url.
///
/// A single trailing extension (usually `.git`) is removed.
fn name_from_url(url: &str) -> Option<String> {
    let base = url.trim_end_matches('/').rsplit('/').next()?;
    if base.is_empty() {
        return None;
    }
    let name = match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    };
    Some(name.to_string())
}

/// Split a `git status --porcelain --ignored` listing into exclude entries.
///
/// `!! ` entries are always excluded; `?? ` entries only when requested.
fn parse_status(text: &str, ignore_unknown: bool) -> Vec<String> {
    let mut excludes = Vec::new();
    for line in text.lines() {
        if let Some(path) = line.strip_prefix("!! ") {
            excludes.push(path.to_string());
        } else if ignore_unknown {
            if let Some(path) = line.strip_prefix("?? ") {
                excludes.push(path.to_string());
            }
        }
    }
    excludes
}

// Copyright (c) 2017-2025 ETH Zurich
// Fabian Schuiki <fschuiki@iis.ee.ethz.ch>

//! Building package archives from a source tree.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use walkdir::WalkDir;

use crate::archive::PackageWriter;
use crate::debugln;
use crate::error::*;
use crate::metadata::Metadata;
use crate::scm::{Git, ScmProvider};
use crate::sess::Session;

/// Builds a package archive from a source tree.
///
/// The metadata travels through three layers: SCM-derived defaults, the
/// project's `metadata.yaml`, and the session's command line overrides, each
/// overwriting the previous one.
pub struct Builder<'sess> {
    sess: &'sess Session,
    /// Metadata directory; relative paths are taken from the source root.
    metadata_dir: PathBuf,
    /// Whether files unknown to the SCM join the exclude list.
    ignore_unknown: bool,
}

impl<'sess> Builder<'sess> {
    /// Create a builder with the default `olut` metadata directory.
    pub fn new(sess: &'sess Session) -> Builder<'sess> {
        Builder {
            sess,
            metadata_dir: PathBuf::from("olut"),
            ignore_unknown: false,
        }
    }

    /// Use a different metadata directory.
    pub fn metadata_dir(mut self, dir: &Path) -> Builder<'sess> {
        self.metadata_dir = dir.to_path_buf();
        self
    }

    /// Also exclude files unknown to the SCM.
    pub fn ignore_unknown(mut self, yes: bool) -> Builder<'sess> {
        self.ignore_unknown = yes;
        self
    }

    /// Build an archive; returns the path of the written `.tgz`.
    pub fn build(&self, source: &Path, out_dir: &Path) -> Result<PathBuf> {
        if !source.exists() {
            return Err(Error::SourceMissing(source.to_path_buf()));
        }
        let meta_dir = if self.metadata_dir.is_absolute() {
            self.metadata_dir.clone()
        } else {
            source.join(&self.metadata_dir)
        };

        let scm = Git::new(source)
            .with_git(self.sess.git.as_str())
            .ignore_unknown(self.ignore_unknown);
        let mut meta = scm.metadata()?;
        let project = meta_dir.join("metadata.yaml");
        if project.exists() {
            let file = fs::File::open(&project)
                .map_err(|cause| Error::chain(format!("Cannot open {:?}.", project), cause))?;
            meta.merge(&Metadata::load(file)?);
        }
        meta.merge(&self.sess.overrides);
        meta.set(
            "build_date",
            Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        );

        // Consumed here; neither key is persisted into the archive.
        let exclude: HashSet<String> = meta.take_string_list("exclude_files").into_iter().collect();
        let include: HashSet<String> = meta.take_string_list("include_files").into_iter().collect();

        let name = meta.ident("name")?;
        let version = meta.ident("version")?;

        fs::create_dir_all(out_dir)
            .map_err(|cause| Error::chain(format!("Cannot create {:?}.", out_dir), cause))?;
        let out_path = out_dir.join(format!("{}-{}.tgz", name, version));
        debugln!("build: writing {:?}", out_path);
        let mut writer = PackageWriter::create(&out_path)?;

        // Payload files from the source tree.
        let dropped = |rel: &str| listed(&exclude, rel) && !listed(&include, rel);
        let walker = WalkDir::new(source)
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| {
                if !entry.file_type().is_dir() {
                    return true;
                }
                if entry.file_name() == ".git" {
                    return false;
                }
                match entry.path().strip_prefix(source) {
                    Ok(rel) => !dropped(&rel.to_string_lossy()),
                    Err(_) => true,
                }
            });
        for entry in walker {
            let entry = entry.map_err(|cause| {
                Error::chain(format!("Cannot walk source tree {:?}.", source), cause)
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry.path().strip_prefix(source).map_err(|cause| {
                Error::chain(format!("Cannot walk source tree {:?}.", source), cause)
            })?;
            let relstr = rel.to_string_lossy();
            if self.sess.ignore_filename_re.is_match(&relstr) {
                debugln!("build: ignoring {}", relstr);
                continue;
            }
            if dropped(&relstr) {
                debugln!("build: excluding {}", relstr);
                continue;
            }
            writer.add_file(entry.path(), rel)?;
        }

        // Metadata-path files, stored under `.olut/`. The metadata document
        // itself is synthesized below.
        if meta_dir.is_dir() {
            for entry in WalkDir::new(&meta_dir).min_depth(1) {
                let entry = entry.map_err(|cause| {
                    Error::chain(format!("Cannot walk {:?}.", meta_dir), cause)
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let rel = entry.path().strip_prefix(&meta_dir).map_err(|cause| {
                    Error::chain(format!("Cannot walk {:?}.", meta_dir), cause)
                })?;
                if rel == Path::new("metadata.yaml") {
                    continue;
                }
                let relstr = rel.to_string_lossy();
                if self.sess.ignore_filename_re.is_match(&relstr) {
                    continue;
                }
                writer.add_file(entry.path(), &Path::new(".olut").join(rel))?;
            }
        }

        let owner = fs::metadata(source)
            .map_err(|cause| Error::chain(format!("Cannot stat {:?}.", source), cause))?;
        writer.add_metadata(&meta, &owner)?;
        writer.finish()?;
        Ok(out_path)
    }
}

fn listed(set: &HashSet<String>, rel: &str) -> bool {
    set.contains(rel) || set.contains(&format!("{}/", rel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive;

    fn session() -> Session {
        Session::new(Some(PathBuf::from("/nonexistent")), None, Metadata::default()).unwrap()
    }

    fn sample_tree(dir: &Path) -> PathBuf {
        let source = dir.join("testapp");
        fs::create_dir_all(source.join("olut")).unwrap();
        fs::create_dir_all(source.join("src")).unwrap();
        fs::write(source.join("code.py"), "print('hi')\n").unwrap();
        fs::write(source.join("code.pyc"), "junk").unwrap();
        fs::write(source.join("src/main.py"), "pass\n").unwrap();
        fs::write(
            source.join("olut/metadata.yaml"),
            "name: testapp\nversion: \"1.0\"\n",
        )
        .unwrap();
        source
    }

    fn entry_names(path: &Path) -> Vec<String> {
        let file = fs::File::open(path).unwrap();
        let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(file));
        archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn missing_sources_are_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let sess = session();
        let result = Builder::new(&sess).build(&dir.path().join("nope"), dir.path());
        match result {
            Err(Error::SourceMissing(_)) => (),
            other => panic!("expected SourceMissing, got {:?}", other),
        }
    }

    #[test]
    fn builds_payload_and_metadata_entries() {
        let dir = tempfile::tempdir().unwrap();
        let source = sample_tree(dir.path());
        let out = dir.path().join("out");
        let sess = session();
        let archive_path = Builder::new(&sess).build(&source, &out).unwrap();
        assert_eq!(archive_path, out.join("testapp-1.0.tgz"));
        let names = entry_names(&archive_path);
        assert!(names.contains(&"code.py".to_string()));
        assert!(names.contains(&"src/main.py".to_string()));
        assert!(names.contains(&archive::METADATA_NAME.to_string()));
        // Byte-compiled artifacts match the default ignore pattern.
        assert!(!names.contains(&"code.pyc".to_string()));
    }

    #[test]
    fn persisted_metadata_has_no_build_lists() {
        let dir = tempfile::tempdir().unwrap();
        let source = sample_tree(dir.path());
        fs::write(
            source.join("olut/metadata.yaml"),
            "name: testapp\nversion: \"1.0\"\nexclude_files:\n  - src/\ninclude_files: []\n",
        )
        .unwrap();
        let sess = session();
        let archive_path = Builder::new(&sess).build(&source, dir.path()).unwrap();
        let meta = archive::read_metadata(&archive_path).unwrap();
        assert!(meta.get("exclude_files").is_none());
        assert!(meta.get("include_files").is_none());
        assert!(meta.get_str("build_date").is_some());
        // The excluded directory stayed out of the payload.
        let names = entry_names(&archive_path);
        assert!(!names.iter().any(|n| n.starts_with("src/")));
    }

    #[test]
    fn include_wins_over_exclude() {
        let dir = tempfile::tempdir().unwrap();
        let source = sample_tree(dir.path());
        fs::write(
            source.join("olut/metadata.yaml"),
            "name: testapp\nversion: \"1.0\"\nexclude_files:\n  - code.py\n  - src/main.py\ninclude_files:\n  - src/main.py\n",
        )
        .unwrap();
        let sess = session();
        let archive_path = Builder::new(&sess).build(&source, dir.path()).unwrap();
        let names = entry_names(&archive_path);
        assert!(!names.contains(&"code.py".to_string()));
        assert!(names.contains(&"src/main.py".to_string()));
    }

    #[test]
    fn cli_overrides_win_over_project_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let source = sample_tree(dir.path());
        let sess = Session::new(
            Some(PathBuf::from("/nonexistent")),
            None,
            Metadata::from_overrides(["version=2.0"]).unwrap(),
        )
        .unwrap();
        let archive_path = Builder::new(&sess).build(&source, dir.path()).unwrap();
        assert_eq!(archive_path, dir.path().join("testapp-2.0.tgz"));
    }

    #[test]
    fn metadata_dir_files_land_under_dot_olut() {
        let dir = tempfile::tempdir().unwrap();
        let source = sample_tree(dir.path());
        fs::write(source.join("olut/activate"), "#!/bin/sh\nexit 0\n").unwrap();
        let sess = session();
        let archive_path = Builder::new(&sess).build(&source, dir.path()).unwrap();
        let names = entry_names(&archive_path);
        assert!(names.contains(&".olut/activate".to_string()));
    }
}

// Copyright (c) 2017-2025 ETH Zurich
// Michael Rogenmoser <michael@rogenmoser.us>

//! Rendering templates against installed package metadata.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::archive::METADATA_NAME;
use crate::debugln;
use crate::error::*;
use crate::metadata::Metadata;

/// Render a template file against a version's metadata.
///
/// The substitution namespace contains the scalar metadata entries, the
/// process environment, and `version_path`; metadata wins over the
/// environment. `$key` and `${key}` occurrences in the source text are
/// replaced. Without an explicit destination, the source path minus a
/// trailing `.tmpl` is used. Returns the destination path.
pub fn render(src: &Path, dst: Option<&Path>, version_path: Option<&Path>) -> Result<PathBuf> {
    let version_path = match version_path {
        Some(path) => path.to_path_buf(),
        None => env::var("PKG_VERSION_PATH").map(PathBuf::from).map_err(|_| {
            Error::new("No version path given and PKG_VERSION_PATH is not set.")
        })?,
    };
    let dst = match dst {
        Some(dst) => dst.to_path_buf(),
        None => match src.to_string_lossy().strip_suffix(".tmpl") {
            Some(stem) => PathBuf::from(stem),
            None => return Err(Error::AmbiguousDestination(src.to_path_buf())),
        },
    };

    let meta_path = version_path.join(METADATA_NAME);
    let file = fs::File::open(&meta_path)
        .map_err(|cause| Error::chain(format!("Cannot open {:?}.", meta_path), cause))?;
    let meta = Metadata::load(file)?;

    let mut namespace: HashMap<String, String> = env::vars().collect();
    namespace.extend(meta.scalar_entries());
    namespace.insert(
        "version_path".to_string(),
        version_path.to_string_lossy().into_owned(),
    );

    let text = fs::read_to_string(src)
        .map_err(|cause| Error::chain(format!("Cannot read template {:?}.", src), cause))?;
    let rendered = subst::substitute(&text, &namespace)
        .map_err(|cause| Error::chain(format!("Cannot render template {:?}.", src), cause))?;
    fs::write(&dst, rendered)
        .map_err(|cause| Error::chain(format!("Cannot write {:?}.", dst), cause))?;
    debugln!("render: {:?} -> {:?}", src, dst);
    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn version_fixture(dir: &Path) -> PathBuf {
        let version_path = dir.join("app/1.0");
        fs::create_dir_all(version_path.join(".olut")).unwrap();
        fs::write(
            version_path.join(METADATA_NAME),
            "name: app\nversion: \"1.0\"\nport: 8080\n",
        )
        .unwrap();
        version_path
    }

    #[test]
    fn substitutes_metadata_and_version_path() {
        let dir = tempfile::tempdir().unwrap();
        let version_path = version_fixture(dir.path());
        let src = dir.path().join("app.conf.tmpl");
        fs::write(&src, "listen ${port}\nroot ${version_path}\nname $name\n").unwrap();
        let dst = render(&src, None, Some(&version_path)).unwrap();
        assert_eq!(dst, dir.path().join("app.conf"));
        let rendered = fs::read_to_string(&dst).unwrap();
        assert_eq!(
            rendered,
            format!(
                "listen 8080\nroot {}\nname app\n",
                version_path.display()
            )
        );
    }

    #[test]
    fn metadata_wins_over_the_environment() {
        let dir = tempfile::tempdir().unwrap();
        let version_path = version_fixture(dir.path());
        let src = dir.path().join("who.tmpl");
        // HOME is always present in the environment; the metadata has no
        // such key, so the environment value flows through.
        fs::write(&src, "home ${HOME}\nport ${port}\n").unwrap();
        let dst = render(&src, None, Some(&version_path)).unwrap();
        let rendered = fs::read_to_string(&dst).unwrap();
        assert!(rendered.contains("port 8080"));
        assert!(!rendered.contains("${HOME}"));
    }

    #[test]
    fn explicit_destinations_are_honored() {
        let dir = tempfile::tempdir().unwrap();
        let version_path = version_fixture(dir.path());
        let src = dir.path().join("plain.conf");
        fs::write(&src, "port ${port}\n").unwrap();
        let dst = dir.path().join("out.conf");
        render(&src, Some(&dst), Some(&version_path)).unwrap();
        assert_eq!(fs::read_to_string(&dst).unwrap(), "port 8080\n");
    }

    #[test]
    fn a_destination_is_required_without_tmpl_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let version_path = version_fixture(dir.path());
        let src = dir.path().join("plain.conf");
        fs::write(&src, "port ${port}\n").unwrap();
        match render(&src, None, Some(&version_path)) {
            Err(Error::AmbiguousDestination(path)) => assert_eq!(path, src),
            other => panic!("expected AmbiguousDestination, got {:?}", other),
        }
    }
}

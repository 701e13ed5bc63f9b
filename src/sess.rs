// Copyright (c) 2017-2025 ETH Zurich
// Fabian Schuiki <fschuiki@iis.ee.ethz.ch>

//! A command line session.

use std::env;
use std::path::PathBuf;

use regex::Regex;

use crate::debugln;
use crate::error::*;
use crate::metadata::Metadata;

/// The default install root.
pub const DEFAULT_INSTALL_PATH: &str = "/var/lib/olut";

/// The default ignore pattern: byte-compiled artifacts and editor swap and
/// backup files.
pub const DEFAULT_IGNORE_FILENAME_RE: &str = r".*(\.py[co]|\.swp|~)$";

/// A command line session.
///
/// Resolves the global defaults once at construction: explicit arguments win
/// over environment variables, which win over the compiled-in defaults.
#[derive(Debug)]
pub struct Session {
    /// The install root.
    pub install_path: PathBuf,
    /// Paths matching this pattern never enter an archive.
    pub ignore_filename_re: Regex,
    /// Metadata overrides from the command line.
    pub overrides: Metadata,
    /// The git binary the SCM provider invokes.
    pub git: String,
}

impl Session {
    /// Create a new session.
    pub fn new(
        install_path: Option<PathBuf>,
        ignore_re: Option<String>,
        overrides: Metadata,
    ) -> Result<Session> {
        let install_path = install_path
            .or_else(|| env::var_os("OLUT_INSTALL_PATH").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INSTALL_PATH));
        let ignore_re = ignore_re
            .or_else(|| env::var("OLUT_IGNORE_FILENAME_RE").ok())
            .unwrap_or_else(|| DEFAULT_IGNORE_FILENAME_RE.to_string());
        let ignore_filename_re = Regex::new(&ignore_re)
            .map_err(|cause| Error::chain(format!("Invalid ignore pattern `{}`.", ignore_re), cause))?;
        let git = env::var("OLUT_GIT").unwrap_or_else(|_| "git".to_string());
        debugln!("sess: install path {:?}", install_path);
        Ok(Session {
            install_path,
            ignore_filename_re,
            overrides,
            git,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_arguments_win() {
        let sess = Session::new(
            Some(PathBuf::from("/tmp/olut-test")),
            Some(r"\.bak$".to_string()),
            Metadata::default(),
        )
        .unwrap();
        assert_eq!(sess.install_path, PathBuf::from("/tmp/olut-test"));
        assert!(sess.ignore_filename_re.is_match("notes.bak"));
        assert!(!sess.ignore_filename_re.is_match("code.pyc"));
    }

    #[test]
    fn the_default_pattern_matches_editor_droppings() {
        let sess = Session::new(Some(PathBuf::from("/tmp")), None, Metadata::default()).unwrap();
        assert_eq!(sess.git, "git");
        for name in ["code.pyc", "code.pyo", ".main.rs.swp", "notes~", "a/b.pyc"] {
            assert!(sess.ignore_filename_re.is_match(name), "{}", name);
        }
        for name in ["code.py", "swp", "py.txt"] {
            assert!(!sess.ignore_filename_re.is_match(name), "{}", name);
        }
    }

    #[test]
    fn malformed_patterns_are_fatal() {
        assert!(Session::new(None, Some("(".to_string()), Metadata::default()).is_err());
    }
}

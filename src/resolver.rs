// Copyright (c) 2017-2025 ETH Zurich
// Michael Rogenmoser <michael@rogenmoser.us>

//! Version specifier resolution.
//!
//! A specifier is resolved against a package's version list, newest first as
//! produced by the store. A literal version directory always wins; the
//! remaining forms are `*`, relative selectors against the current version,
//! slices, and plain indices.

use std::fs;

use crate::error::*;
use crate::store::Store;

/// A parsed version specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Spec {
    /// Every installed version.
    All,
    /// An offset against the current version.
    Relative(isize),
    /// A half-open slice of the version list.
    Slice(Option<isize>, Option<isize>),
    /// An index into the version list.
    Index(usize),
}

impl Spec {
    /// Parse a specifier string.
    ///
    /// Literal version names are handled by the caller; everything that
    /// matches no form at all yields `None`.
    pub fn parse(s: &str) -> Option<Spec> {
        if s == "*" {
            return Some(Spec::All);
        }
        if let Some(t) = s.strip_prefix('@') {
            return parse_relative(t).map(Spec::Relative);
        }
        if s.contains(':') {
            let (start, end) = s.split_once(':')?;
            return Some(Spec::Slice(parse_bound(start)?, parse_bound(end)?));
        }
        s.parse::<usize>().ok().map(Spec::Index)
    }
}

/// Parse the body of an `@` selector into an offset.
///
/// A run of a single sign character selects by run length: `@-` is one
/// version older, `@--` two, `@+++` three newer. Anything else is a signed
/// integer literal whose *negation* is the offset, so `@-2` also moves two
/// entries towards older versions. The asymmetry between the two forms is
/// deliberate and load-bearing.
fn parse_relative(t: &str) -> Option<isize> {
    let first = t.chars().next()?;
    let second = t.chars().nth(1);
    if matches!(first, '-' | '+') && (second.is_none() || matches!(second, Some('-' | '+'))) {
        let len = t.chars().count() as isize;
        return Some(if first == '-' { -len } else { len });
    }
    t.parse::<isize>().ok().map(|n| -n)
}

fn parse_bound(text: &str) -> Option<Option<isize>> {
    if text.is_empty() {
        Some(None)
    } else {
        text.parse::<isize>().ok().map(Some)
    }
}

/// Resolve a specifier against a package's version list.
///
/// `versions` is newest first; the result preserves that order. A specifier
/// matching nothing resolves to an empty list, which callers turn into an
/// error or a no-op as appropriate.
pub fn resolve(
    store: &Store,
    pkg: &str,
    spec: &str,
    versions: &[String],
    current: Option<&str>,
) -> Result<Vec<String>> {
    // A literal version directory wins over every other interpretation.
    let literal = store.version_path(pkg, spec);
    let is_literal_dir = fs::symlink_metadata(&literal)
        .map(|m| m.file_type().is_dir())
        .unwrap_or(false);
    if is_literal_dir {
        return Ok(vec![spec.to_string()]);
    }

    match Spec::parse(spec) {
        Some(Spec::All) => Ok(versions.to_vec()),
        Some(Spec::Relative(offset)) => {
            let current = current.ok_or_else(|| Error::NoCurrent(pkg.to_string()))?;
            let index = versions
                .iter()
                .position(|v| v == current)
                .ok_or_else(|| Error::NoCurrent(pkg.to_string()))?;
            let last = versions.len() as isize - 1;
            let target = (index as isize + offset).clamp(0, last);
            Ok(vec![versions[target as usize].clone()])
        }
        Some(Spec::Slice(start, end)) => {
            let len = versions.len() as isize;
            let bound = |b: Option<isize>, default: isize| match b {
                None => default,
                Some(i) if i < 0 => (len + i).clamp(0, len),
                Some(i) => i.min(len),
            };
            let start = bound(start, 0);
            let end = bound(end, len);
            if start >= end {
                return Ok(Vec::new());
            }
            Ok(versions[start as usize..end as usize].to_vec())
        }
        Some(Spec::Index(n)) => Ok(versions.get(n).cloned().into_iter().collect()),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn versions() -> Vec<String> {
        vec!["v3".to_string(), "v2".to_string(), "v1".to_string()]
    }

    fn store_fixture(root: &Path) {
        for version in ["v1", "v2", "v3"] {
            std::fs::create_dir_all(root.join("app").join(version)).unwrap();
        }
    }

    fn run(root: &Path, spec: &str, current: Option<&str>) -> Result<Vec<String>> {
        let store = Store::new(root);
        resolve(&store, "app", spec, &versions(), current)
    }

    #[test]
    fn parse_forms() {
        assert_eq!(Spec::parse("*"), Some(Spec::All));
        assert_eq!(Spec::parse("@-"), Some(Spec::Relative(-1)));
        assert_eq!(Spec::parse("@--"), Some(Spec::Relative(-2)));
        assert_eq!(Spec::parse("@+++"), Some(Spec::Relative(3)));
        assert_eq!(Spec::parse("@-1"), Some(Spec::Relative(1)));
        assert_eq!(Spec::parse("@+1"), Some(Spec::Relative(-1)));
        assert_eq!(Spec::parse("@0"), Some(Spec::Relative(0)));
        assert_eq!(Spec::parse("@2"), Some(Spec::Relative(-2)));
        assert_eq!(Spec::parse("1:3"), Some(Spec::Slice(Some(1), Some(3))));
        assert_eq!(Spec::parse(":"), Some(Spec::Slice(None, None)));
        assert_eq!(Spec::parse("2"), Some(Spec::Index(2)));
        assert_eq!(Spec::parse("@x"), None);
        assert_eq!(Spec::parse("a:b"), None);
        assert_eq!(Spec::parse("---"), None);
        assert_eq!(Spec::parse("v9"), None);
    }

    #[test]
    fn literal_directories_win() {
        let dir = tempfile::tempdir().unwrap();
        store_fixture(dir.path());
        assert_eq!(run(dir.path(), "v2", None).unwrap(), vec!["v2"]);
        // Even a numeric name resolves as a literal when the directory exists.
        std::fs::create_dir_all(dir.path().join("app/1")).unwrap();
        assert_eq!(run(dir.path(), "1", None).unwrap(), vec!["1"]);
    }

    #[test]
    fn the_current_symlink_is_not_a_literal() {
        let dir = tempfile::tempdir().unwrap();
        store_fixture(dir.path());
        std::os::unix::fs::symlink("v2", dir.path().join("app/current")).unwrap();
        assert!(run(dir.path(), "current", Some("v2")).unwrap().is_empty());
    }

    #[test]
    fn star_returns_all_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        store_fixture(dir.path());
        assert_eq!(run(dir.path(), "*", None).unwrap(), versions());
    }

    #[test]
    fn relative_selectors_against_current() {
        let dir = tempfile::tempdir().unwrap();
        store_fixture(dir.path());
        let current = Some("v2");
        assert_eq!(run(dir.path(), "@-1", current).unwrap(), vec!["v1"]);
        assert_eq!(run(dir.path(), "@+1", current).unwrap(), vec!["v3"]);
        assert_eq!(run(dir.path(), "@0", current).unwrap(), vec!["v2"]);
        // Sign runs clamp at the ends of the list.
        assert_eq!(run(dir.path(), "@---", current).unwrap(), vec!["v3"]);
        assert_eq!(run(dir.path(), "@-", current).unwrap(), vec!["v3"]);
        assert_eq!(run(dir.path(), "@+", current).unwrap(), vec!["v1"]);
        assert_eq!(run(dir.path(), "@++++", current).unwrap(), vec!["v1"]);
    }

    #[test]
    fn relative_selectors_require_a_current() {
        let dir = tempfile::tempdir().unwrap();
        store_fixture(dir.path());
        match run(dir.path(), "@-1", None) {
            Err(Error::NoCurrent(pkg)) => assert_eq!(pkg, "app"),
            other => panic!("expected NoCurrent, got {:?}", other),
        }
    }

    #[test]
    fn a_bare_sign_run_is_not_a_specifier() {
        let dir = tempfile::tempdir().unwrap();
        store_fixture(dir.path());
        assert!(run(dir.path(), "---", Some("v2")).unwrap().is_empty());
    }

    #[test]
    fn slices_are_half_open() {
        let dir = tempfile::tempdir().unwrap();
        store_fixture(dir.path());
        assert_eq!(run(dir.path(), "0:2", None).unwrap(), vec!["v3", "v2"]);
        assert_eq!(run(dir.path(), "1:", None).unwrap(), vec!["v2", "v1"]);
        assert_eq!(run(dir.path(), ":1", None).unwrap(), vec!["v3"]);
        assert_eq!(run(dir.path(), ":", None).unwrap(), versions());
        assert_eq!(run(dir.path(), "-1:", None).unwrap(), vec!["v1"]);
        assert_eq!(run(dir.path(), ":-2", None).unwrap(), vec!["v3"]);
        assert!(run(dir.path(), "2:1", None).unwrap().is_empty());
        assert!(run(dir.path(), "5:9", None).unwrap().is_empty());
    }

    #[test]
    fn indices_respect_store_order() {
        let dir = tempfile::tempdir().unwrap();
        store_fixture(dir.path());
        assert_eq!(run(dir.path(), "0", None).unwrap(), vec!["v3"]);
        assert_eq!(run(dir.path(), "2", None).unwrap(), vec!["v1"]);
        assert!(run(dir.path(), "7", None).unwrap().is_empty());
    }

    #[test]
    fn unrecognized_specifiers_match_nothing() {
        let dir = tempfile::tempdir().unwrap();
        store_fixture(dir.path());
        assert!(run(dir.path(), "v9", None).unwrap().is_empty());
        assert!(run(dir.path(), "@x", Some("v2")).unwrap().is_empty());
    }
}

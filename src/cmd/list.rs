// Copyright (c) 2017-2025 ETH Zurich
// Michael Rogenmoser <michael@rogenmoser.us>

//! The `list` subcommand.

use std::io::Write;

use clap::Command;
use tabwriter::TabWriter;

use crate::error::*;
use crate::metadata::Metadata;
use crate::sess::Session;
use crate::store::Store;

/// Assemble the `list` subcommand.
pub fn new() -> Command {
    Command::new("list").about("List installed packages and their versions")
}

/// Execute the `list` subcommand.
pub fn run(sess: &Session) -> Result<()> {
    let store = Store::new(&sess.install_path);
    for pkg in store.list_packages()? {
        println!("{}", pkg);
        let current = store.current(&pkg);
        let mut tw = TabWriter::new(vec![]);
        for (version, meta) in store.list_versions(&pkg)? {
            let marker = if current.as_deref() == Some(version.as_str()) {
                '@'
            } else {
                ' '
            };
            let (branch, revision, tag) = scm_fields(&meta);
            writeln!(
                &mut tw,
                "{} {}\tbranch:{}\trevision:{}\ttag:{}",
                marker, version, branch, revision, tag
            )?;
        }
        tw.flush()?;
        print!("{}", String::from_utf8_lossy(&tw.into_inner().unwrap()));
    }
    Ok(())
}

/// The branch, abbreviated revision, and tag of a version's `scm` mapping.
fn scm_fields(meta: &Metadata) -> (String, String, String) {
    let get = |key: &str| {
        meta.get("scm")
            .and_then(|scm| scm.get(key))
            .and_then(|value| value.as_str())
            .unwrap_or("")
            .to_string()
    };
    let mut revision = get("revision");
    revision.truncate(8);
    (get("branch"), revision, get("tag"))
}

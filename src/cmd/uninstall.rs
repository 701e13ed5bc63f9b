// Copyright (c) 2017-2025 ETH Zurich
// Michael Rogenmoser <michael@rogenmoser.us>

//! The `uninstall` subcommand.

use clap::{Arg, ArgMatches, Command};

use crate::debugln;
use crate::error::*;
use crate::lifecycle::Lifecycle;
use crate::sess::Session;

/// Assemble the `uninstall` subcommand.
pub fn new() -> Command {
    Command::new("uninstall")
        .about("Remove installed versions of a package")
        .arg(
            Arg::new("pkg")
                .required(true)
                .num_args(1)
                .help("Package name"),
        )
        .arg(
            Arg::new("spec")
                .required(true)
                .num_args(1)
                .help("Version specifier"),
        )
}

/// Execute the `uninstall` subcommand.
pub fn run(sess: &Session, matches: &ArgMatches) -> Result<()> {
    let pkg = matches.get_one::<String>("pkg").unwrap();
    let spec = matches.get_one::<String>("spec").unwrap();
    let removed = Lifecycle::new(sess).uninstall(pkg, spec)?;
    if removed.is_empty() {
        debugln!("uninstall: nothing matches `{}` for {}", spec, pkg);
    }
    Ok(())
}

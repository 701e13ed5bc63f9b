// Copyright (c) 2017-2025 ETH Zurich
// Fabian Schuiki <fschuiki@iis.ee.ethz.ch>

//! The `deactivate` subcommand.

use clap::{Arg, ArgMatches, Command};

use crate::error::*;
use crate::lifecycle::Lifecycle;
use crate::sess::Session;

/// Assemble the `deactivate` subcommand.
pub fn new() -> Command {
    Command::new("deactivate")
        .about("Deselect the current version of a package")
        .arg(
            Arg::new("pkg")
                .required(true)
                .num_args(1)
                .help("Package name"),
        )
}

/// Execute the `deactivate` subcommand.
pub fn run(sess: &Session, matches: &ArgMatches) -> Result<()> {
    let pkg = matches.get_one::<String>("pkg").unwrap();
    Lifecycle::new(sess).deactivate(pkg)
}

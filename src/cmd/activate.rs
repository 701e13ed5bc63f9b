// Copyright (c) 2017-2025 ETH Zurich
// Fabian Schuiki <fschuiki@iis.ee.ethz.ch>

//! The `activate` subcommand.

use clap::{Arg, ArgMatches, Command};

use crate::error::*;
use crate::lifecycle::Lifecycle;
use crate::sess::Session;

/// Assemble the `activate` subcommand.
pub fn new() -> Command {
    Command::new("activate")
        .about("Select an installed version as current")
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
                .help("Version specifier; the first resolved version is activated"),
        )
}

/// Execute the `activate` subcommand.
pub fn run(sess: &Session, matches: &ArgMatches) -> Result<()> {
    let pkg = matches.get_one::<String>("pkg").unwrap();
    let spec = matches.get_one::<String>("spec").unwrap();
    Lifecycle::new(sess).activate(pkg, spec, true)
}

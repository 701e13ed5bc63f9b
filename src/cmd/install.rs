// Copyright (c) 2017-2025 ETH Zurich
// Fabian Schuiki <fschuiki@iis.ee.ethz.ch>

//! The `install` subcommand.

use std::path::Path;

use clap::{Arg, ArgMatches, Command};

use crate::error::*;
use crate::lifecycle::Lifecycle;
use crate::sess::Session;

/// Assemble the `install` subcommand.
pub fn new() -> Command {
    Command::new("install")
        .about("Install a package archive into the install root")
        .arg(
            Arg::new("pkgpath")
                .required(true)
                .num_args(1)
                .help("Package archive to install"),
        )
}

/// Execute the `install` subcommand.
pub fn run(sess: &Session, matches: &ArgMatches, activate: bool) -> Result<()> {
    let pkgpath = Path::new(matches.get_one::<String>("pkgpath").unwrap());
    Lifecycle::new(sess).install(pkgpath, activate)
}

// Copyright (c) 2017-2025 ETH Zurich
// Fabian Schuiki <fschuiki@iis.ee.ethz.ch>

//! The `info` subcommand.

use std::path::Path;

use clap::{Arg, ArgMatches, Command};

use crate::archive;
use crate::error::*;

/// Assemble the `info` subcommand.
pub fn new() -> Command {
    Command::new("info")
        .about("Dump the metadata of a package archive")
        .arg(
            Arg::new("pkgpath")
                .required(true)
                .num_args(1)
                .help("Package archive to inspect"),
        )
}

/// Execute the `info` subcommand.
pub fn run(matches: &ArgMatches) -> Result<()> {
    let pkgpath = Path::new(matches.get_one::<String>("pkgpath").unwrap());
    let meta = archive::read_metadata(pkgpath)?;
    print!("{}", meta.dump_string()?);
    Ok(())
}

// Copyright (c) 2017-2025 ETH Zurich
// Fabian Schuiki <fschuiki@iis.ee.ethz.ch>

//! The `build` subcommand.

use std::path::Path;

use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::build::Builder;
use crate::error::*;
use crate::noteln;
use crate::sess::Session;

/// Assemble the `build` subcommand.
pub fn new() -> Command {
    Command::new("build")
        .about("Build a package archive from a source tree")
        .arg(
            Arg::new("sourcepath")
                .required(true)
                .num_args(1)
                .help("Source tree to package"),
        )
        .arg(
            Arg::new("outpath")
                .num_args(1)
                .default_value(".")
                .help("Directory to place the archive in"),
        )
        .arg(
            Arg::new("metadata_dir")
                .long("metadata-dir")
                .num_args(1)
                .default_value("olut")
                .help("Metadata directory, relative to the source tree unless absolute"),
        )
        .arg(
            Arg::new("ignore_unknown")
                .long("ignore-unknown")
                .num_args(0)
                .action(ArgAction::SetTrue)
                .help("Also exclude files unknown to the SCM"),
        )
}

/// Execute the `build` subcommand.
pub fn run(sess: &Session, matches: &ArgMatches) -> Result<()> {
    let source = Path::new(matches.get_one::<String>("sourcepath").unwrap());
    let out_dir = Path::new(matches.get_one::<String>("outpath").unwrap());
    let out_path = Builder::new(sess)
        .metadata_dir(Path::new(matches.get_one::<String>("metadata_dir").unwrap()))
        .ignore_unknown(matches.get_flag("ignore_unknown"))
        .build(source, out_dir)?;
    noteln!("wrote {}", out_path.display());
    Ok(())
}

// Copyright (c) 2017-2025 ETH Zurich
// Michael Rogenmoser <michael@rogenmoser.us>

//! The `render` subcommand.

use std::path::Path;

use clap::{Arg, ArgMatches, Command};

use crate::error::*;
use crate::template;

/// Assemble the `render` subcommand.
pub fn new() -> Command {
    Command::new("render")
        .about("Render a template against installed package metadata")
        .arg(
            Arg::new("src")
                .required(true)
                .num_args(1)
                .help("Template file"),
        )
        .arg(
            Arg::new("dst")
                .num_args(1)
                .help("Destination; defaults to the template path minus a `.tmpl` suffix"),
        )
        .arg(
            Arg::new("version_path")
                .long("version-path")
                .num_args(1)
                .help("Package version directory; defaults to $PKG_VERSION_PATH"),
        )
}

/// Execute the `render` subcommand.
pub fn run(matches: &ArgMatches) -> Result<()> {
    template::render(
        Path::new(matches.get_one::<String>("src").unwrap()),
        matches.get_one::<String>("dst").map(Path::new),
        matches.get_one::<String>("version_path").map(Path::new),
    )?;
    Ok(())
}

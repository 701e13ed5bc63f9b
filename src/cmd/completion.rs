// Copyright (c) 2017-2025 ETH Zurich
// Michael Rogenmoser <michael@rogenmoser.us>

//! The `completion` subcommand.

use std::io;

use clap::{Arg, ArgMatches, Command};
use clap_complete::{Shell, generate};

use crate::error::*;

/// Assemble the `completion` subcommand.
pub fn new() -> Command {
    Command::new("completion")
        .about("Emit a shell completion script")
        .arg(
            Arg::new("shell")
                .required(true)
                .num_args(1)
                .value_parser(clap::value_parser!(Shell))
                .help("Shell completion script style"),
        )
}

/// Execute the `completion` subcommand.
pub fn run(matches: &ArgMatches, cmd: &mut Command) -> Result<()> {
    let shell = *matches.get_one::<Shell>("shell").unwrap();
    generate(shell, cmd, "olut", &mut io::stdout());
    Ok(())
}

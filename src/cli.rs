// Copyright (c) 2017-2025 ETH Zurich
// Fabian Schuiki <fschuiki@iis.ee.ethz.ch>

//! Main command line tool implementation.

use std::io::Write;
use std::path::PathBuf;

use clap::{Arg, ArgAction, Command};
use log::LevelFilter;

use crate::cmd;
use crate::error::*;
use crate::metadata::Metadata;
use crate::sess::Session;

/// Assemble the top-level command.
fn app() -> Command {
    Command::new("olut")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A minimal application packaging and deployment tool")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("activate")
                .short('a')
                .long("activate")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Also activate the package after installing"),
        )
        .arg(
            Arg::new("meta")
                .short('m')
                .long("meta")
                .global(true)
                .num_args(1)
                .action(ArgAction::Append)
                .value_name("NAME=VALUE")
                .help("Override a metadata value"),
        )
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .global(true)
                .num_args(1)
                .env("OLUT_INSTALL_PATH")
                .value_name("DIR")
                .help("Install root"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .global(true)
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose")
                .help("Only print errors"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Print debug information"),
        )
        .subcommand(cmd::build::new())
        .subcommand(cmd::install::new())
        .subcommand(cmd::uninstall::new())
        .subcommand(cmd::list::new())
        .subcommand(cmd::info::new())
        .subcommand(cmd::activate::new())
        .subcommand(cmd::deactivate::new())
        .subcommand(cmd::render::new())
        .subcommand(cmd::completion::new())
}

/// Install the logger with the severity-prefix format.
fn init_logger(level: LevelFilter) {
    let mut builder = env_logger::Builder::new();
    builder.format(|buf, record| {
        let severity = match record.level() {
            log::Level::Error => Severity::Error,
            log::Level::Warn => Severity::Warning,
            log::Level::Info => Severity::Note,
            _ => Severity::Debug,
        };
        writeln!(buf, "{} {}", severity, record.args())
    });
    builder.filter_level(level);
    if level == LevelFilter::Info {
        // Let RUST_LOG take over when no verbosity flag is given.
        builder.parse_default_env();
    }
    let _ = builder.try_init();
}

/// Inner main function which can return an error.
pub fn main() -> Result<()> {
    let matches = app().get_matches();

    let level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else if matches.get_flag("quiet") {
        LevelFilter::Error
    } else {
        LevelFilter::Info
    };
    init_logger(level);

    let overrides = Metadata::from_overrides(
        matches
            .get_many::<String>("meta")
            .map(|values| values.cloned().collect::<Vec<_>>())
            .unwrap_or_default(),
    )?;
    let sess = Session::new(
        matches.get_one::<String>("path").map(PathBuf::from),
        None,
        overrides,
    )?;

    match matches.subcommand() {
        Some(("build", m)) => cmd::build::run(&sess, m),
        Some(("install", m)) => cmd::install::run(&sess, m, matches.get_flag("activate")),
        Some(("uninstall", m)) => cmd::uninstall::run(&sess, m),
        Some(("list", _)) => cmd::list::run(&sess),
        Some(("info", m)) => cmd::info::run(m),
        Some(("activate", m)) => cmd::activate::run(&sess, m),
        Some(("deactivate", m)) => cmd::deactivate::run(&sess, m),
        Some(("render", m)) => cmd::render::run(m),
        Some(("completion", m)) => cmd::completion::run(m, &mut app()),
        _ => unreachable!(),
    }
}

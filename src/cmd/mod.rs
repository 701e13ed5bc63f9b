// Copyright (c) 2017-2025 ETH Zurich
// Fabian Schuiki <fschuiki@iis.ee.ethz.ch>

//! A collection of subcommands.
//!
//! This module implements the subcommands of the command line tool.

#![deny(missing_docs)]

pub mod activate;
pub mod build;
pub mod completion;
pub mod deactivate;
pub mod info;
pub mod install;
pub mod list;
pub mod render;
pub mod uninstall;

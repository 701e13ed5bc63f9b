// Copyright (c) 2017-2025 ETH Zurich
// Fabian Schuiki <fschuiki@iis.ee.ethz.ch>

//! Error chaining and reporting facilities.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Print an error.
#[macro_export]
macro_rules! errorln {
    ($($arg:tt)*) => { ::log::error!($($arg)*) }
}

/// Print a warning.
#[macro_export]
macro_rules! warnln {
    ($($arg:tt)*) => { ::log::warn!($($arg)*) }
}

/// Print an informational note.
#[macro_export]
macro_rules! noteln {
    ($($arg:tt)*) => { ::log::info!($($arg)*) }
}

/// Print debug information.
#[macro_export]
macro_rules! debugln {
    ($($arg:tt)*) => { ::log::debug!($($arg)*) }
}

/// The severity of a diagnostic message.
pub enum Severity {
    Debug,
    Note,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (color, prefix) = match *self {
            Severity::Error => ("\x1B[31;1m", "error"),
            Severity::Warning => ("\x1B[33;1m", "warning"),
            Severity::Note => ("\x1B[;1m", "note"),
            Severity::Debug => ("\x1B[34;1m", "debug"),
        };
        write!(f, "{}{}:\x1B[m", color, prefix)
    }
}

/// A result with our custom `Error` type.
pub type Result<T> = std::result::Result<T, Error>;

/// The errors raised by the package lifecycle and its collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// The build source tree does not exist.
    #[error("Source path {0:?} does not exist.")]
    SourceMissing(PathBuf),

    /// An archive could not be decoded.
    #[error("Invalid package archive {path:?}: {msg}")]
    InvalidArchive {
        /// The archive that failed to decode.
        path: PathBuf,
        /// What went wrong.
        msg: String,
    },

    /// An archive entry would escape the extraction directory.
    #[error("Entry {0:?} escapes the extraction directory.")]
    UnsafePath(PathBuf),

    /// The package version is already present in the install store.
    #[error("Package `{pkg}` version `{version}` is already installed.")]
    AlreadyInstalled {
        /// The package name.
        pkg: String,
        /// The version that is already present.
        version: String,
    },

    /// A specifier matched no installed version.
    #[error("Package `{pkg}` has no version matching `{spec}`.")]
    NoSuchVersion {
        /// The package name.
        pkg: String,
        /// The specifier that failed to resolve.
        spec: String,
    },

    /// A relative specifier was used without a current version.
    #[error("Package `{0}` has no current version.")]
    NoCurrent(String),

    /// The currently activated version cannot be uninstalled.
    #[error("Version `{version}` of `{pkg}` is currently active. Deactivate it first.")]
    UninstallActive {
        /// The package name.
        pkg: String,
        /// The active version.
        version: String,
    },

    /// A lifecycle hook exited unsuccessfully.
    #[error("Hook `{hook}` of `{pkg}` version `{version}` failed with {status}.")]
    HookFailed {
        /// The hook name.
        hook: String,
        /// The package name.
        pkg: String,
        /// The version whose hook ran.
        version: String,
        /// Human-readable exit status.
        status: String,
    },

    /// A template destination could not be derived from the source name.
    #[error("Cannot derive a destination from {0:?}. Pass one explicitly.")]
    AmbiguousDestination(PathBuf),

    /// A plain error message.
    #[error("{0}")]
    Message(String),

    /// An error message with an underlying cause.
    #[error("{msg} {cause}")]
    Chained {
        /// A formatted error message.
        msg: String,
        /// The underlying cause.
        cause: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A bare I/O error.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Create a new error without cause.
    pub fn new<S: Into<String>>(msg: S) -> Error {
        Error::Message(msg.into())
    }

    /// Create a new error with cause.
    pub fn chain<S, E>(msg: S, cause: E) -> Error
    where
        S: Into<String>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::Chained {
            msg: msg.into(),
            cause: cause.into(),
        }
    }
}

impl From<Error> for String {
    fn from(err: Error) -> String {
        format!("{}", err)
    }
}

// Copyright (c) 2017-2025 ETH Zurich
// Michael Rogenmoser <michael@rogenmoser.us>

//! The package archive codec.
//!
//! A package is a gzip-compressed tar stream. Payload files live under their
//! source-relative path; metadata-path files live under `.olut/`, with
//! `.olut/metadata.yaml` always present and authoritative. Extraction
//! normalizes entry names first and refuses anything that would land outside
//! the destination directory.

use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::error::*;
use crate::metadata::Metadata;
use crate::warnln;

/// Archive path of the authoritative metadata document.
pub const METADATA_NAME: &str = ".olut/metadata.yaml";

/// Writes a package archive.
pub struct PackageWriter {
    inner: tar::Builder<GzEncoder<File>>,
}

impl PackageWriter {
    /// Create a new archive at `path`.
    pub fn create(path: &Path) -> Result<PackageWriter> {
        let file = File::create(path)
            .map_err(|cause| Error::chain(format!("Cannot create archive {:?}.", path), cause))?;
        let encoder = GzEncoder::new(file, Compression::default());
        Ok(PackageWriter {
            inner: tar::Builder::new(encoder),
        })
    }

    /// Append a file from disk under an archive-relative path.
    pub fn add_file(&mut self, real: &Path, archived: &Path) -> Result<()> {
        self.inner
            .append_path_with_name(real, archived)
            .map_err(|cause| {
                Error::chain(format!("Cannot add {:?} to the archive.", real), cause)
            })
    }

    /// Synthesize the `.olut/metadata.yaml` entry.
    ///
    /// Ownership is copied from `owner`, the stat of the source root, so a
    /// build by an unprivileged operator does not produce root-owned entries.
    pub fn add_metadata(&mut self, meta: &Metadata, owner: &fs::Metadata) -> Result<()> {
        use std::os::unix::fs::MetadataExt;
        let body = meta.dump_string()?;
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        header.set_uid(owner.uid() as u64);
        header.set_gid(owner.gid() as u64);
        let mtime = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        header.set_mtime(mtime);
        self.inner
            .append_data(&mut header, METADATA_NAME, body.as_bytes())
            .map_err(|cause| Error::chain("Cannot add the metadata entry to the archive.", cause))
    }

    /// Flush the tar stream and the compression layer.
    pub fn finish(self) -> Result<()> {
        let encoder = self
            .inner
            .into_inner()
            .map_err(|cause| Error::chain("Cannot finish the archive.", cause))?;
        encoder
            .finish()
            .map_err(|cause| Error::chain("Cannot finish the archive.", cause))?;
        Ok(())
    }
}

fn open_archive(path: &Path) -> Result<tar::Archive<GzDecoder<File>>> {
    let file = File::open(path)
        .map_err(|cause| Error::chain(format!("Cannot open archive {:?}.", path), cause))?;
    Ok(tar::Archive::new(GzDecoder::new(file)))
}

fn invalid(path: &Path, cause: impl std::fmt::Display) -> Error {
    Error::InvalidArchive {
        path: path.to_path_buf(),
        msg: cause.to_string(),
    }
}

/// Read the authoritative metadata document out of an archive.
pub fn read_metadata(path: &Path) -> Result<Metadata> {
    let mut archive = open_archive(path)?;
    let entries = archive.entries().map_err(|cause| invalid(path, cause))?;
    for entry in entries {
        let entry = entry.map_err(|cause| invalid(path, cause))?;
        let is_meta = entry.path().map_err(|cause| invalid(path, cause))?.as_ref()
            == Path::new(METADATA_NAME);
        if is_meta {
            return Metadata::load(entry).map_err(|cause| invalid(path, cause));
        }
    }
    Err(invalid(path, format!("no {} entry", METADATA_NAME)))
}

/// Check an archive entry name for path traversal.
///
/// Rejects empty and absolute names and any name containing a `..` component.
pub fn safe_entry_path(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Extract an archive into a directory, skipping unsafe entries.
///
/// The entry names are split into an accepted and a rejected set before
/// anything is written; rejected names are logged and skipped and the
/// extraction proceeds with the rest. Returns the rejected names.
pub fn extract(path: &Path, dest: &Path) -> Result<Vec<PathBuf>> {
    // First pass: classify the entry names.
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    let mut archive = open_archive(path)?;
    let entries = archive.entries().map_err(|cause| invalid(path, cause))?;
    for (index, entry) in entries.enumerate() {
        let entry = entry.map_err(|cause| invalid(path, cause))?;
        let name = entry
            .path()
            .map_err(|cause| invalid(path, cause))?
            .into_owned();
        if safe_entry_path(&name) {
            accepted.push(index);
        } else {
            warnln!("{}", Error::UnsafePath(name.clone()));
            rejected.push(name);
        }
    }

    // Second pass: unpack the accepted entries.
    let mut archive = open_archive(path)?;
    let entries = archive.entries().map_err(|cause| invalid(path, cause))?;
    let mut accepted = accepted.into_iter().peekable();
    for (index, entry) in entries.enumerate() {
        if accepted.peek() != Some(&index) {
            continue;
        }
        accepted.next();
        let mut entry = entry.map_err(|cause| invalid(path, cause))?;
        entry.unpack_in(dest).map_err(|cause| {
            Error::chain(format!("Cannot extract archive entry into {:?}.", dest), cause)
        })?;
    }
    Ok(rejected)
}

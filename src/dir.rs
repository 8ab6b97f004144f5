//! Directory-tree import and export.
//!
//! An exported archive is a mirrored folder of loose files, one `.nik`
//! sidecar per file holding the entry's decimal tag, and one `meta.nik`
//! holding the raw 28-byte header blob.  Files ending in the sidecar
//! suffix are metadata and never become archive entries; this is also
//! why cooked output from other tools can sit in the tree without being
//! packed.

use log::debug;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::archive::{IpkArchive, IpkEntry, HEADER_BLOB_LEN, META_SIDECAR, SIDECAR_SUFFIX};
use crate::error::IpkError;

/// Build an archive from a directory tree previously produced by
/// [`export_dir`] (or hand-assembled in the same shape).
pub fn import_dir(dir: &Path) -> Result<IpkArchive, IpkError> {
    if !dir.is_dir() {
        return Err(IpkError::MissingDirectory(dir.to_path_buf()));
    }

    let mut archive = IpkArchive::new();

    for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let msg = e.to_string();
            IpkError::Io(e.into_io_error().unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::Other, msg)
            }))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let file = entry.path();
        if file.to_string_lossy().ends_with(SIDECAR_SUFFIX) {
            continue;
        }

        let rel = file
            .strip_prefix(dir)
            .expect("walked path is always under the root");
        let path = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let contents = fs::read(file)?;
        let sidecar = sidecar_path(file);
        let tag_text = fs::read_to_string(&sidecar).map_err(|e| IpkError::BadSidecar {
            path: sidecar.clone(),
            reason: e.to_string(),
        })?;
        let tag: u32 = tag_text
            .trim()
            .parse()
            .map_err(|e: std::num::ParseIntError| IpkError::BadSidecar {
                path: sidecar,
                reason: e.to_string(),
            })?;

        debug!("Imported {path} with {} bytes, tag {tag}", contents.len());
        archive.entries.push(IpkEntry { path, contents, tag });
    }

    let meta = dir.join(META_SIDECAR);
    let blob = fs::read(&meta).map_err(|e| IpkError::BadSidecar {
        path: meta,
        reason: e.to_string(),
    })?;
    if blob.len() != HEADER_BLOB_LEN {
        return Err(IpkError::BadHeaderBlob {
            expected: HEADER_BLOB_LEN,
            actual: blob.len(),
        });
    }
    archive.header_blob.copy_from_slice(&blob);

    Ok(archive)
}

/// Mirror an archive into a directory tree, one file and one tag
/// sidecar per entry, plus the archive-wide `meta.nik`.
pub fn export_dir(archive: &IpkArchive, dir: &Path) -> Result<(), IpkError> {
    fs::create_dir_all(dir)?;

    for it in &archive.entries {
        let file = dir.join(&it.path);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&file, &it.contents)?;
        fs::write(sidecar_path(&file), it.tag.to_string())?;
        debug!("Wrote {} with {} bytes", file.display(), it.contents.len());
    }

    fs::write(dir.join(META_SIDECAR), archive.header_blob)?;
    Ok(())
}

fn sidecar_path(file: &Path) -> std::path::PathBuf {
    let mut os = file.as_os_str().to_owned();
    os.push(SIDECAR_SUFFIX);
    std::path::PathBuf::from(os)
}

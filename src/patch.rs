//! Diff and patch: incremental `.patchipk` generation and application.
//!
//! A patch archive is an ordinary container whose header blob is the
//! patch sentinel and whose entry tags carry the CRC32 of the file each
//! entry replaces.  Diffing keeps only strictly-changed, pre-existing
//! paths; applying verifies every entry against the target before a
//! single byte of the target changes.

use log::debug;

use crate::archive::{IpkArchive, IpkEntry, PATCH_SENTINEL, SIDECAR_SUFFIX};
use crate::crc;
use crate::error::IpkError;

impl IpkArchive {
    /// Build a patch archive turning `self` (the shipped base) into
    /// `modified` (typically imported from a directory tree).
    ///
    /// Only paths present in both archives with differing contents are
    /// carried; each patch entry's tag is the CRC32 of the ORIGINAL
    /// contents, which is what [`IpkArchive::apply_patch`] matches on.
    /// Paths added in `modified` and metadata sidecars are skipped.
    pub fn diff_with(&self, modified: &IpkArchive) -> IpkArchive {
        let mut patch = IpkArchive {
            header_blob: PATCH_SENTINEL,
            entries: Vec::new(),
        };

        for it in &modified.entries {
            if it.path.ends_with(SIDECAR_SUFFIX) {
                continue;
            }
            if let Some(original) = self.entry(&it.path) {
                if original.contents != it.contents {
                    debug!("Adding {} to the patchipk", it.path);
                    patch.entries.push(IpkEntry {
                        path: it.path.clone(),
                        contents: it.contents.clone(),
                        tag: crc::hash(&original.contents),
                    });
                }
            }
        }

        patch
    }

    /// Apply `patch` to `self` in place.
    ///
    /// The sentinel is checked before any entry is looked at.  Each
    /// patch entry must find a target entry at the same path whose
    /// current CRC32 equals the entry tag, or whose contents already
    /// equal the patch contents (re-applying a patch is a no-op, not a
    /// conflict).  Any other outcome fails the whole application and
    /// leaves `self` untouched.
    pub fn apply_patch(&mut self, patch: &IpkArchive) -> Result<(), IpkError> {
        if !patch.is_patch() {
            return Err(IpkError::NotAPatch);
        }

        // Verify pass: resolve every patch entry before mutating anything,
        // so a conflict cannot leave a half-patched archive behind.
        let mut replacements: Vec<(usize, &IpkEntry)> = Vec::new();
        for it in &patch.entries {
            if it.path.ends_with(SIDECAR_SUFFIX) {
                continue;
            }

            let target = self
                .entries
                .iter()
                .position(|e| e.path == it.path)
                .map(|i| (i, crc::hash(&self.entries[i].contents)));

            match target {
                Some((i, actual))
                    if it.tag == actual || it.contents == self.entries[i].contents =>
                {
                    replacements.push((i, it));
                }
                Some((_, actual)) => {
                    return Err(IpkError::PatchConflict {
                        path: it.path.clone(),
                        expected: it.tag,
                        actual,
                    });
                }
                None => {
                    return Err(IpkError::PatchConflict {
                        path: it.path.clone(),
                        expected: it.tag,
                        actual: 0,
                    });
                }
            }
        }

        for (i, it) in replacements {
            debug!("Patching file {} from patchipk", it.path);
            self.entries[i].contents = it.contents.clone();
        }

        Ok(())
    }
}

//! Materializing encoded files on disk.

use crate::prelude::*;
use std::fs;
use tempfile::Builder;

/// Write `bytes` to `path`, either completely or not at all.
///
/// The bytes are written to a temporary file in the same directory as `path`, flushed to disk,
/// and only then moved over the destination.
/// If anything fails the temporary file is removed and any previous file at `path` is left
/// untouched.
///
/// A replaced file keeps its permissions.
/// A new file gets the same permissions as a file created by `fs::write`.
///
/// The underlying I/O error is returned verbatim.
/// No retries are attempted.
pub fn write_atomic<P: AsRef<Path>>(path: P, bytes: &[u8]) -> io::Result<()> {
    fn write_impl(path: &Path, bytes: &[u8]) -> io::Result<()> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let existing = fs::metadata(path).ok().map(|meta| meta.permissions());
        #[cfg_attr(not(unix), allow(unused_mut))]
        let mut builder = Builder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            //Creation mode, still masked by the process umask
            builder.permissions(fs::Permissions::from_mode(0o666));
        }
        let mut tmp = builder.tempfile_in(dir)?;
        tmp.write_all(bytes)?;
        if let Some(perms) = existing {
            tmp.as_file().set_permissions(perms)?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|err| err.error)?;
        Ok(())
    }
    write_impl(path.as_ref(), bytes)
}

use std::{
    fs,
    io::{self, Write as _},
    path::Path,
    time::{Duration, SystemTime},
};

#[cfg(unix)]
use std::os::unix::fs::MetadataExt as _;

const STABLE_READ_RETRIES: usize = 3;
const STABLE_READ_RETRY_SLEEP: Duration = Duration::from_millis(5);

/// Cheap fingerprint of a file on disk, used to detect a write landing while
/// we read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct DiskRevision {
    pub(crate) modified: SystemTime,
    pub(crate) len: u64,
    #[cfg(unix)]
    pub(crate) inode: u64,
}

pub(crate) fn disk_revision(path: &Path) -> io::Result<DiskRevision> {
    let meta = fs::metadata(path)?;
    Ok(DiskRevision {
        modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        len: meta.len(),
        #[cfg(unix)]
        inode: meta.ino(),
    })
}

/// Read `path` as UTF-8, retrying while its revision changes underneath us.
///
/// Files larger than `max_bytes` are refused.
pub(crate) fn read_stable_utf8(path: &Path, max_bytes: u64) -> io::Result<String> {
    let mut last_err = None;
    for attempt in 0..STABLE_READ_RETRIES {
        if attempt > 0 {
            std::thread::sleep(STABLE_READ_RETRY_SLEEP);
        }

        let before = disk_revision(path)?;
        if before.len > max_bytes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("file is larger than {max_bytes} bytes"),
            ));
        }

        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::InvalidData => return Err(err),
            Err(err) => {
                last_err = Some(err);
                continue;
            }
        };

        match disk_revision(path) {
            Ok(after) if after == before => return Ok(text),
            Ok(_) => {}
            Err(err) => last_err = Some(err),
        }
    }

    Err(last_err.unwrap_or_else(|| io::Error::other("file changed while reading")))
}

/// Replace `path` with `contents` so readers see either the old or the new
/// file, never a torn write.
///
/// The temp file name starts with a dot so the file watcher ignores it.
pub(crate) fn atomic_write_utf8(path: &Path, contents: &str) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "path is missing a file name")
    })?;
    let file_name = file_name.to_string_lossy();

    let pid = u128::from(std::process::id());
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos());

    for attempt in 0..10u128 {
        let suffix = pid ^ nanos ^ attempt;
        let tmp_path = dir.join(format!(".docsync-tmp-{file_name}-{suffix}"));

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
        {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        };

        let result = file
            .write_all(contents.as_bytes())
            .and_then(|()| file.sync_all())
            .and_then(|()| replace(&tmp_path, path, dir, &file_name, suffix));

        if result.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        return result;
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        "failed to create a temporary file",
    ))
}

fn replace(tmp_path: &Path, path: &Path, dir: &Path, file_name: &str, suffix: u128) -> io::Result<()> {
    if fs::rename(tmp_path, path).is_ok() {
        return Ok(());
    }
    if !path.exists() {
        return fs::rename(tmp_path, path);
    }

    // Some filesystems refuse to rename over an existing file: move the
    // original aside first so it can be restored if the second rename fails.
    let backup_path = dir.join(format!(".docsync-backup-{file_name}-{suffix}"));
    fs::rename(path, &backup_path)?;
    match fs::rename(tmp_path, path) {
        Ok(()) => {
            let _ = fs::remove_file(&backup_path);
            Ok(())
        }
        Err(err) => {
            let _ = fs::rename(&backup_path, path);
            Err(err)
        }
    }
}

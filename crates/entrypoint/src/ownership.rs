use std::ffi::CString;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum OwnershipError {
    #[error("Target {0} does not exist")]
    Missing(PathBuf),

    #[error("Target {0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("Failed to stat {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unknown user: {0}")]
    UnknownUser(String),

    #[error("Unknown group: {0}")]
    UnknownGroup(String),

    #[error("Invalid user or group name: {0:?}")]
    InvalidName(String),
}

/// A user or group, given either by name or by numeric id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Id(u32),
    Name(String),
}

impl Principal {
    pub fn parse(value: &str) -> Self {
        if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = value.parse() {
                return Principal::Id(id);
            }
        }
        Principal::Name(value.to_string())
    }
}

fn c_name(name: &str) -> Result<CString, OwnershipError> {
    CString::new(name).map_err(|_| OwnershipError::InvalidName(name.to_string()))
}

fn lookup_uid(name: &str) -> Result<u32, OwnershipError> {
    let c_name = c_name(name)?;
    // SAFETY: getpwnam returns NULL or a pointer to static storage which is
    // read before any further passwd lookup. Startup is single-threaded.
    unsafe {
        let pw = libc::getpwnam(c_name.as_ptr());
        if pw.is_null() {
            return Err(OwnershipError::UnknownUser(name.to_string()));
        }
        Ok((*pw).pw_uid)
    }
}

fn lookup_gid(name: &str) -> Result<u32, OwnershipError> {
    let c_name = c_name(name)?;
    // SAFETY: see lookup_uid
    unsafe {
        let gr = libc::getgrnam(c_name.as_ptr());
        if gr.is_null() {
            return Err(OwnershipError::UnknownGroup(name.to_string()));
        }
        Ok((*gr).gr_gid)
    }
}

/// Resolves the configured user and group to numeric ids
pub fn resolve_owner(user: &str, group: &str) -> Result<(u32, u32), OwnershipError> {
    let uid = match Principal::parse(user) {
        Principal::Id(id) => id,
        Principal::Name(name) => lookup_uid(&name)?,
    };
    let gid = match Principal::parse(group) {
        Principal::Id(id) => id,
        Principal::Name(name) => lookup_gid(&name)?,
    };
    Ok((uid, gid))
}

/// Changes the owner of a single filesystem entry
pub trait Chown {
    fn chown(&self, path: &Path, uid: u32, gid: u32) -> io::Result<()>;
}

/// Chown against the real filesystem. Symlinks are changed themselves, never followed.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemChown;

impl Chown for SystemChown {
    fn chown(&self, path: &Path, uid: u32, gid: u32) -> io::Result<()> {
        std::os::unix::fs::lchown(path, Some(uid), Some(gid))
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OwnershipReport {
    /// Entries that were reassigned
    pub changed: usize,
    /// Entries that could not be read or reassigned
    pub failed: usize,
}

/// Recursively reassigns `root` and everything below it to `uid:gid`.
///
/// Only a missing or non-directory root is an error. Failures on single
/// entries are counted in the report and the walk continues.
pub fn fix_ownership<C: Chown + ?Sized>(
    root: &Path,
    uid: u32,
    gid: u32,
    chown: &C,
) -> Result<OwnershipReport, OwnershipError> {
    let metadata = match root.metadata() {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(OwnershipError::Missing(root.to_path_buf()));
        }
        Err(source) => {
            return Err(OwnershipError::Stat {
                path: root.to_path_buf(),
                source,
            });
        }
    };
    if !metadata.is_dir() {
        return Err(OwnershipError::NotADirectory(root.to_path_buf()));
    }

    let mut report = OwnershipReport::default();

    // A symlinked root is walked through, but lchown on it only touches the
    // link. The directory it points at is reassigned explicitly.
    let root_is_link = root
        .symlink_metadata()
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false);
    if root_is_link {
        match root.canonicalize() {
            Ok(target) => match chown.chown(&target, uid, gid) {
                Ok(()) => report.changed += 1,
                Err(e) => {
                    tracing::warn!(path = %target.display(), error = %e, "chown failed");
                    report.failed += 1;
                }
            },
            Err(e) => {
                tracing::warn!(path = %root.display(), error = %e, "cannot resolve root link");
                report.failed += 1;
            }
        }
    }

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                report.failed += 1;
                continue;
            }
        };

        match chown.chown(entry.path(), uid, gid) {
            Ok(()) => report.changed += 1,
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), error = %e, "chown failed");
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

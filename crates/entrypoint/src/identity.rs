/// Effective identity of the entrypoint process.
///
/// Captured once at startup and handed to the orchestrator, so the
/// privileged branch can be exercised without changing the real uid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    uid: u32,
    gid: u32,
}

impl Identity {
    pub fn new(uid: u32, gid: u32) -> Self {
        Self { uid, gid }
    }

    pub fn root() -> Self {
        Self::new(0, 0)
    }

    pub fn current() -> Self {
        // SAFETY: geteuid/getegid cannot fail and touch no memory
        let (uid, gid) = unsafe { (libc::geteuid(), libc::getegid()) };
        Self::new(uid, gid)
    }

    pub fn uid(&self) -> u32 {
        self.uid
    }

    pub fn gid(&self) -> u32 {
        self.gid
    }

    pub fn is_privileged(&self) -> bool {
        self.uid == 0
    }
}

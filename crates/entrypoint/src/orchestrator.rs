use crate::command::{helper_command, resolve_broker_command};
use crate::config::Config;
use crate::identity::Identity;
use crate::launch::{Handoff, HandoffError, LaunchError, Launcher, SystemLauncher};
use crate::ownership::{fix_ownership, resolve_owner, Chown, OwnershipError, OwnershipReport, SystemChown};
use std::ffi::OsString;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to start helper: {0}")]
    Helper(#[from] LaunchError),

    #[error(transparent)]
    Handoff(#[from] HandoffError),
}

impl StartupError {
    pub fn exit_code(&self) -> u8 {
        match self {
            StartupError::Helper(_) => 1,
            StartupError::Handoff(e) => e.exit_code(),
        }
    }
}

/// Outcome of the ownership step. None of these stop startup.
#[derive(Debug)]
pub enum OwnershipStep {
    NotPrivileged,
    Disabled,
    Applied(OwnershipReport),
    Failed(OwnershipError),
}

/// Runs the startup sequence against pluggable process and filesystem seams
pub struct Orchestrator<L, C> {
    config: Config,
    launcher: L,
    chown: C,
}

impl<L: Launcher, C: Chown> Orchestrator<L, C> {
    pub fn new(config: Config, launcher: L, chown: C) -> Self {
        Self {
            config,
            launcher,
            chown,
        }
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn chown(&self) -> &C {
        &self.chown
    }

    /// Step 1: best-effort ownership fix, root only
    pub fn fix_ownership_step(&self, identity: Identity) -> OwnershipStep {
        let ownership = &self.config.ownership;

        if !identity.is_privileged() {
            tracing::debug!(uid = identity.uid(), "not root, skipping ownership fix");
            return OwnershipStep::NotPrivileged;
        }
        if !ownership.enabled {
            tracing::debug!("ownership fix disabled");
            return OwnershipStep::Disabled;
        }

        let result = resolve_owner(&ownership.user, &ownership.group)
            .and_then(|(uid, gid)| fix_ownership(&ownership.path, uid, gid, &self.chown));

        match result {
            Ok(report) => {
                tracing::info!(
                    path = %ownership.path.display(),
                    user = %ownership.user,
                    group = %ownership.group,
                    changed = report.changed,
                    failed = report.failed,
                    "fixed ownership"
                );
                OwnershipStep::Applied(report)
            }
            Err(e) => {
                tracing::warn!(path = %ownership.path.display(), error = %e, "ownership fix skipped");
                OwnershipStep::Failed(e)
            }
        }
    }

    /// Step 2: fire-and-forget helper launch. Returns the pid when one was started.
    pub fn start_helper(&mut self) -> Result<Option<u32>, LaunchError> {
        if !self.config.helper.enabled {
            tracing::debug!("helper disabled");
            return Ok(None);
        }

        let command = helper_command(&self.config.helper);
        let pid = self.launcher.spawn_detached(&command)?;
        tracing::info!(pid, program = %command.program_name(), "started helper");
        Ok(Some(pid))
    }

    /// Runs steps 1 and 2 and returns the broker handoff for step 3
    pub fn prepare(&mut self, identity: Identity, args: Vec<OsString>) -> Result<Handoff, StartupError> {
        self.fix_ownership_step(identity);
        self.start_helper()?;
        Ok(Handoff::new(resolve_broker_command(&self.config.broker, args)))
    }
}

/// Runs the full startup sequence and execs the broker.
///
/// Only returns when startup failed before or at the handoff.
pub fn run(config: Config, identity: Identity, args: Vec<OsString>) -> StartupError {
    let mut orchestrator = Orchestrator::new(config, SystemLauncher, SystemChown);
    match orchestrator.prepare(identity, args) {
        Ok(handoff) => handoff.exec().into(),
        Err(e) => e,
    }
}

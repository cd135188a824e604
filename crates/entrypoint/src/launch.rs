use std::ffi::OsString;
use std::fmt;
use std::io;
use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};
use thiserror::Error;

/// A resolved process invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl CommandSpec {
    pub fn new(program: impl Into<OsString>, args: Vec<OsString>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Starts background processes.
///
/// A detached process gets no handle, no wait and no exit status. Once
/// `spawn_detached` returned, nothing about the child is ever reported back.
pub trait Launcher {
    /// Spawns `command` and returns its pid
    fn spawn_detached(&mut self, command: &CommandSpec) -> Result<u32, LaunchError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn spawn_detached(&mut self, command: &CommandSpec) -> Result<u32, LaunchError> {
        let child = command
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                program: command.program_name(),
                source,
            })?;

        // Dropping the Child neither waits nor kills. After the handoff the
        // broker is the parent.
        Ok(child.id())
    }
}

#[derive(Debug, Error)]
#[error("Failed to exec {program}: {source}")]
pub struct HandoffError {
    pub program: String,
    #[source]
    pub source: io::Error,
}

impl HandoffError {
    /// Exit status following the shell's conventions for exec failures
    pub fn exit_code(&self) -> u8 {
        match self.source.kind() {
            io::ErrorKind::NotFound => 127,
            io::ErrorKind::PermissionDenied => 126,
            _ => 1,
        }
    }
}

/// The final broker invocation.
///
/// `exec` replaces the current process image. On success it never returns,
/// and signals, output and the exit code all belong to the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handoff {
    command: CommandSpec,
}

impl Handoff {
    pub fn new(command: CommandSpec) -> Self {
        Self { command }
    }

    pub fn command(&self) -> &CommandSpec {
        &self.command
    }

    pub fn exec(self) -> HandoffError {
        tracing::info!(command = %self.command, "handing off to broker");
        let source = self.command.to_command().exec();
        HandoffError {
            program: self.command.program_name(),
            source,
        }
    }
}

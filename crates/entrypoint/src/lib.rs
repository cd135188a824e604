//! Container entrypoint for the MQTT broker image.
//!
//! Startup runs three steps in order: fix ownership of the broker data
//! directory (root only, best effort), start the logging helper in the
//! background, then replace this process with the broker.

mod command;
mod identity;
mod launch;
mod orchestrator;
mod ownership;

pub use broker_entrypoint_config as config;
pub use command::{helper_command, resolve_broker_command};
pub use identity::Identity;
pub use launch::{CommandSpec, Handoff, HandoffError, LaunchError, Launcher, SystemLauncher};
pub use orchestrator::{run, Orchestrator, OwnershipStep, StartupError};
pub use ownership::{
    fix_ownership, resolve_owner, Chown, OwnershipError, OwnershipReport, Principal, SystemChown,
};

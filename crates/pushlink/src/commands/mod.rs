//! Command dispatch: bridges CLI args -> engine / adapter calls -> output.

pub mod config_cmd;
pub mod host;
pub mod registration;
pub mod resource;

use crate::cli::{Command, GlobalOpts};
use crate::config;
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Status => registration::status(global),
        Command::Config(args) => config_cmd::handle(args, global),
        cmd => {
            let resolved = config::resolve(global)?;
            tracing::debug!(profile = %resolved.name, url = %resolved.base_url, "profile resolved");
            match cmd {
                Command::Register(args) => registration::register(&resolved, args, global).await,
                Command::Reregister(args) => {
                    registration::reregister(&resolved, args, global).await
                }
                Command::Unregister(args) => {
                    registration::unregister(&resolved, args, global, false).await
                }
                Command::Clear(args) => {
                    registration::unregister(&resolved, args, global, true).await
                }
                Command::Resource(args) => resource::handle(&resolved, args, global).await,
                Command::Status | Command::Config(_) => Ok(()),
            }
        }
    }
}

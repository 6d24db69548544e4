//! Command dispatch: resolved profile -> Dashboard calls or a running
//! controller -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod diagnostics;
pub mod entities;
pub mod networks;
pub mod orgs;
pub mod refresh;
pub mod sensors;
pub mod util;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::config::ResolvedProfile;
use crate::error::CliError;

/// Dispatch a Dashboard-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    profile: ResolvedProfile,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Orgs(args) => orgs::handle(&profile, args, global).await,
        Command::Networks(args) => networks::handle(&profile, args, global).await,
        Command::Devices(args) => devices::handle(&profile, args, global).await,
        Command::Sensors(args) => sensors::handle(&profile, args, global).await,
        Command::Entities(args) => entities::handle(profile, args, global).await,
        Command::Watch(args) => watch::handle(profile, args, global).await,
        Command::Diagnostics => diagnostics::handle(profile, global).await,
        Command::Refresh => refresh::handle(profile, refresh::Action::Refresh, global).await,
        Command::Discover => refresh::handle(profile, refresh::Action::Discover, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}

//! Command dispatch: bridges CLI args -> core services -> output formatting.

pub mod auth;
pub mod config_cmd;
pub mod devices;
pub mod messages;
pub mod util;
pub mod watch;

use wagate_core::{BootstrapOutcome, LOGIN_PATH, REGISTER_PATH, SessionContext};

use crate::cli::{AuthCommand, Command, GlobalOpts};
use crate::config::ResolvedProfile;
use crate::error::CliError;

const DEVICES_PATH: &str = "/client/devices";
const MESSAGES_PATH: &str = "/client/messages";
const PROFILE_PATH: &str = "/client/profile";

/// State shared by every gateway-bound command.
pub struct AppContext {
    pub profile: ResolvedProfile,
    pub session: SessionContext,
    pub bootstrap: BootstrapOutcome,
}

/// The view a command stands for, checked by the route guard.
///
/// `None` for commands that work in any session state.
pub fn route_for(cmd: &Command) -> Option<&'static str> {
    match cmd {
        Command::Auth(args) => match args.command {
            AuthCommand::Login { .. } => Some(LOGIN_PATH),
            AuthCommand::Register { .. } => Some(REGISTER_PATH),
            AuthCommand::Whoami => Some(PROFILE_PATH),
            AuthCommand::Logout | AuthCommand::Status => None,
        },
        Command::Devices(_) | Command::Watch(_) => Some(DEVICES_PATH),
        Command::Messages(_) => Some(MESSAGES_PATH),
        Command::Config(_) | Command::Completions(_) => None,
    }
}

/// Dispatch a session-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &AppContext, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Auth(args) => auth::handle(ctx, args, global).await,
        Command::Devices(args) => devices::handle(ctx, args, global).await,
        Command::Messages(args) => messages::handle(ctx, args, global).await,
        Command::Watch(args) => watch::handle(ctx, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal {
            message: "command does not need a session".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn route(args: &[&str]) -> Option<&'static str> {
        let cli = Cli::try_parse_from(args).ok()?;
        route_for(&cli.command)
    }

    #[test]
    fn auth_views_are_public() {
        assert_eq!(route(&["wagate", "auth", "login"]), Some("/login"));
        assert_eq!(route(&["wagate", "auth", "register"]), Some("/register"));
        assert_eq!(route(&["wagate", "auth", "logout"]), None);
    }

    #[test]
    fn resource_views_are_protected() {
        assert_eq!(route(&["wagate", "devices", "list"]), Some("/client/devices"));
        assert_eq!(route(&["wagate", "watch", "sales"]), Some("/client/devices"));
        assert_eq!(
            route(&["wagate", "messages", "check", "1"]),
            Some("/client/messages")
        );
        assert!(!wagate_core::guard::is_public(PROFILE_PATH));
    }
}

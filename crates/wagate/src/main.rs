mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use wagate_core::{DASHBOARD_PATH, Navigation, RouteGuard, SessionContext, bootstrap};

use crate::cli::{Cli, Command};
use crate::commands::AppContext;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a session
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "wagate", &mut std::io::stdout());
            Ok(())
        }

        // Everything else restores the session and passes the route guard
        cmd => {
            let profile = config::resolve(&cli.global)?;
            let session = SessionContext::from_config(&profile.gateway, profile.token_storage())?;
            let outcome = bootstrap(&session).await;
            tracing::debug!(?outcome, profile = %profile.name, "session bootstrapped");

            let ctx = AppContext {
                profile,
                session,
                bootstrap: outcome,
            };

            if let Some(route) = commands::route_for(&cmd) {
                match RouteGuard::new(ctx.session.clone()).check(route) {
                    Navigation::Proceed => {}
                    Navigation::Redirect(DASHBOARD_PATH) => {
                        return commands::auth::already_signed_in(&ctx, &cli.global);
                    }
                    Navigation::Redirect(_) => {
                        return Err(CliError::NotSignedIn {
                            profile: ctx.profile.name.clone(),
                        });
                    }
                }
            }

            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &ctx, &cli.global).await
        }
    }
}

//! Auth command handlers.

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde::Serialize;

use wagate_core::{BootstrapOutcome, MeOutcome, UserProfile, token};

use crate::cli::{AuthArgs, AuthCommand, GlobalOpts};
use crate::config::TokenStore;
use crate::error::CliError;
use crate::output;

use super::{AppContext, util};

// ── Views ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct StatusView {
    profile: String,
    api_base_url: String,
    token_store: TokenStore,
    session: &'static str,
    user: Option<UserProfile>,
    expires_at: Option<DateTime<Utc>>,
}

fn session_label(outcome: &BootstrapOutcome) -> &'static str {
    match outcome {
        BootstrapOutcome::NoSession => "signed out",
        BootstrapOutcome::Expired => "expired (cleared)",
        BootstrapOutcome::Restored => "signed in",
        BootstrapOutcome::Rejected => "rejected by gateway (cleared)",
    }
}

fn user_detail(u: &UserProfile) -> String {
    [
        format!("ID:     {}", u.id),
        format!("Name:   {}", u.name),
        format!("Email:  {}", u.email),
        format!("Phone:  {}", u.phone_number.as_deref().unwrap_or("-")),
    ]
    .join("\n")
}

fn status_detail(s: &StatusView) -> String {
    let mut lines = vec![
        format!("Profile:    {}", s.profile),
        format!("Gateway:    {}", s.api_base_url),
        format!(
            "Token:      {}",
            match s.token_store {
                TokenStore::File => "file",
                TokenStore::Keyring => "keyring",
            }
        ),
        format!("Session:    {}", s.session),
    ];
    if let Some(ref user) = s.user {
        lines.push(format!("User:       {} <{}>", user.name, user.email));
    }
    if let Some(exp) = s.expires_at {
        lines.push(format!("Expires:    {}", exp.format("%Y-%m-%d %H:%M:%S UTC")));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &AppContext, args: AuthArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let session = &ctx.session;

    match args.command {
        AuthCommand::Login { email, password } => {
            let email = util::value_or_prompt(email, "email", "Email")?;
            let password = util::password_or_prompt(password)?;
            let user = session.login(&email, &password).await?;
            output::notice(
                &format!("✓ Signed in as {} <{}> on profile '{}'", user.name, user.email, ctx.profile.name),
                global.quiet,
            );
            Ok(())
        }

        AuthCommand::Register {
            name,
            email,
            phone,
            password,
        } => {
            let name = util::value_or_prompt(name, "name", "Name")?;
            let email = util::value_or_prompt(email, "email", "Email")?;
            let password = util::password_or_prompt(password)?;
            let user = session
                .register(&name, &email, &password, phone.as_deref())
                .await?;
            output::notice(
                &format!("✓ Registered and signed in as {} <{}>", user.name, user.email),
                global.quiet,
            );
            Ok(())
        }

        AuthCommand::Logout => {
            session.logout();
            output::notice(
                &format!("✓ Signed out of profile '{}'", ctx.profile.name),
                global.quiet,
            );
            Ok(())
        }

        AuthCommand::Whoami => {
            let user = match session.user() {
                Some(user) => user,
                None => match session.fetch_me().await {
                    MeOutcome::Refreshed(user) => user,
                    MeOutcome::Skipped | MeOutcome::LoggedOut(_) => {
                        return Err(CliError::NotSignedIn {
                            profile: ctx.profile.name.clone(),
                        });
                    }
                },
            };
            let out = output::render_single(global.output, &user, user_detail, |u| u.email.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AuthCommand::Status => {
            let expires_at = session
                .token()
                .and_then(|t| token::decode_expiry(t.expose_secret()));
            let view = StatusView {
                profile: ctx.profile.name.clone(),
                api_base_url: ctx.profile.gateway.api_base_url.to_string(),
                token_store: ctx.profile.profile.token_store,
                session: session_label(&ctx.bootstrap),
                user: session.user(),
                expires_at,
            };
            let out = output::render_single(global.output, &view, status_detail, |s| {
                s.session.to_owned()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

/// The route guard sent a signed-in caller away from a sign-in view.
pub fn already_signed_in(ctx: &AppContext, global: &GlobalOpts) -> Result<(), CliError> {
    let who = ctx
        .session
        .user()
        .map_or_else(|| "an existing account".to_owned(), |u| u.email);
    output::notice(
        &format!(
            "Already signed in as {who} on profile '{}'.\nRun `wagate auth logout` to switch accounts.",
            ctx.profile.name
        ),
        global.quiet,
    );
    Ok(())
}

//! Config subcommand handlers.

use std::fmt::Write as _;

use dialoguer::{Input, Select};
use serde::Serialize;

use wagate_core::DEFAULT_API_BASE_URL;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile, TokenStore};
use crate::error::CliError;
use crate::output;

use super::util::prompt_err;

// ── Helpers ─────────────────────────────────────────────────────────

fn token_store_name(store: TokenStore) -> &'static str {
    match store {
        TokenStore::File => "file",
        TokenStore::Keyring => "keyring",
    }
}

/// Format config as TOML-ish text with profiles in a stable order.
fn format_config(cfg: &Config) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "default_profile = \"{}\"", cfg.default_profile_name());
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);

    for name in cfg.profile_names() {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "api_base_url = \"{}\"", p.api_base_url);
        let _ = writeln!(out, "token_store = \"{}\"", token_store_name(p.token_store));
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
    }

    out.trim_end().to_owned()
}

#[derive(Serialize)]
struct PathsView {
    config: String,
    profile: String,
    token: String,
}

fn paths_detail(p: &PathsView) -> String {
    format!(
        "Config:   {}\nProfile:  {}\nToken:    {}",
        p.config, p.profile, p.token
    )
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            eprintln!("wagate configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            let api_base_url: String = Input::new()
                .with_prompt("API base URL")
                .default(DEFAULT_API_BASE_URL.into())
                .validate_with(|input: &String| {
                    config::parse_api_base_url(input)
                        .map(|_| ())
                        .map_err(|e| e.to_string())
                })
                .interact_text()
                .map_err(prompt_err)?;

            let choices = &[
                "File in the user data directory",
                "System keyring",
            ];
            let selection = Select::new()
                .with_prompt("Where to keep the session token?")
                .items(choices)
                .default(0)
                .interact()
                .map_err(prompt_err)?;
            let token_store = if selection == 0 {
                TokenStore::File
            } else {
                TokenStore::Keyring
            };

            let mut cfg = config::load_config_or_default();
            cfg.profiles.insert(
                profile_name.clone(),
                Profile {
                    api_base_url,
                    token_store,
                    timeout: None,
                },
            );
            cfg.default_profile = Some(profile_name.clone());
            config::save_config(&cfg)?;

            eprintln!("\n✓ Configuration written to {}", config_path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Sign in with: wagate auth login");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let out = output::render_single(global.output, &cfg, format_config, |_| {
                "config".into()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            let cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            let token = match cfg.profile(&profile_name).map(|p| p.token_store) {
                Ok(TokenStore::Keyring) => format!("keyring: wagate/{profile_name}/token"),
                _ => config::token_dir(&profile_name)
                    .join("token")
                    .display()
                    .to_string(),
            };
            let view = PathsView {
                config: config::config_path().display().to_string(),
                profile: profile_name,
                token,
            };
            let out = output::render_single(global.output, &view, paths_detail, |v| {
                v.config.clone()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── SetUrl <url> ────────────────────────────────────────────
        ConfigCommand::SetUrl { url } => {
            config::parse_api_base_url(&url)?;

            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            cfg.profiles
                .entry(profile_name.clone())
                .or_default()
                .api_base_url = url.clone();
            config::save_config(&cfg)?;

            output::notice(
                &format!("✓ API base URL for profile '{profile_name}' set to {url}"),
                global.quiet,
            );
            Ok(())
        }

        // ── Use <name> ──────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();

            if !cfg.profiles.contains_key(&name) {
                return Err(config::profile_not_found(&name, &cfg));
            }

            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            output::notice(&format!("✓ Default profile set to '{name}'"), global.quiet);
            Ok(())
        }
    }
}

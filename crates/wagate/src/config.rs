//! CLI configuration: thin wrapper around `wagate_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--profile, --api-url, --timeout).

use std::sync::Arc;
use std::time::Duration;

use wagate_core::{GatewayConfig, TokenStorage};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use wagate_config::{
    Config, Profile, TokenStore, build_token_storage, config_path, load_config,
    load_config_or_default, parse_api_base_url, save_config, token_dir,
};

/// Everything a gateway-bound command needs from configuration.
pub struct ResolvedProfile {
    pub name: String,
    pub profile: Profile,
    pub gateway: GatewayConfig,
}

impl ResolvedProfile {
    pub fn token_storage(&self) -> Arc<dyn TokenStorage> {
        build_token_storage(&self.profile, &self.name)
    }
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| config.default_profile_name().to_owned())
}

/// `ProfileNotFound` listing what the config does have.
pub fn profile_not_found(name: &str, config: &Config) -> CliError {
    let available = config.profile_names();
    CliError::ProfileNotFound {
        name: name.into(),
        available: if available.is_empty() {
            "(none)".into()
        } else {
            available.join(", ")
        },
    }
}

/// Load config and resolve the active profile with flag overrides applied.
pub fn resolve(global: &GlobalOpts) -> Result<ResolvedProfile, CliError> {
    let cfg = load_config()?;
    let name = active_profile_name(global, &cfg);
    let profile = cfg
        .profile(&name)
        .map_err(|_| profile_not_found(&name, &cfg))?;

    // URL: flag > env > profile
    let url_str = global.api_url.as_deref().unwrap_or(&profile.api_base_url);
    let mut gateway = GatewayConfig::new(parse_api_base_url(url_str)?);

    // Timeout: flag > env > profile > defaults
    let timeout = global
        .timeout
        .or(profile.timeout)
        .unwrap_or(cfg.defaults.timeout);
    gateway.timeout = Duration::from_secs(timeout);

    Ok(ResolvedProfile {
        name,
        profile,
        gateway,
    })
}

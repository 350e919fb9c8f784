//! Shared helpers for command handlers.

use std::io::IsTerminal;

use dialoguer::Input;
use secrecy::SecretString;

use wagate_core::{DeviceId, DeviceService};

use crate::error::CliError;

/// Resolve a device identifier (numeric ID or session name) to a `DeviceId`.
///
/// Numeric identifiers are taken as-is; the gateway reports unknown IDs.
/// Session names need the device list.
pub async fn resolve_device_id(
    devices: &DeviceService,
    identifier: &str,
) -> Result<DeviceId, CliError> {
    if let Ok(id) = identifier.parse::<i64>() {
        return Ok(DeviceId(id));
    }
    if devices.find(identifier).is_none() {
        devices.fetch_devices().await?;
    }
    devices
        .find(identifier)
        .map(|d| d.id)
        .ok_or_else(|| CliError::NotFound {
            message: format!("device '{identifier}' not found"),
            list_command: "devices list".into(),
        })
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(prompt_err)
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Use `given`, or prompt for it on a terminal.
pub fn value_or_prompt(given: Option<String>, field: &str, prompt: &str) -> Result<String, CliError> {
    let value = match given {
        Some(v) => v,
        None => {
            require_terminal(field)?;
            Input::new()
                .with_prompt(prompt)
                .interact_text()
                .map_err(prompt_err)?
        }
    };
    if value.trim().is_empty() {
        return Err(CliError::Validation {
            field: field.into(),
            reason: "cannot be empty".into(),
        });
    }
    Ok(value)
}

/// Use `given`, or read a password without echo on a terminal.
pub fn password_or_prompt(given: Option<String>) -> Result<SecretString, CliError> {
    let password = match given {
        Some(p) => p,
        None => {
            require_terminal("password")?;
            rpassword::prompt_password("Password: ").map_err(prompt_err)?
        }
    };
    if password.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "cannot be empty".into(),
        });
    }
    Ok(SecretString::from(password))
}

fn require_terminal(field: &str) -> Result<(), CliError> {
    if std::io::stdin().is_terminal() {
        Ok(())
    } else {
        Err(CliError::Validation {
            field: field.into(),
            reason: format!("not given and stdin is not a terminal; pass --{field}"),
        })
    }
}

//! CLI-side configuration: applies global flags on top of the shared
//! `flowdeck_config` profile resolution.
//!
//! Core never sees these types; it receives a pre-built `ControllerConfig`.

use std::time::Duration;

use secrecy::SecretString;

use flowdeck_config::{Config, ConfigError, Profile};
use flowdeck_core::{ControllerConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use flowdeck_config::{config_path, load_config, load_config_or_default, save_config};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `ControllerConfig` from the config file, profile, and CLI overrides.
///
/// Flags win over the profile; a bare `--server` works with no config file.
pub fn build_controller_config(global: &GlobalOpts, cfg: &Config) -> Result<ControllerConfig, CliError> {
    let profile = cfg
        .profile(global.profile.as_deref())
        .map_err(|e| match e {
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: available_profiles(cfg),
            },
            other => CliError::Config(other),
        })?;

    let mut controller = match profile {
        Some((name, profile)) => resolve_profile(profile, name, global, cfg)?,
        None => {
            let server = global.server.as_deref().ok_or_else(|| CliError::NoConfig {
                path: config_path().display().to_string(),
            })?;
            let mut controller = ControllerConfig::new(flowdeck_config::parse_server_url(server)?);
            controller.timeout = Duration::from_secs(cfg.defaults.timeout);
            if cfg.defaults.insecure {
                controller.tls = TlsVerification::DangerAcceptInvalid;
            }
            controller
        }
    };

    if let Some(ref token) = global.token {
        controller.auth_token = Some(SecretString::from(token.clone()));
    }
    if global.insecure {
        controller.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        controller.timeout = Duration::from_secs(secs);
    }
    Ok(controller)
}

/// Translate a profile plus `--server` into a `ControllerConfig`.
fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    global: &GlobalOpts,
    cfg: &Config,
) -> Result<ControllerConfig, CliError> {
    match global.server {
        Some(ref server) => {
            let overridden = Profile {
                server: server.clone(),
                ..profile.clone()
            };
            Ok(flowdeck_config::profile_to_controller_config(
                &overridden,
                profile_name,
                &cfg.defaults,
            )?)
        }
        None => Ok(flowdeck_config::profile_to_controller_config(
            profile,
            profile_name,
            &cfg.defaults,
        )?),
    }
}

pub fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

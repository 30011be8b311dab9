//! CLI configuration: thin wrapper around `pushlink_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides (`--backend`,
//! `--timeout`, `--profile`).

use url::Url;

use pushlink_api::TransportConfig;
use pushlink_core::ClientSettings;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use pushlink_config::{
    Config, Profile, config_path, load_config_or_default, resolve_auth_token, save_config,
    state_path, store_auth_token,
};

/// A profile with every flag override applied.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub name: String,
    pub profile: Profile,
    pub base_url: Url,
    pub transport: TransportConfig,
}

impl Resolved {
    pub fn settings(&self) -> ClientSettings {
        pushlink_config::profile_to_settings(&self.profile)
    }
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Comma-separated profile names for help text.
pub fn available_profiles(config: &Config) -> String {
    if config.profiles.is_empty() {
        "(none)".into()
    } else {
        config.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Load config and resolve the active profile plus overrides.
///
/// With no matching profile, `--backend` alone is enough to build an
/// anonymous one.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let cfg = load_config_or_default();
    let name = active_profile_name(global, &cfg);

    let mut profile = match cfg.profiles.get(&name) {
        Some(p) => p.clone(),
        None if global.backend.is_some() => Profile::default(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                available: available_profiles(&cfg),
                name,
            });
        }
        None => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    // Flag > env > profile
    if let Some(ref backend) = global.backend {
        profile.base_url = Some(backend.clone());
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }

    let base_url = profile.base_url()?;
    let transport = pushlink_config::profile_transport(&profile, &cfg.defaults);

    Ok(Resolved {
        name,
        profile,
        base_url,
        transport,
    })
}


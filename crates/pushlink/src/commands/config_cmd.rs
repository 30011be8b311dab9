//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, InitArgs, OutputFormat};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

const REDACTED: &str = "********";

/// Map an interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> CliError {
    CliError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

/// Apply one `config set` assignment to a profile.
fn set_field(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "app_name" | "app-name" => profile.app_name = value,
        "base_url" | "base-url" => {
            url::Url::parse(&value).map_err(|e| invalid("base_url", e.to_string()))?;
            profile.base_url = Some(value);
        }
        "sender_id" | "sender-id" => profile.sender_id = value,
        "resource" => profile.resource = value,
        "account_type" | "account-type" => profile.account_type = Some(value),
        "account" => profile.account = Some(value),
        "device_id" | "device-id" => profile.device_id = Some(value),
        "auth_token_env" | "auth-token-env" => profile.auth_token_env = Some(value),
        "auth_token" | "auth-token" => profile.auth_token = Some(value),
        "auth_cookie_name" | "auth-cookie-name" => profile.auth_cookie_name = Some(value),
        "timeout" => {
            profile.timeout = Some(
                value
                    .parse()
                    .map_err(|_| invalid("timeout", "must be a number (seconds)"))?,
            );
        }
        other => {
            return Err(invalid(
                other,
                format!(
                    "unknown config key '{other}'. Valid keys: app_name, base_url, sender_id, \
                     resource, account_type, account, device_id, auth_token_env, auth_token, \
                     auth_cookie_name, timeout"
                ),
            ));
        }
    }
    Ok(())
}

fn init_profile(args: InitArgs) -> Result<Profile, CliError> {
    if args.app_name.is_empty() && args.base_url.is_none() {
        return Err(invalid("app_name", "either --app-name or --base-url is required"));
    }
    let profile = Profile {
        app_name: args.app_name,
        base_url: args.base_url,
        sender_id: args.sender_id,
        resource: args.resource,
        account: args.account,
        device_id: Some(
            args.device_id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        ),
        auth_token_env: args.auth_token_env,
        ..Profile::default()
    };
    profile.base_url()?;
    Ok(profile)
}

fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.auth_token.is_some() {
            profile.auth_token = Some(REDACTED.into());
        }
    }
    cfg
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init ────────────────────────────────────────────────────
        ConfigCommand::Init(init) => {
            let mut cfg = config::load_config_or_default();
            let profile_name = global.profile.clone().unwrap_or_else(|| "default".into());

            let profile = init_profile(init)?;
            let device_id = profile.device_id.clone().unwrap_or_default();
            cfg.profiles.insert(profile_name.clone(), profile);
            if cfg.default_profile.is_none() || cfg.profiles.len() == 1 {
                cfg.default_profile = Some(profile_name.clone());
            }
            config::save_config(&cfg)?;

            if !global.quiet {
                eprintln!("✓ Profile '{profile_name}' written to {}", config::config_path().display());
                eprintln!("  Device id: {device_id}");
                eprintln!("\n  Store the account token: pushlink config set-token");
            }
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = redacted(&config::load_config_or_default());
            let out = match global.output {
                OutputFormat::Json => serde_json::to_string_pretty(&cfg)?,
                OutputFormat::JsonCompact => serde_json::to_string(&cfg)?,
                OutputFormat::Table | OutputFormat::Plain => toml::to_string_pretty(&cfg)
                    .map_err(|e| invalid("config", format!("failed to render: {e}")))?,
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);

            let profile = cfg.profiles.entry(profile_name.clone()).or_default();
            set_field(profile, &key, value)?;

            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Set {key} on profile '{profile_name}'");
            }
            Ok(())
        }

        // ── SetToken ────────────────────────────────────────────────
        ConfigCommand::SetToken => {
            let cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);

            if !cfg.profiles.contains_key(&profile_name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name: profile_name,
                });
            }

            let token = rpassword::prompt_password("Auth token: ").map_err(prompt_err)?;
            if token.is_empty() {
                return Err(invalid("token", "value cannot be empty"));
            }
            config::store_auth_token(&profile_name, &token)?;

            if !global.quiet {
                eprintln!("✓ Token stored in system keyring for profile '{profile_name}'");
            }
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: pushlink config init");
            } else {
                for name in cfg.profiles.keys() {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Default profile set to '{name}'");
            }
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            let cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            println!("{}", config::config_path().display());
            println!("{}", config::state_path(&profile_name).display());
            Ok(())
        }
    }
}

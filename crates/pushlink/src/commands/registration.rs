//! Registration command handlers: register, reregister, unregister, clear,
//! status.

use secrecy::SecretString;
use tracing::warn;

use pushlink_config::FileStore;
use pushlink_core::{ConfigStore, RegistrationConfig, RegistrationStatus};

use crate::cli::{GlobalOpts, RegisterArgs, WaitArgs};
use crate::config::{self, Resolved};
use crate::error::CliError;
use crate::output;

use super::host::{self, Engine};

// ── Register ─────────────────────────────────────────────────────────

pub async fn register(
    resolved: &Resolved,
    args: RegisterArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let account = args
        .account
        .or_else(|| resolved.profile.account.clone())
        .ok_or_else(|| CliError::NoAccount {
            profile: resolved.name.clone(),
        })?;
    let token = config::resolve_auth_token(&resolved.profile, &resolved.name)?;

    let engine = host::start_engine(
        resolved,
        &account,
        token,
        args.wait.reg_id,
        global.quiet,
    )
    .await?;

    let mut rx = engine.client.subscribe();
    rx.borrow_and_update();
    let already = engine.client.status().is_registered();
    engine.client.register(account.as_str()).await?;

    let status = if already {
        if !global.quiet {
            eprintln!("Already registered");
        }
        RegistrationStatus::Registered
    } else {
        host::settle(&mut rx, args.wait.wait).await?
    };
    finish(&engine, resolved, status, global).await
}

// ── Reregister ───────────────────────────────────────────────────────

pub async fn reregister(
    resolved: &Resolved,
    args: WaitArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let store = FileStore::for_profile(&resolved.name);
    let account = host::persisted_account(&store)?.ok_or_else(|| CliError::NoAccount {
        profile: resolved.name.clone(),
    })?;
    let token = config::resolve_auth_token(&resolved.profile, &resolved.name)?;

    let engine = host::start_engine(resolved, &account, token, args.reg_id, global.quiet).await?;

    let mut rx = engine.client.subscribe();
    rx.borrow_and_update();
    engine.client.reregister().await?;

    let status = host::settle(&mut rx, args.wait).await?;
    finish(&engine, resolved, status, global).await
}

// ── Unregister / Clear ───────────────────────────────────────────────

/// Unregister, or with `clear` also forget the account afterwards.
pub async fn unregister(
    resolved: &Resolved,
    args: WaitArgs,
    global: &GlobalOpts,
    clear: bool,
) -> Result<(), CliError> {
    let store = FileStore::for_profile(&resolved.name);
    let account = host::persisted_account(&store)?.unwrap_or_default();

    // Dropping the device record needs a session; a missing token only
    // matters if there is a device record to drop.
    let token = match config::resolve_auth_token(&resolved.profile, &resolved.name) {
        Ok(token) => Some(token),
        Err(e) => {
            warn!(error = %e, "no auth token; backend device record will not be removed");
            None
        }
    };

    let engine = host::start_engine(
        resolved,
        &account,
        token.clone().unwrap_or_else(|| SecretString::from(String::new())),
        args.reg_id,
        global.quiet,
    )
    .await?;

    let registered = engine.client.status().is_registered();
    if registered && resolved.profile.device_id.is_some() {
        if let Some(ref token) = token {
            engine
                .executor
                .login(token, &resolved.settings().auth_cookie_name)
                .await?;
        }
    }

    let mut rx = engine.client.subscribe();
    rx.borrow_and_update();
    if clear {
        engine.client.clear().await?;
    } else {
        engine.client.unregister().await?;
    }

    let status = if registered {
        host::settle(&mut rx, args.wait).await?
    } else {
        engine.client.status()
    };
    finish(&engine, resolved, status, global).await
}

// ── Status ───────────────────────────────────────────────────────────

/// Show the persisted state without starting the engine.
pub fn status(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load_config_or_default();
    let name = config::active_profile_name(global, &cfg);
    let settings = cfg
        .profiles
        .get(&name)
        .map(pushlink_config::profile_to_settings)
        .unwrap_or_default();

    let store = FileStore::for_profile(&name);
    let mut state = RegistrationConfig::from_settings(&settings);
    state.overlay(&store.load_all()?);

    print_state(&state, global)
}

// ── Helpers ──────────────────────────────────────────────────────────

async fn finish(
    engine: &Engine,
    resolved: &Resolved,
    status: RegistrationStatus,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let launch = engine.listener.take_launch_request();
    engine.client.shutdown().await;

    let store = FileStore::for_profile(&resolved.name);
    let mut state = RegistrationConfig::from_settings(&resolved.settings());
    state.overlay(&store.load_all()?);
    print_state(&state, global)?;

    if let Some(request) = launch {
        return Err(CliError::InteractionRequired {
            target: request.target,
        });
    }
    match status {
        RegistrationStatus::Error(_) => Err(CliError::RegistrationFailed { status }),
        _ => Ok(()),
    }
}

fn print_state(state: &RegistrationConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(global.color);
    let last_change = if state.last_change == 0 {
        "-".to_owned()
    } else {
        chrono::DateTime::from_timestamp_millis(state.last_change)
            .map_or_else(|| state.last_change.to_string(), |t| t.to_rfc3339())
    };

    let pairs = [
        ("account", state.account_name.clone()),
        ("status", output::paint_status(&state.status, color)),
        ("state", state.status.state().to_string()),
        ("substate", state.status.substate().to_owned()),
        ("reg_id", state.reg_id.clone()),
        ("sender_id", state.sender_id.clone()),
        ("app_name", state.app_name.clone()),
        ("backoff_ms", state.backoff_ms.to_string()),
        ("last_change", last_change),
    ];
    let pairs: Vec<_> = match global.output {
        // structured output never carries escape codes
        crate::cli::OutputFormat::Table => pairs.to_vec(),
        _ => pairs
            .iter()
            .filter(|(k, _)| *k != "status")
            .cloned()
            .collect(),
    };

    let out = output::render_pairs(global.output, &pairs, &state.status.to_string())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

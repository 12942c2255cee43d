//! Command handlers. Each one plays the part of an app screen.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use farmconnect_core::auth::{
    CredentialStore, EncryptedFileStore, KeyringStore, MemoryStore, SessionEstablished,
    UnauthenticatedReason,
};
use farmconnect_core::config::CredentialBackend;
use farmconnect_core::models::{Language, Location};
use farmconnect_core::utils::normalize_phone;
use farmconnect_core::{
    AuthClient, Config, LogoutOutcome, Registration, RenewOutcome, SessionError, SessionManager,
};
use tracing::warn;

pub struct RegisterArgs {
    pub name: String,
    pub phone: String,
    pub language: String,
    pub state: String,
    pub district: String,
    pub mandal: Option<String>,
    pub village: Option<String>,
}

// ============================================================================
// Wiring
// ============================================================================

fn build_store(config: &Config) -> Result<Arc<dyn CredentialStore>> {
    let store: Arc<dyn CredentialStore> = match config.credential_backend {
        CredentialBackend::Keyring => Arc::new(KeyringStore::new()),
        CredentialBackend::EncryptedFile => Arc::new(
            EncryptedFileStore::from_env(config.credentials_path()?)
                .context("Encrypted credential file needs a passphrase")?,
        ),
        CredentialBackend::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}

fn build_manager(config: &Config) -> Result<SessionManager> {
    let store = build_store(config)?;
    let client = AuthClient::from_config(config).context("Failed to create HTTP client")?;
    Ok(SessionManager::new(client, store))
}

/// Turn a session error into the message a farmer would see
fn user_error(error: SessionError) -> anyhow::Error {
    anyhow::anyhow!(error.user_message())
}

fn report_established(established: &SessionEstablished) {
    println!("Hello {}!", established.session.farmer.greeting_name());
    if let Some(ref e) = established.storage_error {
        eprintln!("Warning: could not save your login ({e}). You will need to log in again next time.");
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn prompt_code() -> Result<String> {
    let code = rpassword::prompt_password("OTP: ")?;
    Ok(code.trim().to_string())
}

/// Request a code, tolerating the cooldown from a previous attempt
async fn send_code(manager: &SessionManager, phone: &str, registration: bool) -> Result<()> {
    let sent = if registration {
        manager.request_registration_code(phone).await
    } else {
        manager.request_login_code(phone).await
    };

    match sent {
        Ok(()) => {
            println!("OTP sent to +91 {}", normalize_phone(phone));
            Ok(())
        }
        Err(e @ SessionError::ResendTooSoon { .. }) => {
            println!("{}", e.user_message());
            Ok(())
        }
        Err(e) => Err(user_error(e)),
    }
}

// ============================================================================
// Commands
// ============================================================================

pub async fn start(config: &Config) -> Result<()> {
    let manager = build_manager(config)?;

    match manager.restore().await.map_err(user_error)? {
        RenewOutcome::Authenticated(established) => {
            report_established(&established);
            if let Some(location) = established.session.farmer.location_display() {
                println!("Location: {}", location);
            }
        }
        RenewOutcome::Unauthenticated(reason) => {
            if let UnauthenticatedReason::StorageUnavailable(ref e) = reason {
                eprintln!("Could not read saved login: {e}");
            }
            println!("Not logged in. Run `farmconnect login`.");
        }
    }
    Ok(())
}

pub async fn login(config: &mut Config, phone: Option<String>) -> Result<()> {
    let manager = build_manager(config)?;

    // The login screen first tries the stored session
    if let RenewOutcome::Authenticated(established) = manager.restore().await.map_err(user_error)? {
        println!(
            "Already logged in as {}. Run `farmconnect logout` to switch accounts.",
            established.session.farmer.greeting_name()
        );
        return Ok(());
    }

    let phone = match phone.or_else(|| config.last_phone_number.clone()) {
        Some(phone) => phone,
        None => prompt("Phone number: ")?,
    };

    send_code(&manager, &phone, false).await?;
    let code = prompt_code()?;

    let established = manager.login(&phone, &code).await.map_err(user_error)?;
    report_established(&established);

    config.last_phone_number = Some(normalize_phone(&phone));
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }
    Ok(())
}

pub async fn register(config: &mut Config, args: RegisterArgs) -> Result<()> {
    let language = Language::parse(&args.language)
        .ok_or_else(|| anyhow::anyhow!("Please select a language (telugu, hindi or english)"))?;

    let manager = build_manager(config)?;
    send_code(&manager, &args.phone, true).await?;
    let code = prompt_code()?;

    let registration = Registration {
        name: args.name,
        phone_number: args.phone,
        code,
        language,
        location: Location {
            state: Some(args.state),
            district: Some(args.district),
            mandal: args.mandal,
            village: args.village,
            coordinates: None,
        },
    };

    let established = manager.register(registration).await.map_err(user_error)?;
    report_established(&established);

    config.last_phone_number = established.session.farmer.phone_number.clone();
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }
    Ok(())
}

pub async fn whoami(config: &Config, json: bool) -> Result<()> {
    let manager = build_manager(config)?;

    let RenewOutcome::Authenticated(established) = manager.restore().await.map_err(user_error)?
    else {
        anyhow::bail!("Not logged in. Run `farmconnect login`.");
    };

    let farmer = &established.session.farmer;
    if json {
        println!("{}", serde_json::to_string_pretty(farmer)?);
        return Ok(());
    }

    println!("Name:     {}", farmer.greeting_name());
    if let Some(ref phone) = farmer.phone_number {
        println!("Phone:    +91 {}", phone);
    }
    if let Some(language) = farmer.language {
        println!("Language: {}", language);
    }
    if let Some(location) = farmer.location_display() {
        println!("Location: {}", location);
    }
    println!("Farms:    {}", farmer.farm_profiles.len());
    Ok(())
}

pub async fn logout(config: &Config) -> Result<()> {
    let manager = build_manager(config)?;

    match manager.logout().await {
        LogoutOutcome::Completed => println!("You have been logged out."),
        LogoutOutcome::CompletedLocally => {
            println!("You have been logged out on this device. The server could not be reached.")
        }
        LogoutOutcome::AlreadySignedOut => println!("Not logged in."),
    }
    Ok(())
}

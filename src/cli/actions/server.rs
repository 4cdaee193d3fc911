use crate::{
    api::{
        self,
        handlers::auth::{AuthConfig, AuthState},
        ServeOptions,
    },
    cli::{commands::vault::Options as VaultOptions, globals::GlobalArgs, telemetry},
    vault,
};
use anyhow::{anyhow, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub token_secret: Option<SecretString>,
    pub token_ttl_seconds: i64,
    pub frontend_origin: Option<String>,
    pub seed_sample_events: bool,
    pub vault: VaultOptions,
}

/// Log in to Vault with `AppRole`, unwrapping the secret id first when it
/// arrived as a wrapped token.
async fn vault_login(url: &str, opts: &VaultOptions) -> Result<SecretString> {
    let role_id = opts
        .role_id
        .as_deref()
        .ok_or_else(|| anyhow!("Vault role-id is required"))?;

    let secret_id = if let Some(wrapped) = &opts.wrapped_token {
        vault::unwrap(url, wrapped).await?
    } else {
        opts.secret_id
            .clone()
            .ok_or_else(|| anyhow!("Vault secret-id is required"))?
    };

    let (token, lease_duration) = vault::approle_login(url, &secret_id, role_id).await?;
    debug!("Vault token lease: {} seconds", lease_duration);
    Ok(token)
}

/// Replace the DSN credentials with the dynamic ones stored in `globals`.
fn inject_db_creds(dsn: &str, globals: &GlobalArgs) -> Result<String> {
    let mut dsn = Url::parse(dsn).context("Invalid DSN")?;

    dsn.set_username(&globals.vault_db_username)
        .map_err(|()| anyhow!("Error setting username"))?;

    dsn.set_password(Some(globals.vault_db_password.expose_secret()))
        .map_err(|()| anyhow!("Error setting password"))?;

    Ok(dsn.to_string())
}

/// Execute the server action.
/// # Errors
/// Returns an error if Vault login fails, secrets cannot be loaded, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let mut globals = GlobalArgs::new(args.vault.url.clone().unwrap_or_default());
    let mut dsn = args.dsn;

    let token_secret = if globals.vault_enabled() {
        let token = vault_login(&globals.vault_url, &args.vault).await?;
        globals.set_token(token);

        if let Some(db_role) = &args.vault.db_role {
            vault::database::database_creds(&mut globals, db_role)
                .await
                .context("Could not get database username and password")?;
            dsn = inject_db_creds(&dsn, &globals)?;
        }

        match args.token_secret {
            Some(secret) => secret,
            None => vault::kv::read_token_secret(&globals, &args.vault.kv_mount, &args.vault.kv_path)
                .await
                .context("Failed to load token secret from Vault")?,
        }
    } else {
        args.token_secret
            .ok_or_else(|| anyhow!("missing required argument: --token-secret"))?
    };

    debug!("Global args: {:?}", globals);

    let auth_config = AuthConfig::new().with_token_ttl_seconds(args.token_ttl_seconds);
    let auth_state = Arc::new(
        AuthState::new(auth_config, token_secret).context("Invalid token configuration")?,
    );

    let options = ServeOptions {
        frontend_origin: args.frontend_origin,
        seed_sample_events: args.seed_sample_events,
    };

    let result = api::new(args.port, dsn, &globals, auth_state, options).await;

    info!("Server stopped");
    telemetry::shutdown_tracer();

    result
}

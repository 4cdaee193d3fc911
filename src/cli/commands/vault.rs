use clap::{Arg, ArgMatches, Command};

pub const ARG_VAULT_URL: &str = "vault-url";
pub const ARG_VAULT_ROLE_ID: &str = "vault-role-id";
pub const ARG_VAULT_SECRET_ID: &str = "vault-secret-id";
pub const ARG_VAULT_WRAPPED_TOKEN: &str = "vault-wrapped-token";
pub const ARG_VAULT_KV_MOUNT: &str = "vault-kv-mount";
pub const ARG_VAULT_KV_PATH: &str = "vault-kv-path";
pub const ARG_VAULT_DB_ROLE: &str = "vault-db-role";

#[derive(Debug, Default)]
pub struct Options {
    pub url: Option<String>,
    pub role_id: Option<String>,
    pub secret_id: Option<String>,
    pub wrapped_token: Option<String>,
    pub kv_mount: String,
    pub kv_path: String,
    pub db_role: Option<String>,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        let get = |id: &str| matches.get_one::<String>(id).cloned();
        Self {
            url: get(ARG_VAULT_URL).filter(|url| !url.trim().is_empty()),
            role_id: get(ARG_VAULT_ROLE_ID),
            secret_id: get(ARG_VAULT_SECRET_ID),
            wrapped_token: get(ARG_VAULT_WRAPPED_TOKEN),
            kv_mount: get(ARG_VAULT_KV_MOUNT).unwrap_or_else(|| "secret/meetmatch".to_string()),
            kv_path: get(ARG_VAULT_KV_PATH).unwrap_or_else(|| "config".to_string()),
            db_role: get(ARG_VAULT_DB_ROLE).filter(|role| !role.is_empty()),
        }
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_VAULT_URL)
                .long(ARG_VAULT_URL)
                .help("Vault approle login URL, example: https://vault.tld:8200/v1/auth/approle/login")
                .env("MEETMATCH_VAULT_URL"),
        )
        .arg(
            Arg::new(ARG_VAULT_ROLE_ID)
                .long(ARG_VAULT_ROLE_ID)
                .help("Vault role id")
                .env("MEETMATCH_VAULT_ROLE_ID")
                .requires(ARG_VAULT_URL),
        )
        .arg(
            Arg::new(ARG_VAULT_SECRET_ID)
                .long(ARG_VAULT_SECRET_ID)
                .help("Vault secret id")
                .env("MEETMATCH_VAULT_SECRET_ID")
                .hide_env_values(true)
                .conflicts_with(ARG_VAULT_WRAPPED_TOKEN),
        )
        .arg(
            Arg::new(ARG_VAULT_WRAPPED_TOKEN)
                .long(ARG_VAULT_WRAPPED_TOKEN)
                .help("Vault wrapped token carrying the secret id")
                .env("MEETMATCH_VAULT_WRAPPED_TOKEN")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_VAULT_KV_MOUNT)
                .long(ARG_VAULT_KV_MOUNT)
                .help("Vault KV-v2 mount path holding the token secret")
                .env("MEETMATCH_VAULT_KV_MOUNT")
                .default_value("secret/meetmatch"),
        )
        .arg(
            Arg::new(ARG_VAULT_KV_PATH)
                .long(ARG_VAULT_KV_PATH)
                .help("Vault KV-v2 secret path holding the token secret")
                .env("MEETMATCH_VAULT_KV_PATH")
                .default_value("config"),
        )
        .arg(
            Arg::new(ARG_VAULT_DB_ROLE)
                .long(ARG_VAULT_DB_ROLE)
                .help("Vault database role for dynamic Postgres credentials")
                .env("MEETMATCH_VAULT_DB_ROLE"),
        )
}

use crate::{cli::globals::GlobalArgs, vault};
use anyhow::{anyhow, Result};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{info_span, instrument, Instrument};

/// Get DB credentials from Vault and store them, with their lease, in `globals`.
/// # Errors
/// Returns an error if the Vault request fails, Vault returns a non-success status, or the response is missing expected fields.
#[instrument(skip(globals))]
pub async fn database_creds(globals: &mut GlobalArgs, db_role: &str) -> Result<()> {
    let db_creds = vault::endpoint_url(&globals.vault_url, &format!("/v1/database/creds/{db_role}"))?;

    let span = info_span!(
        "vault.database_creds",
        http.method = "GET",
        url = %db_creds
    );
    let response = vault::client()?
        .get(&db_creds)
        .header("X-Vault-Token", globals.vault_token.expose_secret())
        .send()
        .instrument(span)
        .await?;
    let response = vault::ensure_success(&db_creds, response).await?;

    let json_response: Value = response.json().await?;

    let field = |pointer: &str| {
        json_response
            .pointer(pointer)
            .ok_or_else(|| anyhow!("Error parsing JSON response: no {pointer} found"))
    };

    globals.vault_db_lease_id = field("/lease_id")?
        .as_str()
        .ok_or_else(|| anyhow!("lease_id is not a string"))?
        .to_string();
    globals.vault_db_lease_duration = field("/lease_duration")?
        .as_u64()
        .ok_or_else(|| anyhow!("lease_duration is not a number"))?;
    globals.vault_db_username = field("/data/username")?
        .as_str()
        .ok_or_else(|| anyhow!("username is not a string"))?
        .to_string();
    globals.vault_db_password = SecretString::from(
        field("/data/password")?
            .as_str()
            .ok_or_else(|| anyhow!("password is not a string"))?
            .to_string(),
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::database_creds;
    use crate::cli::globals::GlobalArgs;
    use crate::vault::tests::can_bind_localhost;
    use anyhow::Result;
    use secrecy::{ExposeSecret, SecretString};
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn database_creds_updates_globals() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/database/creds/meetmatch"))
            .and(header("X-Vault-Token", "vault-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "lease_id": "lease-123",
                "lease_duration": 55,
                "data": {"username": "user", "password": "pass"}
            })))
            .mount(&server)
            .await;

        let mut globals = GlobalArgs::new(server.uri());
        globals.set_token(SecretString::from("vault-token".to_string()));

        database_creds(&mut globals, "meetmatch").await?;

        assert_eq!(globals.vault_db_lease_id, "lease-123");
        assert_eq!(globals.vault_db_lease_duration, 55);
        assert_eq!(globals.vault_db_username, "user");
        assert_eq!(globals.vault_db_password.expose_secret(), "pass");
        Ok(())
    }

    #[tokio::test]
    async fn missing_password_is_an_error() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/database/creds/meetmatch"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "lease_id": "lease-123",
                "lease_duration": 55,
                "data": {"username": "user"}
            })))
            .mount(&server)
            .await;

        let mut globals = GlobalArgs::new(server.uri());
        let err = database_creds(&mut globals, "meetmatch").await.err();
        assert!(err.is_some_and(|err| err.to_string().contains("/data/password")));
        Ok(())
    }
}

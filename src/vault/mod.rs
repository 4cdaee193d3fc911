//! Vault `AppRole` client used at startup and for lease renewal.
//!
//! `vault_url` is the full `AppRole` login URL
//! (`https://vault.tld:8200/v1/auth/approle/login`); every other endpoint is
//! derived from its scheme, host, and port.

pub mod database;
pub mod kv;
pub mod renew;

use crate::api::APP_USER_AGENT;
use anyhow::{anyhow, Result};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::{debug, info_span, instrument, Instrument};
use url::Url;

pub(crate) fn client() -> Result<Client> {
    Ok(Client::builder().user_agent(APP_USER_AGENT).build()?)
}

fn vault_error_message(json_response: &Value) -> &str {
    json_response
        .get("errors")
        .and_then(|v| v.get(0))
        .and_then(Value::as_str)
        .unwrap_or("")
}

/// Turn a non-success Vault response into an error naming the URL and status.
pub(crate) async fn ensure_success(url: &str, response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let json_response: Value = response.json().await.unwrap_or(Value::Null);

    Err(anyhow!(
        "{} - {}, {}",
        url,
        status,
        vault_error_message(&json_response)
    ))
}

/// # Errors
/// Returns an error if `url` cannot be parsed, has no host, or uses an unsupported scheme.
pub fn endpoint_url(url: &str, path: &str) -> Result<String> {
    let url = Url::parse(url)?;

    let scheme = url.scheme();

    let host = url
        .host()
        .ok_or_else(|| anyhow!("Error parsing URL: no host specified"))?
        .to_owned();

    let port = match url.port() {
        Some(p) => p,
        None => match scheme {
            "http" => 80,
            "https" => 443,
            _ => return Err(anyhow!("Error parsing URL: unsupported scheme {scheme}")),
        },
    };

    let endpoint_url = format!("{scheme}://{host}:{port}{path}");

    debug!("endpoint URL: {}", endpoint_url);

    Ok(endpoint_url)
}

/// Unwrap a wrapped Vault client token
/// Create wrapped token with:
/// vault write -wrap-ttl=300s -f auth/approle/role/meetmatch/secret-id
/// # Errors
/// Returns an error if the Vault request fails or the response has no `secret_id`.
#[instrument(skip(token))]
pub async fn unwrap(url: &str, token: &str) -> Result<String> {
    let unwrap_url = endpoint_url(url, "/v1/sys/wrapping/unwrap")?;

    let span = info_span!(
        "vault.unwrap",
        http.method = "POST",
        url = %unwrap_url
    );
    let response = client()?
        .post(&unwrap_url)
        .header("X-Vault-Token", token)
        .send()
        .instrument(span)
        .await?;
    let response = ensure_success(&unwrap_url, response).await?;

    let json_response: Value = response.json().await?;
    let sid = json_response
        .get("data")
        .and_then(|v| v.get("secret_id"))
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("Error parsing JSON response: no secret_id found"))?;

    Ok(sid.to_string())
}

/// Login to Vault using `AppRole`, returning the client token and its lease in seconds.
/// # Errors
/// Returns an error if the Vault request fails or the response has no `client_token`.
#[instrument(skip(sid))]
pub async fn approle_login(url: &str, sid: &str, rid: &str) -> Result<(SecretString, u64)> {
    let login_payload = json!({
        "role_id": rid,
        "secret_id": sid
    });

    debug!("login URL: {}, role ID: {}", url, rid);

    let span = info_span!(
        "vault.approle_login",
        http.method = "POST",
        url = %url
    );
    let response = client()?
        .post(url)
        .json(&login_payload)
        .send()
        .instrument(span)
        .await?;
    let response = ensure_success(url, response).await?;

    let json_response: Value = response.json().await?;
    let token = json_response
        .get("auth")
        .and_then(|v| v.get("client_token"))
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("Error parsing JSON response: no client_token found"))?;
    let lease_duration = json_response
        .get("auth")
        .and_then(|v| v.get("lease_duration"))
        .and_then(Value::as_u64)
        .unwrap_or(1800);

    Ok((SecretString::from(token.to_string()), lease_duration))
}

/// Renew the current Vault token, returning the new lease in seconds.
/// # Errors
/// Returns an error if the Vault request fails or the response has no `lease_duration`.
#[instrument(skip(token))]
pub async fn renew_token(url: &str, token: &SecretString) -> Result<u64> {
    let renew_url = endpoint_url(url, "/v1/auth/token/renew-self")?;

    let span = info_span!(
        "vault.renew_token",
        http.method = "POST",
        url = %renew_url
    );
    let response = client()?
        .post(&renew_url)
        .json(&json!({ "increment": 0 }))
        .header("X-Vault-Token", token.expose_secret())
        .send()
        .instrument(span)
        .await?;
    let response = ensure_success(&renew_url, response).await?;

    let json_response: Value = response.json().await?;

    json_response
        .get("auth")
        .and_then(|v| v.get("lease_duration"))
        .and_then(Value::as_u64)
        .ok_or_else(|| anyhow!("Error parsing JSON response: no lease_duration found"))
}

/// Renew a dynamic database lease, returning the new lease in seconds.
/// # Errors
/// Returns an error if the Vault request fails or the response has no `lease_duration`.
#[instrument(skip(token))]
pub async fn renew_lease(
    url: &str,
    token: &SecretString,
    lease_id: &str,
    increment: u64,
) -> Result<u64> {
    let renew_url = endpoint_url(url, "/v1/sys/leases/renew")?;

    let span = info_span!(
        "vault.renew_lease",
        http.method = "POST",
        url = %renew_url
    );
    let response = client()?
        .post(&renew_url)
        .json(&json!({
            "increment": increment,
            "lease_id": lease_id
        }))
        .header("X-Vault-Token", token.expose_secret())
        .send()
        .instrument(span)
        .await?;
    let response = ensure_success(&renew_url, response).await?;

    let json_response: Value = response.json().await?;

    json_response
        .get("lease_duration")
        .and_then(Value::as_u64)
        .ok_or_else(|| anyhow!("Error parsing JSON response: no lease_duration found"))
}

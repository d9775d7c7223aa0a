use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use student_living_common::{AuthEvent, Principal, SessionMetadata};
use tokio::sync::mpsc;

use super::{AuthStateNotifier, IdentityError, IdentityProvider, SignInOptions};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
    /// Token lifetime in seconds, sent as a string.
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// The subset of ID token claims we surface as session metadata.
#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    #[serde(default)]
    iat: Option<i64>,
    #[serde(default)]
    exp: Option<i64>,
}

/// Identity provider backed by an Identity-Toolkit style REST API.
pub struct RestIdentityProvider {
    http_client: Client,
    sign_in_url: String,
    api_key: String,
    notifier: AuthStateNotifier,
}

impl RestIdentityProvider {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, IdentityError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IdentityError::Communication(e.to_string()))?;

        Ok(Self {
            http_client,
            sign_in_url: format!(
                "{}/v1/accounts:signInWithPassword",
                base_url.trim_end_matches('/')
            ),
            api_key: api_key.to_string(),
            notifier: AuthStateNotifier::new(),
        })
    }

    /// Principal of the current provider session, if any.
    pub fn current_principal(&self) -> Option<Principal> {
        self.notifier.current()
    }
}

/// Map a provider error code (e.g. `TOO_MANY_ATTEMPTS_TRY_LATER : detail`).
fn map_error_message(message: &str) -> IdentityError {
    let code = message.split(" : ").next().unwrap_or(message).trim();
    match code {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "INVALID_EMAIL" => {
            IdentityError::InvalidCredentials
        }
        "USER_DISABLED" => IdentityError::UserDisabled,
        "TOO_MANY_ATTEMPTS_TRY_LATER" => IdentityError::TooManyAttempts,
        _ => IdentityError::Provider(message.to_string()),
    }
}

/// Read issued-at and expiry from the ID token.
///
/// The token arrives directly from the provider over TLS, so only the
/// claims are read here.
fn decode_token_times(id_token: &str) -> Option<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    match decode::<IdTokenClaims>(id_token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(data) => Some((
            data.claims.iat.and_then(|s| DateTime::from_timestamp(s, 0)),
            data.claims.exp.and_then(|s| DateTime::from_timestamp(s, 0)),
        )),
        Err(e) => {
            tracing::warn!("Failed to read ID token claims: {}", e);
            None
        }
    }
}

fn session_metadata(response: &SignInResponse, options: SignInOptions) -> SessionMetadata {
    let (issued_at, expires_at) = response
        .id_token
        .as_deref()
        .and_then(decode_token_times)
        .unwrap_or((None, None));

    let expires_at = expires_at.or_else(|| {
        let secs: i64 = response.expires_in.as_deref()?.parse().ok()?;
        let lifetime = chrono::Duration::try_seconds(secs)?;
        let expires_at = issued_at.unwrap_or_else(Utc::now).checked_add_signed(lifetime);
        if expires_at.is_none() {
            tracing::warn!(expires_in = secs, "Ignoring out-of-range token lifetime");
        }
        expires_at
    });

    SessionMetadata {
        issued_at,
        expires_at,
        persistent: options.remember_me,
    }
}

#[async_trait]
impl IdentityProvider for RestIdentityProvider {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<AuthEvent> {
        self.notifier.subscribe()
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
        options: SignInOptions,
    ) -> Result<Principal, IdentityError> {
        let response = self
            .http_client
            .post(&self.sign_in_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&SignInRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|e| IdentityError::Communication(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| IdentityError::Communication(e.to_string()))?;
            return Err(match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(envelope) => map_error_message(&envelope.error.message),
                Err(_) => IdentityError::Provider(format!("HTTP {}: {}", status, body)),
            });
        }

        let body: SignInResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Communication(e.to_string()))?;

        let principal = Principal {
            id: body.local_id.clone(),
            display_name: body.display_name.clone().filter(|name| !name.is_empty()),
            email: body.email.clone().or_else(|| Some(email.to_string())),
            session: Some(session_metadata(&body, options)),
        };

        tracing::info!(principal_id = %principal.id, "Signed in with password");
        self.notifier.publish(Some(principal.clone()));
        Ok(principal)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        if let Some(principal) = self.notifier.current() {
            tracing::info!(principal_id = %principal.id, "Signed out");
        }
        self.notifier.publish(None);
        Ok(())
    }
}

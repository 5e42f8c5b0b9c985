use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::debug;

use super::services::normalize_email;

const GOOGLE_CERTS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Identity asserted by an external provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub subject: String,
    pub email: String,
    pub name: String,
}

/// Exchanges a client-presented identity token for a verified identity.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> anyhow::Result<VerifiedIdentity>;
}

/// Verifies Google ID tokens against Google's published signing keys.
pub struct GoogleVerifier {
    client_id: String,
    certs_url: String,
    http: reqwest::Client,
}

impl GoogleVerifier {
    pub fn new(client_id: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("build http client")?;
        Ok(Self {
            client_id: client_id.into(),
            certs_url: GOOGLE_CERTS_URL.to_string(),
            http,
        })
    }

    async fn fetch_keys(&self) -> anyhow::Result<JwkSet> {
        self.http
            .get(&self.certs_url)
            .send()
            .await
            .context("fetch google certs")?
            .error_for_status()
            .context("google certs status")?
            .json::<JwkSet>()
            .await
            .context("decode google certs")
    }
}

#[async_trait]
impl IdentityVerifier for GoogleVerifier {
    async fn verify(&self, id_token: &str) -> anyhow::Result<VerifiedIdentity> {
        let header = decode_header(id_token).context("decode id token header")?;
        let kid = header.kid.context("id token has no key id")?;

        let keys = self.fetch_keys().await?;
        let jwk = keys.find(&kid).context("id token signed with unknown key")?;
        let key = DecodingKey::from_jwk(jwk).context("unusable google key")?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(std::slice::from_ref(&self.client_id));
        validation.set_issuer(&GOOGLE_ISSUERS);

        let data = decode::<GoogleClaims>(id_token, &key, &validation)
            .context("id token rejected")?;
        let identity = data.claims.into_identity()?;
        debug!(subject = %identity.subject, "google identity verified");
        Ok(identity)
    }
}

#[derive(Debug, Deserialize)]
struct GoogleClaims {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
    name: Option<String>,
}

impl GoogleClaims {
    fn into_identity(self) -> anyhow::Result<VerifiedIdentity> {
        anyhow::ensure!(!self.sub.is_empty(), "id token has no subject");
        anyhow::ensure!(self.email_verified != Some(false), "email is not verified");
        let email = self
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|e| !e.is_empty())
            .context("id token has no email")?;
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
        Ok(VerifiedIdentity {
            subject: self.sub,
            email,
            name,
        })
    }
}

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use std::fmt;

use crate::error::CredentialError;

pub const TOKEN_AUDIENCE: &str = "/admin/";
pub const TOKEN_LIFETIME_SECS: i64 = 5 * 60;
pub const AUTH_SCHEME: &str = "Ghost";

/// An Admin API key split into its id and decoded secret.
///
/// Parsing is the only constructor, so a `Credential` in hand always signs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    key_id: String,
    secret: Vec<u8>,
}

impl Credential {
    pub fn parse(raw: &str) -> Result<Self, CredentialError> {
        let raw = raw.trim();
        let mut parts = raw.split(':');
        let (key_id, secret) = match (parts.next(), parts.next(), parts.next()) {
            (Some(id), Some(secret), None) => (id, secret),
            (_, None, _) => return Err(CredentialError::MissingSeparator),
            _ => return Err(CredentialError::TooManySeparators),
        };

        if key_id.is_empty() {
            return Err(CredentialError::EmptyKeyId);
        }
        if secret.is_empty() {
            return Err(CredentialError::EmptySecret);
        }

        let secret = hex::decode(secret).map_err(|_| CredentialError::InvalidHex)?;

        Ok(Self {
            key_id: key_id.to_string(),
            secret,
        })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Mint a fresh token valid for five minutes from now.
    pub fn sign_token(&self) -> String {
        self.sign_token_at(Utc::now())
    }

    pub fn sign_token_at(&self, now: DateTime<Utc>) -> String {
        let header = TokenHeader {
            alg: "HS256",
            kid: &self.key_id,
            typ: "JWT",
        };
        let iat = now.timestamp();
        let claims = TokenClaims {
            iat,
            exp: (now + Duration::seconds(TOKEN_LIFETIME_SECS)).timestamp(),
            aud: TOKEN_AUDIENCE,
        };

        // Both structs contain only strings and integers.
        let header = serde_json::to_vec(&header).unwrap_or_default();
        let claims = serde_json::to_vec(&claims).unwrap_or_default();

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(claims)
        );
        let signature = sign_bytes(&self.secret, signing_input.as_bytes());
        format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature))
    }

    pub fn authorization_header(&self) -> String {
        format!("{} {}", AUTH_SCHEME, self.sign_token())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("key_id", &self.key_id)
            .field("secret", &"**REDACTED**")
            .finish()
    }
}

#[derive(Serialize)]
struct TokenHeader<'a> {
    alg: &'static str,
    kid: &'a str,
    typ: &'static str,
}

#[derive(Serialize)]
struct TokenClaims {
    iat: i64,
    exp: i64,
    aud: &'static str,
}

/// HMAC-SHA256 over `data`.
///
/// Note: new_from_slice only fails for algorithms with key length constraints.
/// SHA256 accepts any key length, so this is infallible in practice.
fn sign_bytes(secret: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret)
        .expect("HMAC-SHA256 accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// JWT Claims structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Username
    pub exp: i64,    // Expiration timestamp
}

impl Claims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Sign a session token for `username`, valid for `hours`.
///
/// Returns the token together with its expiry.
pub fn sign(username: &str, secret: &str, hours: i64) -> Result<(String, DateTime<Utc>)> {
    let expires_at = Utc::now()
        .checked_add_signed(Duration::hours(hours))
        .ok_or_else(|| anyhow!("session lifetime of {hours}h overflows"))?;

    let claims = Claims {
        sub: username.to_owned(),
        exp: expires_at.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok((token, expires_at))
}

/// Verify and decode a session token.
pub fn verify(token: &str, secret: &str) -> Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

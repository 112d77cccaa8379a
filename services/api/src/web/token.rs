//! services/api/src/web/token.rs
//!
//! Issuing and decoding the HS256 bearer tokens handed out at login.

use chrono::{DateTime, Duration, Utc};
use guroosh_core::Role;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

pub fn issue_token(
    secret: &str,
    ttl: Duration,
    user_id: Uuid,
    role: Role,
    now: DateTime<Utc>,
) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id,
        role,
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

/// Decodes and validates a token, including its expiry.
pub fn decode_token(secret: &str, token: &str) -> Result<Claims, ApiError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::errors::ErrorKind;

    #[test]
    fn tokens_round_trip() {
        let user_id = Uuid::new_v4();
        let token = issue_token("secret", Duration::hours(1), user_id, Role::Advisor, Utc::now()).unwrap();
        let claims = decode_token("secret", &token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, Role::Advisor);
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let issued = Utc::now() - Duration::days(2);
        let token = issue_token("secret", Duration::hours(1), Uuid::new_v4(), Role::User, issued).unwrap();
        match decode_token("secret", &token) {
            Err(ApiError::Token(e)) => assert!(matches!(e.kind(), ErrorKind::ExpiredSignature)),
            other => panic!("expected an expired token error, got {:?}", other),
        }
    }

    #[test]
    fn foreign_signatures_are_rejected() {
        let token = issue_token("secret", Duration::hours(1), Uuid::new_v4(), Role::User, Utc::now()).unwrap();
        assert!(matches!(decode_token("other", &token), Err(ApiError::Token(_))));
    }
}

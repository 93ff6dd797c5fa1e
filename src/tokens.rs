//! Bearer token issue/verify. Tokens are HS256 JWTs carrying the user id
//! and an absolute expiry 24 hours after issue; nothing is kept server-side.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
}

pub fn issue(user_id: &str, secret: &str) -> Result<String, AppError> {
    issue_with_ttl(user_id, secret, Duration::hours(TOKEN_TTL_HOURS))
}

pub(crate) fn issue_with_ttl(
    user_id: &str,
    secret: &str,
    ttl: Duration,
) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (Utc::now() + ttl).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AppError::TokenIssue)
}

/// Returns the embedded user id. Malformed or mis-signed tokens and expired
/// tokens surface as distinct errors; both reject the request.
pub fn verify(token: &str, secret: &str) -> Result<String, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|err| match err.kind() {
        ErrorKind::ExpiredSignature => AppError::ExpiredToken,
        _ => AppError::InvalidToken,
    })?;

    Ok(data.claims.sub)
}

#[cfg(test)]
mod tests {
    use super::{issue, issue_with_ttl, verify};
    use crate::error::AppError;
    use chrono::Duration;

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn test_roundtrip_returns_user_id() {
        let token = issue("user-42", SECRET).unwrap();
        assert_eq!(verify(&token, SECRET).unwrap(), "user-42");
    }

    #[test]
    fn test_garbage_is_invalid() {
        assert!(matches!(
            verify("not-a-token", SECRET),
            Err(AppError::InvalidToken)
        ));
        assert!(matches!(verify("", SECRET), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = issue("user-42", "other-secret").unwrap();
        assert!(matches!(
            verify(&token, SECRET),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_tampered_token_is_invalid() {
        let token = issue("user-42", SECRET).unwrap();
        let mut tampered = token.clone();
        tampered.pop();
        tampered.push('x');
        assert!(matches!(
            verify(&tampered, SECRET),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token_is_distinct() {
        // Well past the validator's default leeway.
        let token = issue_with_ttl("user-42", SECRET, Duration::hours(-2)).unwrap();
        assert!(matches!(
            verify(&token, SECRET),
            Err(AppError::ExpiredToken)
        ));
    }
}

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Errors raised while setting up or issuing identities
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("JWT secret must be at least 32 characters")]
    WeakSecret,

    #[error("Failed to issue token: {0}")]
    Issue(#[from] jsonwebtoken::errors::Error),

    #[error("System time error: {0}")]
    Clock(String),
}

/// Resolves the identity behind a request's credentials.
///
/// Core operations never ask "who is logged in"; the outer layer resolves
/// the actor once through this trait and passes the id explicitly.
pub trait IdentityProvider: Send + Sync {
    /// The user id behind `credentials` (a bearer token), if valid
    fn current_user_id(&self, credentials: Option<&str>) -> Option<String>;
}

/// Claims carried by session tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
}

/// HS256 session tokens issued by the auth service
#[derive(Clone)]
pub struct JwtIdentity {
    secret: String,
}

impl JwtIdentity {
    pub fn new(secret: String) -> Result<Self, IdentityError> {
        if secret.len() < 32 {
            return Err(IdentityError::WeakSecret);
        }
        Ok(Self { secret })
    }

    /// Issue a token for `user_id` valid for `ttl_secs`
    pub fn issue(&self, user_id: &str, ttl_secs: u64) -> Result<String, IdentityError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| IdentityError::Clock(e.to_string()))?
            .as_secs();

        let claims = Claims {
            sub: user_id.to_string(),
            iat: now,
            exp: now + ttl_secs,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?)
    }
}

impl IdentityProvider for JwtIdentity {
    fn current_user_id(&self, credentials: Option<&str>) -> Option<String> {
        let token = credentials?;

        match decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(data) if !data.claims.sub.is_empty() => Some(data.claims.sub),
            Ok(_) => None,
            Err(err) => {
                use jsonwebtoken::errors::ErrorKind;
                let reason = match err.kind() {
                    ErrorKind::ExpiredSignature => "Token expired",
                    ErrorKind::InvalidSignature => "Invalid signature",
                    _ => "Token validation failed",
                };
                tracing::debug!("Rejected bearer token: {}", reason);
                None
            }
        }
    }
}

/// Always resolves to the same user, whatever the credentials
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    user_id: Option<String>,
}

impl StaticIdentity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    /// Nobody is signed in
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user_id(&self, _credentials: Option<&str>) -> Option<String> {
        self.user_id.clone()
    }
}

/// Token part of an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

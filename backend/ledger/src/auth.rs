//! # Authenticator
//!
//! Stateless bearer tokens. A token is an HS256 JWT carrying the user id,
//! username and role, valid for 24 hours. Nothing is stored server-side, so
//! a token stays usable until it expires even if the user's password changes.
//!
//! Passwords are hashed with Argon2id in PHC string format. Verification goes
//! through the `argon2` crate, which compares in constant time.
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    db::Store,
    error::{Error, Result},
    models::{Identity, Role, User},
    users,
};

pub const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: i64,
    username: String,
    role: Role,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: Identity,
}

#[derive(Clone)]
pub struct Authenticator {
    secret: String,
    ttl: Duration,
}

impl Authenticator {
    pub fn new(secret: impl Into<String>) -> Self {
        Self::with_ttl(secret, Duration::hours(TOKEN_TTL_HOURS))
    }

    pub fn with_ttl(secret: impl Into<String>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    pub fn issue(&self, identity: &Identity) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: identity.id,
            username: identity.username.clone(),
            role: identity.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?)
    }

    pub fn verify(&self, token: &str) -> Result<Identity> {
        verify(token, &self.secret)
    }

    pub async fn login(&self, store: &Store, username: &str, password: &str) -> Result<LoginResponse> {
        let Some(credentials) = users::find_credentials(store, username).await? else {
            warn!("Login attempt for unknown user");
            return Err(Error::InvalidCredentials);
        };

        if !verify_password(password, &credentials.password_hash)? {
            warn!("Login attempt with wrong password for {username}");
            return Err(Error::InvalidCredentials);
        }

        let user = Identity::from(credentials.user);
        let token = self.issue(&user)?;
        info!("{} logged in as {}", user.username, user.role);

        Ok(LoginResponse { token, user })
    }
}

/// Checks signature and expiry and recovers the identity a token was issued for.
pub fn verify(token: &str, secret: &str) -> Result<Identity> {
    let validation = Validation::new(Algorithm::HS256);

    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|_| Error::Unauthorized("Invalid or expired token".to_string()))?;

    Ok(Identity {
        id: data.claims.sub,
        username: data.claims.username,
        role: data.claims.role,
    })
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str> {
    let header = header.ok_or_else(|| Error::Unauthorized("Access token required".to_string()))?;

    match header.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(Error::Unauthorized("Malformed authorization header".to_string())),
    }
}

pub fn require_role(identity: &Identity, role: Role) -> Result<()> {
    if identity.role == role {
        Ok(())
    } else {
        Err(Error::Forbidden(format!("{} access required", capitalize(role.as_str()))))
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Hash(e.to_string()))
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(password_hash).map_err(|e| Error::Hash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

impl From<User> for Identity {
    fn from(user: User) -> Self {
        Identity {
            id: user.id,
            username: user.username,
            role: user.role,
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_store;

    fn identity(role: Role) -> Identity {
        Identity {
            id: 7,
            username: "kpipe".to_string(),
            role,
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let auth = Authenticator::new("secret");
        let token = auth.issue(&identity(Role::Committee)).unwrap();

        assert_eq!(verify(&token, "secret").unwrap(), identity(Role::Committee));
    }

    #[test]
    fn test_verify_rejects_bad_tokens() {
        let auth = Authenticator::new("secret");
        let token = auth.issue(&identity(Role::Admin)).unwrap();

        assert!(matches!(verify(&token, "other"), Err(Error::Unauthorized(_))));
        assert!(matches!(verify("not.a.token", "secret"), Err(Error::Unauthorized(_))));
        assert!(matches!(verify("", "secret"), Err(Error::Unauthorized(_))));

        // Someone else's claims under this token's signature.
        let other = auth.issue(&identity(Role::Committee)).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let tampered = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);
        assert!(matches!(verify(&tampered, "secret"), Err(Error::Unauthorized(_))));
    }

    #[test]
    fn test_verify_rejects_expired() {
        let auth = Authenticator::with_ttl("secret", Duration::hours(-2));
        let token = auth.issue(&identity(Role::Admin)).unwrap();

        assert!(matches!(auth.verify(&token), Err(Error::Unauthorized(_))));
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(Some("Bearer abc")).unwrap(), "abc");
        assert!(bearer_token(None).is_err());
        assert!(bearer_token(Some("abc")).is_err());
        assert!(bearer_token(Some("Basic abc")).is_err());
        assert!(bearer_token(Some("Bearer ")).is_err());
    }

    #[test]
    fn test_require_role() {
        assert!(require_role(&identity(Role::Admin), Role::Admin).is_ok());

        let err = require_role(&identity(Role::Committee), Role::Admin).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
        assert_eq!(err.to_string(), "Admin access required");
    }

    #[test]
    fn test_password_hashing() {
        let hash = hash_password("hunter22").unwrap();

        assert_ne!(hash, "hunter22");
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }

    #[tokio::test]
    async fn test_login() {
        let store = test_store().await;
        users::create_user(&store, "admin", "password1", Role::Admin).await.unwrap();
        let auth = Authenticator::new("secret");

        let response = auth.login(&store, "admin", "password1").await.unwrap();
        assert_eq!(response.user.username, "admin");
        assert_eq!(auth.verify(&response.token).unwrap(), response.user);

        assert!(matches!(
            auth.login(&store, "admin", "wrong-pass").await,
            Err(Error::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login(&store, "nobody", "password1").await,
            Err(Error::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login(&store, "Admin", "password1").await,
            Err(Error::InvalidCredentials)
        ));
    }
}

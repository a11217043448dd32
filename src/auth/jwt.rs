use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::ROLE_ADMIN;
use crate::config::JwtConfig;
use crate::error::AppError;
use crate::state::AppState;

/// Claims carried by every issued token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,    // user ID
    pub role: String, // admin or user
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
}

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub expiry: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            issuer,
            expiry_hours,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            expiry: Duration::from_secs((expiry_hours as u64) * 3600),
        }
    }
}

impl JwtKeys {
    pub fn sign(&self, user_id: Uuid, role: &str) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.expiry.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            role: role.to_string(),
            exp: exp.unix_timestamp() as usize,
            iat: now.unix_timestamp() as usize,
            iss: self.issuer.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, role, "jwt signed");
        Ok(token)
    }

    /// Verify signature, expiry, issuer and algorithm; only HS256 is accepted.
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

/// Authenticated caller extracted from the bearer token.
#[derive(Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("Invalid Authorization header"))?;

        let claims = match keys.verify(token) {
            Ok(c) => c,
            Err(_) => {
                warn!("invalid or expired token");
                return Err(AppError::unauthorized("Invalid or expired token"));
            }
        };

        Ok(AuthUser {
            id: claims.sub,
            role: claims.role,
        })
    }
}

/// Caller whose token carries the admin role.
#[derive(Debug)]
pub struct AdminUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != ROLE_ADMIN {
            return Err(AppError::forbidden("Administrator access required"));
        }
        Ok(AdminUser(user.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ROLE_USER;
    use axum::http::Request;

    fn make_keys() -> JwtKeys {
        let state = AppState::fake();
        JwtKeys::from_ref(&state)
    }

    #[tokio::test]
    async fn sign_and_verify_roundtrip() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id, ROLE_USER).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, ROLE_USER);
        assert_eq!(claims.iss, "test-issuer");
    }

    #[tokio::test]
    async fn verify_rejects_other_secret() {
        let keys = make_keys();
        let other = JwtKeys {
            encoding: EncodingKey::from_secret(b"other-secret"),
            decoding: DecodingKey::from_secret(b"other-secret"),
            issuer: "test-issuer".into(),
            expiry: Duration::from_secs(3600),
        };
        let token = other.sign(Uuid::new_v4(), ROLE_USER).expect("sign");
        assert!(keys.verify(&token).is_err());
    }

    #[tokio::test]
    async fn verify_rejects_expired_token() {
        let keys = make_keys();
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: Uuid::new_v4(),
            role: ROLE_USER.into(),
            exp: (now - TimeDuration::hours(2)).unix_timestamp() as usize,
            iat: (now - TimeDuration::hours(3)).unix_timestamp() as usize,
            iss: "test-issuer".into(),
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).expect("encode");
        assert!(keys.verify(&token).is_err());
    }

    #[tokio::test]
    async fn verify_rejects_wrong_algorithm() {
        let keys = make_keys();
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: Uuid::new_v4(),
            role: ROLE_USER.into(),
            exp: (now + TimeDuration::hours(1)).unix_timestamp() as usize,
            iat: now.unix_timestamp() as usize,
            iss: "test-issuer".into(),
        };
        let token =
            encode(&Header::new(Algorithm::HS384), &claims, &keys.encoding).expect("encode");
        assert!(keys.verify(&token).is_err());
    }

    #[tokio::test]
    async fn verify_rejects_wrong_issuer() {
        let keys = make_keys();
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: Uuid::new_v4(),
            role: ROLE_USER.into(),
            exp: (now + TimeDuration::hours(1)).unix_timestamp() as usize,
            iat: now.unix_timestamp() as usize,
            iss: "someone-else".into(),
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).expect("encode");
        assert!(keys.verify(&token).is_err());
    }

    #[tokio::test]
    async fn verify_rejects_malformed_tokens() {
        let keys = make_keys();
        assert!(keys.verify("not-a-jwt").is_err());
        assert!(keys.verify("a.b").is_err());
        assert!(keys.verify("").is_err());
    }

    #[tokio::test]
    async fn auth_extractor_accepts_valid_bearer_token() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id, ROLE_USER).expect("sign");

        let request = Request::builder()
            .header("Authorization", format!("Bearer {token}"))
            .body(())
            .expect("request");
        let (mut parts, _) = request.into_parts();

        let user = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .expect("extract");
        assert_eq!(user.id, user_id);
        assert_eq!(user.role, ROLE_USER);
    }

    #[tokio::test]
    async fn auth_extractor_rejects_missing_header() {
        let state = AppState::fake();
        let request = Request::builder().body(()).expect("request");
        let (mut parts, _) = request.into_parts();

        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn admin_extractor_rejects_plain_user() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let token = keys.sign(Uuid::new_v4(), ROLE_USER).expect("sign");

        let request = Request::builder()
            .header("Authorization", format!("Bearer {token}"))
            .body(())
            .expect("request");
        let (mut parts, _) = request.into_parts();

        let err = AdminUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn admin_extractor_accepts_admin_token() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let admin_id = Uuid::new_v4();
        let token = keys.sign(admin_id, ROLE_ADMIN).expect("sign");

        let request = Request::builder()
            .header("Authorization", format!("Bearer {token}"))
            .body(())
            .expect("request");
        let (mut parts, _) = request.into_parts();

        let AdminUser(id) = AdminUser::from_request_parts(&mut parts, &state)
            .await
            .expect("extract");
        assert_eq!(id, admin_id);
    }
}

use std::time::Duration;

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::de::DeserializeOwned;
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::{AccessClaims, RefreshClaims, TokenKind};
use crate::config::{JwtConfig, MAX_TOKEN_TTL_MINUTES};

/// Why a token failed verification.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Signing and verification keys for both token kinds. Built once at startup.
pub struct JwtKeys {
    access: KeyPair,
    refresh: KeyPair,
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

fn ttl_from_minutes(minutes: i64) -> Duration {
    Duration::from_secs(minutes.clamp(0, MAX_TOKEN_TTL_MINUTES) as u64 * 60)
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            access: KeyPair::from_secret(&cfg.access_secret),
            refresh: KeyPair::from_secret(&cfg.refresh_secret),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            access_ttl: ttl_from_minutes(cfg.access_ttl_minutes),
            refresh_ttl: ttl_from_minutes(cfg.refresh_ttl_minutes),
        }
    }

    fn window(&self, now: OffsetDateTime, ttl: Duration) -> (usize, usize) {
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        (now.unix_timestamp() as usize, exp.unix_timestamp() as usize)
    }

    pub fn sign_access(&self, user_id: Uuid, username: &str, email: &str) -> anyhow::Result<String> {
        self.sign_access_at(user_id, username, email, OffsetDateTime::now_utc())
    }

    pub fn sign_access_at(
        &self,
        user_id: Uuid,
        username: &str,
        email: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<String> {
        let (iat, exp) = self.window(now, self.access_ttl);
        let claims = AccessClaims {
            sub: user_id,
            jti: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            iat,
            exp,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind: TokenKind::Access,
        };
        let token = encode(&Header::default(), &claims, &self.access.encoding)?;
        debug!(user_id = %user_id, kind = ?TokenKind::Access, "jwt signed");
        Ok(token)
    }

    pub fn sign_refresh(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign_refresh_at(user_id, OffsetDateTime::now_utc())
    }

    pub fn sign_refresh_at(&self, user_id: Uuid, now: OffsetDateTime) -> anyhow::Result<String> {
        let (iat, exp) = self.window(now, self.refresh_ttl);
        let claims = RefreshClaims {
            sub: user_id,
            jti: Uuid::new_v4(),
            iat,
            exp,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind: TokenKind::Refresh,
        };
        let token = encode(&Header::default(), &claims, &self.refresh.encoding)?;
        debug!(user_id = %user_id, kind = ?TokenKind::Refresh, "jwt signed");
        Ok(token)
    }

    fn decode_with<T: DeserializeOwned>(
        &self,
        token: &str,
        key: &DecodingKey,
    ) -> Result<T, TokenError> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        decode::<T>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let claims: AccessClaims = self.decode_with(token, &self.access.decoding)?;
        if claims.kind != TokenKind::Access {
            return Err(TokenError::Invalid);
        }
        debug!(user_id = %claims.sub, "access token verified");
        Ok(claims)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let claims: RefreshClaims = self.decode_with(token, &self.refresh.decoding)?;
        if claims.kind != TokenKind::Refresh {
            return Err(TokenError::Invalid);
        }
        debug!(user_id = %claims.sub, "refresh token verified");
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys() -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            access_secret: "access-secret".into(),
            refresh_secret: "refresh-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            access_ttl_minutes: 15,
            refresh_ttl_minutes: 60 * 24 * 30,
        })
    }

    #[test]
    fn sign_and_verify_access_token() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign_access(user_id, "alice", "a@x.com").expect("sign access");
        let claims = keys.verify_access(&token).expect("verify access");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.kind, TokenKind::Access);
    }

    #[test]
    fn sign_and_verify_refresh_token() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign_refresh(user_id).expect("sign refresh");
        let claims = keys.verify_refresh(&token).expect("verify refresh");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.kind, TokenKind::Refresh);
    }

    #[test]
    fn huge_lifetimes_are_clamped() {
        let keys = JwtKeys::from_config(&JwtConfig {
            access_secret: "access-secret".into(),
            refresh_secret: "refresh-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            access_ttl_minutes: i64::MAX,
            refresh_ttl_minutes: -5,
        });
        assert_eq!(keys.access_ttl.as_secs(), MAX_TOKEN_TTL_MINUTES as u64 * 60);
        assert_eq!(keys.refresh_ttl.as_secs(), 0);
        let token = keys.sign_access(Uuid::new_v4(), "erin", "e@x.com").unwrap();
        assert!(keys.verify_access(&token).is_ok());
    }

    #[test]
    fn tokens_issued_together_are_distinct() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let a = keys.sign_refresh(user_id).unwrap();
        let b = keys.sign_refresh(user_id).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn token_kinds_are_not_interchangeable() {
        let keys = make_keys();
        let access = keys.sign_access(Uuid::new_v4(), "bob", "b@x.com").unwrap();
        let refresh = keys.sign_refresh(Uuid::new_v4()).unwrap();
        assert_eq!(keys.verify_refresh(&access).unwrap_err(), TokenError::Invalid);
        assert_eq!(keys.verify_access(&refresh).unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn expired_tokens_are_reported_as_expired() {
        let keys = make_keys();
        let long_ago = OffsetDateTime::now_utc() - TimeDuration::days(31);
        let refresh = keys.sign_refresh_at(Uuid::new_v4(), long_ago).unwrap();
        assert_eq!(keys.verify_refresh(&refresh).unwrap_err(), TokenError::Expired);

        let access = keys
            .sign_access_at(Uuid::new_v4(), "carol", "c@x.com", long_ago)
            .unwrap();
        assert_eq!(keys.verify_access(&access).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn garbage_and_foreign_tokens_are_invalid() {
        let keys = make_keys();
        assert_eq!(keys.verify_access("not.a.jwt").unwrap_err(), TokenError::Invalid);

        let other = JwtKeys::from_config(&JwtConfig {
            access_secret: "someone-else".into(),
            refresh_secret: "someone-else-refresh".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            access_ttl_minutes: 15,
            refresh_ttl_minutes: 60,
        });
        let token = other.sign_refresh(Uuid::new_v4()).unwrap();
        assert_eq!(keys.verify_refresh(&token).unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn verify_rejects_wrong_issuer_or_audience() {
        let good = make_keys();
        let mut bad = make_keys();
        bad.issuer = "bad-iss".into();
        bad.audience = "bad-aud".into();
        let token = good.sign_access(Uuid::new_v4(), "dave", "d@x.com").unwrap();
        assert_eq!(bad.verify_access(&token).unwrap_err(), TokenError::Invalid);
    }
}

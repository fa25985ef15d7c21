use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::types::{Claims, TokenKind};
use crate::config::JwtSettings;
use crate::shared::AppError;
use crate::user::models::Role;

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SigningKeys {
    fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(ttl_secs),
        }
    }
}

/// Signs and verifies access and refresh tokens with independent secrets and lifetimes
pub struct TokenCodec {
    access: SigningKeys,
    refresh: SigningKeys,
}

impl TokenCodec {
    pub fn new(settings: &JwtSettings) -> Self {
        Self {
            access: SigningKeys::new(&settings.access_secret, settings.access_expiration_secs),
            refresh: SigningKeys::new(&settings.refresh_secret, settings.refresh_expiration_secs),
        }
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    pub fn ttl(&self, kind: TokenKind) -> Duration {
        self.keys(kind).ttl
    }

    /// Creates a signed token; only access tokens carry role names
    #[instrument(skip(self, roles))]
    pub fn sign(
        &self,
        kind: TokenKind,
        user_id: i64,
        username: &str,
        roles: &[Role],
    ) -> Result<String, AppError> {
        let keys = self.keys(kind);
        let now = Utc::now();
        let exp = (now + keys.ttl).timestamp().max(0) as usize;

        let claims = Claims {
            sub: username.to_string(),
            uid: user_id,
            roles: match kind {
                TokenKind::Access => roles.iter().map(|r| r.to_string()).collect(),
                TokenKind::Refresh => Vec::new(),
            },
            typ: kind,
            jti: Uuid::new_v4().to_string(),
            exp,
            iat: now.timestamp() as usize,
        };

        encode(&Header::default(), &claims, &keys.encoding).map_err(|e| {
            debug!(error = %e, "Failed to encode JWT token");
            AppError::Internal(format!("Failed to sign token: {}", e))
        })
    }

    /// Validates signature, expiry and kind, returning the claims
    #[instrument(skip(self, token))]
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, AppError> {
        let claims = decode::<Claims>(token, &self.keys(kind).decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Failed to decode JWT token");
                match e.kind() {
                    ErrorKind::ExpiredSignature => {
                        AppError::ExpiredToken("Jwt Token has expired".to_string())
                    }
                    _ => AppError::InvalidToken("Invalid Jwt Token".to_string()),
                }
            })?;

        if claims.typ != kind {
            debug!(expected = ?kind, actual = ?claims.typ, "Token kind mismatch");
            return Err(AppError::InvalidToken("Invalid Jwt Token".to_string()));
        }

        debug!(username = %claims.sub, exp = claims.exp, "JWT token decoded successfully");
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::test_jwt_settings;

    fn codec() -> TokenCodec {
        TokenCodec::new(&test_jwt_settings())
    }

    #[test]
    fn test_sign_and_verify_access_token() {
        let codec = codec();
        let token = codec
            .sign(TokenKind::Access, 7, "01012345673", &[Role::Admin, Role::User])
            .unwrap();

        let claims = codec.verify(&token, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, "01012345673");
        assert_eq!(claims.uid, 7);
        assert_eq!(claims.roles, vec!["ROLE_ADMIN", "ROLE_USER"]);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_refresh_token_has_no_roles_and_longer_life() {
        let codec = codec();
        let token = codec
            .sign(TokenKind::Refresh, 7, "01012345673", &[Role::Admin])
            .unwrap();

        let claims = codec.verify(&token, TokenKind::Refresh).unwrap();
        assert!(claims.roles.is_empty());
        assert!(codec.ttl(TokenKind::Refresh) > codec.ttl(TokenKind::Access));
    }

    #[test]
    fn test_kinds_do_not_cross_verify() {
        let codec = codec();
        let access = codec.sign(TokenKind::Access, 1, "u", &[]).unwrap();
        let refresh = codec.sign(TokenKind::Refresh, 1, "u", &[]).unwrap();

        assert!(matches!(
            codec.verify(&access, TokenKind::Refresh),
            Err(AppError::InvalidToken(_))
        ));
        assert!(matches!(
            codec.verify(&refresh, TokenKind::Access),
            Err(AppError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_kind_claim_checked_even_with_shared_secret() {
        let mut settings = test_jwt_settings();
        settings.refresh_secret = settings.access_secret.clone();
        let codec = TokenCodec::new(&settings);

        let refresh = codec.sign(TokenKind::Refresh, 1, "u", &[]).unwrap();
        assert!(matches!(
            codec.verify(&refresh, TokenKind::Access),
            Err(AppError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_expired_token() {
        let mut settings = test_jwt_settings();
        settings.access_expiration_secs = -3600;
        let codec = TokenCodec::new(&settings);

        let token = codec.sign(TokenKind::Access, 1, "u", &[]).unwrap();
        match codec.verify(&token, TokenKind::Access) {
            Err(AppError::ExpiredToken(msg)) => assert_eq!(msg, "Jwt Token has expired"),
            other => panic!("expected ExpiredToken, got {:?}", other),
        }
    }

    #[test]
    fn test_garbage_and_foreign_tokens_are_invalid() {
        let codec = codec();
        assert!(matches!(
            codec.verify("invalid.token.here", TokenKind::Access),
            Err(AppError::InvalidToken(_))
        ));

        let mut other_settings = test_jwt_settings();
        other_settings.access_secret = "someone-else".to_string();
        let foreign = TokenCodec::new(&other_settings)
            .sign(TokenKind::Access, 1, "u", &[])
            .unwrap();
        assert!(matches!(
            codec.verify(&foreign, TokenKind::Access),
            Err(AppError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_tokens_minted_together_differ() {
        let codec = codec();
        let first = codec.sign(TokenKind::Refresh, 1, "u", &[]).unwrap();
        let second = codec.sign(TokenKind::Refresh, 1, "u", &[]).unwrap();
        assert_ne!(first, second);
    }
}

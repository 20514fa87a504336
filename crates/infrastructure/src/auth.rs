//! JWT认证基础设施实现
//!
//! HS256 签名，`userId` 声明承载用户身份。请求处理层签发的令牌可能不带 `exp`，
//! 因此 `exp` 存在时才校验。

use application::{AuthError, TokenVerifier};
use config::JwtConfig;
use domain::UserId;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// JWT Claims 结构
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>, // 过期时间 (Unix timestamp)
}

/// JWT 令牌校验器
#[derive(Clone)]
pub struct JwtTokenVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtTokenVerifier {
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = true;
        validation.leeway = config.leeway_secs;

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
        }
    }

    /// 签发令牌，`ttl` 为 `None` 时不带过期时间
    pub fn issue(
        &self,
        user_id: &UserId,
        ttl: Option<Duration>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        // 超出可表示范围的 ttl 按不过期处理
        let exp = ttl
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .and_then(|ttl| chrono::Utc::now().checked_add_signed(ttl))
            .map(|expires_at| expires_at.timestamp());

        let claims = Claims {
            user_id: user_id.to_string(),
            exp,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
    }
}

impl TokenVerifier for JwtTokenVerifier {
    fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::invalid("token expired"),
                _ => AuthError::invalid(err.to_string()),
            })?;

        if claims.user_id.is_empty() {
            return Err(AuthError::invalid("empty userId claim"));
        }

        Ok(UserId::new(claims.user_id))
    }
}

use crate::error::{AppError, AppResult};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    #[serde(default)]
    pub role: Option<String>, // "admin" 为管理员
    pub exp: i64,
    pub iat: i64,
    pub token_type: String, // "access" or "refresh"
}

/// 认证层签发的调用方身份
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i64,
    pub is_admin: bool,
}

impl TryFrom<Claims> for AuthUser {
    type Error = AppError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let user_id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthError("Invalid subject in access token".to_string()))?;

        Ok(Self {
            user_id,
            is_admin: claims.role.as_deref() == Some("admin"),
        })
    }
}

/// 只负责校验，令牌由外部认证服务签发
#[derive(Clone)]
pub struct JwtService {
    decoding_key: DecodingKey,
    #[cfg(test)]
    encoding_key: jsonwebtoken::EncodingKey,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            #[cfg(test)]
            encoding_key: jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(AppError::JwtError)
    }

    pub fn verify_access_token(&self, token: &str) -> AppResult<AuthUser> {
        let claims = self.verify_token(token)?;

        if claims.token_type != "access" {
            return Err(AppError::AuthError("Invalid access token type".to_string()));
        }

        AuthUser::try_from(claims)
    }

    #[cfg(test)]
    pub fn issue_token(&self, user_id: i64, is_admin: bool, token_type: &str) -> String {
        let now = chrono::Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            role: is_admin.then(|| "admin".to_string()),
            exp: (now + chrono::Duration::hours(1)).timestamp(),
            iat: now.timestamp(),
            token_type: token_type.to_string(),
        };
        jsonwebtoken::encode(&jsonwebtoken::Header::default(), &claims, &self.encoding_key)
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_access_token() {
        let jwt = JwtService::new("secret");
        let token = jwt.issue_token(42, false, "access");
        let user = jwt.verify_access_token(&token).unwrap();
        assert_eq!(user.user_id, 42);
        assert!(!user.is_admin);

        let admin = jwt
            .verify_access_token(&jwt.issue_token(1, true, "access"))
            .unwrap();
        assert!(admin.is_admin);
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let jwt = JwtService::new("secret");
        let token = jwt.issue_token(42, false, "refresh");
        assert!(matches!(
            jwt.verify_access_token(&token),
            Err(AppError::AuthError(_))
        ));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = JwtService::new("secret").issue_token(42, false, "access");
        assert!(matches!(
            JwtService::new("other").verify_access_token(&token),
            Err(AppError::JwtError(_))
        ));
    }
}

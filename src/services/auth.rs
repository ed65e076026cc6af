// src/services/auth.rs

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::{auth::Claims, user::User},
};

const TOKEN_TTL_DAYS: i64 = 7;

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
}

/// bcrypt is CPU bound, so it runs on the blocking pool.
pub async fn hash_password(password: String) -> Result<String, AppError> {
    let hashed = tokio::task::spawn_blocking(move || hash(&password, DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("Password hashing task failed: {}", e))??;
    Ok(hashed)
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String) -> Self {
        Self { user_repo, jwt_secret }
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AppError::InvalidCredentials);
        }

        let password = password.to_owned();
        let password_hash = user.password_hash.clone();
        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
            .await
            .map_err(|e| anyhow::anyhow!("Password verification task failed: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        tracing::info!(user_id = user.id, "User logged in");
        self.create_token(user.id)
    }

    /// Decodes and checks the signature and expiry. No database access.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| AppError::InvalidToken)
    }

    pub async fn current_user(&self, user_id: i64) -> Result<User, AppError> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    pub fn create_token(&self, user_id: i64) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(TOKEN_TTL_DAYS);

        let claims = Claims {
            sub: user_id,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    fn service(secret: &str) -> AuthService {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        AuthService::new(UserRepository::new(pool), secret.to_string())
    }

    #[tokio::test]
    async fn tokens_round_trip_with_the_same_secret() {
        let auth = service("test-secret");
        let token = auth.create_token(42).unwrap();
        assert_eq!(auth.validate_token(&token).unwrap().sub, 42);
    }

    #[tokio::test]
    async fn tokens_from_another_secret_are_rejected() {
        let token = service("one").create_token(1).unwrap();
        assert!(matches!(
            service("two").validate_token(&token),
            Err(AppError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn hashed_passwords_verify() {
        let hashed = hash_password("secret1".to_string()).await.unwrap();
        assert!(verify("secret1", &hashed).unwrap());
        assert!(!verify("secret2", &hashed).unwrap());
    }
}

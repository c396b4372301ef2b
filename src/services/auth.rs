use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    config::Config,
    error::{AppError, AuthError},
    models::{
        auth::{Claims, RefreshClaims},
        user::{
            normalize_email, validate_email, validate_password, EmailTokenPurpose, LoginResponse,
            RefreshToken, RegisterRequest, User, UserProfile,
        },
    },
    services::email::EmailService,
};

const USER_COLS: &str =
    "id, email, password_hash, display_name, email_verified, created_at, updated_at";

/// SHA-256 hex of an emailed token. Only the digest is stored.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

fn app_link(base_url: &str, page: &str, token: &str) -> String {
    format!("{}/{page}?token={token}", base_url.trim_end_matches('/'))
}

pub struct AuthService;

impl AuthService {
    /// Create an unverified account and email a verification link.
    pub async fn register(
        pool: &PgPool,
        email_svc: Option<&EmailService>,
        config: &Config,
        req: &RegisterRequest,
    ) -> anyhow::Result<UserProfile> {
        validate_email(&req.email)?;
        validate_password(&req.password)?;
        let email = normalize_email(&req.email);

        let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(&email)
            .fetch_one(pool)
            .await?;
        if taken {
            return Err(AppError::validation("An account with this email already exists").into());
        }

        let password_hash = bcrypt::hash(&req.password, 12)?;
        let display_name = req
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, password_hash, display_name)
             VALUES ($1, $2, $3)
             RETURNING {USER_COLS}"
        ))
        .bind(&email)
        .bind(&password_hash)
        .bind(display_name)
        .fetch_one(pool)
        .await?;

        tracing::info!("registered user {}", user.id);
        Self::deliver_verification(pool, email_svc, config, &user).await;

        Ok(UserProfile::new(user, config.admin_email.as_deref()))
    }

    pub async fn login(
        pool: &PgPool,
        config: &Config,
        email: &str,
        password: &str,
    ) -> anyhow::Result<LoginResponse> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLS} FROM users WHERE email = $1"
        ))
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

        let valid = bcrypt::verify(password, &user.password_hash)
            .map_err(|_| AuthError::InvalidCredentials)?;
        if !valid {
            return Err(AuthError::InvalidCredentials.into());
        }
        if !user.email_verified {
            return Err(AuthError::EmailNotVerified.into());
        }

        Self::issue_tokens(pool, config, user).await
    }

    pub fn generate_access_token(user: &User, secret: &str, ttl_seconds: u64) -> anyhow::Result<String> {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            iat: now,
            exp: now + ttl_seconds as usize,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?;
        Ok(token)
    }

    fn generate_refresh_token(
        user_id: &Uuid,
        secret: &str,
        ttl_days: u64,
    ) -> anyhow::Result<(String, Uuid)> {
        let now = Utc::now().timestamp() as usize;
        let jti = Uuid::new_v4();
        let claims = RefreshClaims {
            sub: user_id.to_string(),
            jti: jti.to_string(),
            iat: now,
            exp: now + (ttl_days * 86400) as usize,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?;
        Ok((token, jti))
    }

    /// Access token plus a stored, revocable refresh token.
    async fn issue_tokens(pool: &PgPool, config: &Config, user: User) -> anyhow::Result<LoginResponse> {
        let access_token =
            Self::generate_access_token(&user, &config.jwt_secret, config.jwt_expiry_seconds)?;
        let (refresh_token, refresh_id) = Self::generate_refresh_token(
            &user.id,
            &config.jwt_refresh_secret,
            config.jwt_refresh_expiry_days,
        )?;

        let hash = bcrypt::hash(&refresh_token, 8)?;
        let expires_at = Utc::now() + chrono::Duration::days(config.jwt_refresh_expiry_days as i64);
        sqlx::query(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(refresh_id)
        .bind(user.id)
        .bind(hash)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(LoginResponse {
            access_token,
            refresh_token,
            user: UserProfile::new(user, config.admin_email.as_deref()),
        })
    }

    /// Rotate refresh token: revoke old, issue new pair.
    pub async fn refresh(
        pool: &PgPool,
        config: &Config,
        refresh_token_str: &str,
    ) -> anyhow::Result<LoginResponse> {
        let key = DecodingKey::from_secret(config.jwt_refresh_secret.as_bytes());
        let data = decode::<RefreshClaims>(
            refresh_token_str,
            &key,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| AuthError::InvalidToken)?;
        let rc = data.claims;
        let jti: Uuid = rc.jti.parse().map_err(|_| AuthError::InvalidToken)?;
        let user_id: Uuid = rc.sub.parse().map_err(|_| AuthError::InvalidToken)?;

        let stored = sqlx::query_as::<_, RefreshToken>(
            "SELECT * FROM refresh_tokens WHERE id = $1 AND user_id = $2 AND revoked = FALSE",
        )
        .bind(jti)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AuthError::InvalidToken)?;

        if stored.expires_at < Utc::now() {
            return Err(AuthError::InvalidToken.into());
        }
        if !bcrypt::verify(refresh_token_str, &stored.token_hash)? {
            return Err(AuthError::InvalidToken.into());
        }

        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = $1")
            .bind(jti)
            .execute(pool)
            .await?;

        let user = Self::find_user(pool, user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        Self::issue_tokens(pool, config, user).await
    }

    /// Revoke every refresh token the user holds.
    pub async fn logout(pool: &PgPool, user_id: Uuid) -> anyhow::Result<()> {
        let revoked = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = $1 AND revoked = FALSE",
        )
        .bind(user_id)
        .execute(pool)
        .await?
        .rows_affected();
        tracing::info!("user {} signed out, {} refresh token(s) revoked", user_id, revoked);
        Ok(())
    }

    pub async fn me(pool: &PgPool, config: &Config, user_id: Uuid) -> anyhow::Result<UserProfile> {
        let user = Self::find_user(pool, user_id)
            .await?
            .ok_or(AppError::NotFound("User"))?;
        Ok(UserProfile::new(user, config.admin_email.as_deref()))
    }

    /// Re-send a verification link. Succeeds silently for unknown or already
    /// verified addresses so the response reveals nothing about accounts.
    pub async fn send_verification_email(
        pool: &PgPool,
        email_svc: Option<&EmailService>,
        config: &Config,
        email: &str,
    ) -> anyhow::Result<()> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLS} FROM users WHERE email = $1 AND email_verified = FALSE"
        ))
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await?;

        if let Some(user) = user {
            Self::deliver_verification(pool, email_svc, config, &user).await;
        }
        Ok(())
    }

    pub async fn verify_email(pool: &PgPool, token: &str) -> anyhow::Result<()> {
        let user_id = Self::consume_token(pool, EmailTokenPurpose::VerifyEmail, token).await?;
        sqlx::query("UPDATE users SET email_verified = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        tracing::info!("email verified for user {}", user_id);
        Ok(())
    }

    /// Email a one-hour reset link. Unknown addresses are ignored silently.
    pub async fn send_password_reset(
        pool: &PgPool,
        email_svc: Option<&EmailService>,
        config: &Config,
        email: &str,
    ) -> anyhow::Result<()> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLS} FROM users WHERE email = $1"
        ))
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await?;

        let Some(user) = user else {
            return Ok(());
        };

        let token = Self::create_token(pool, user.id, EmailTokenPurpose::ResetPassword).await?;
        match email_svc {
            Some(svc) => {
                let url = app_link(&config.app_base_url, "reset-password", &token);
                if let Err(e) = svc.send_password_reset(&user.email, &url).await {
                    tracing::warn!("password reset email to user {} failed: {}", user.id, e);
                }
            }
            None => tracing::warn!("SMTP not configured, password reset for user {} not sent", user.id),
        }
        Ok(())
    }

    /// Verify token, hash new password, revoke all refresh tokens, mark token used.
    pub async fn reset_password(pool: &PgPool, token: &str, new_password: &str) -> anyhow::Result<()> {
        validate_password(new_password)?;
        let user_id = Self::consume_token(pool, EmailTokenPurpose::ResetPassword, token).await?;

        let password_hash = bcrypt::hash(new_password, 12)?;
        sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(&password_hash)
            .bind(user_id)
            .execute(pool)
            .await?;

        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;

        tracing::info!("password reset for user {}", user_id);
        Ok(())
    }

    async fn find_user(pool: &PgPool, user_id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }

    async fn deliver_verification(
        pool: &PgPool,
        email_svc: Option<&EmailService>,
        config: &Config,
        user: &User,
    ) {
        let Some(svc) = email_svc else {
            tracing::warn!("SMTP not configured, verification for user {} not sent", user.id);
            return;
        };
        let token = match Self::create_token(pool, user.id, EmailTokenPurpose::VerifyEmail).await {
            Ok(token) => token,
            Err(e) => {
                tracing::error!("could not create verification token for user {}: {}", user.id, e);
                return;
            }
        };
        let url = app_link(&config.app_base_url, "verify-email", &token);
        if let Err(e) = svc.send_verification(&user.email, &url).await {
            tracing::warn!("verification email to user {} failed: {}", user.id, e);
        }
    }

    /// Store a fresh single-use token, retiring earlier unused ones of the same purpose.
    async fn create_token(pool: &PgPool, user_id: Uuid, purpose: EmailTokenPurpose) -> anyhow::Result<String> {
        sqlx::query(
            "UPDATE email_tokens SET used = TRUE
             WHERE user_id = $1 AND purpose = $2 AND used = FALSE",
        )
        .bind(user_id)
        .bind(purpose.as_str())
        .execute(pool)
        .await?;

        let token = random_token();
        let expires_at = Utc::now() + purpose.ttl();
        sqlx::query(
            "INSERT INTO email_tokens (user_id, purpose, token_hash, expires_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(user_id)
        .bind(purpose.as_str())
        .bind(hash_token(&token))
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(token)
    }

    /// Mark a live token used and return its owner. A token works once.
    async fn consume_token(pool: &PgPool, purpose: EmailTokenPurpose, token: &str) -> anyhow::Result<Uuid> {
        let user_id: Option<Uuid> = sqlx::query_scalar(
            "UPDATE email_tokens SET used = TRUE
             WHERE token_hash = $1 AND purpose = $2 AND used = FALSE AND expires_at > NOW()
             RETURNING user_id",
        )
        .bind(hash_token(token))
        .bind(purpose.as_str())
        .fetch_optional(pool)
        .await?;

        Ok(user_id.ok_or(AuthError::InvalidToken)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::decode_access_token;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "ada@example.com".into(),
            password_hash: String::new(),
            display_name: Some("Ada".into()),
            email_verified: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_access_token_round_trip() {
        let u = user();
        let token = AuthService::generate_access_token(&u, "secret", 900).unwrap();
        let principal = decode_access_token(&token, "secret").unwrap();
        assert_eq!(principal.user_id, u.id);
        assert_eq!(principal.email, "ada@example.com");

        assert!(decode_access_token(&token, "other-secret").is_err());
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let u = user();
        let (token, _) = AuthService::generate_refresh_token(&u.id, "secret", 30).unwrap();
        // Refresh claims carry no email, so they never decode as access claims.
        assert!(decode_access_token(&token, "secret").is_err());
    }

    #[test]
    fn test_token_hash_is_stable_hex() {
        let a = hash_token("abc");
        assert_eq!(a.len(), 64);
        assert_eq!(a, hash_token("abc"));
        assert_ne!(a, hash_token("abd"));
        assert_eq!(
            a,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_random_tokens_differ() {
        let a = random_token();
        assert_eq!(a.len(), 48);
        assert_ne!(a, random_token());
    }

    #[test]
    fn test_app_link() {
        assert_eq!(
            app_link("https://family.example/", "verify-email", "t0k"),
            "https://family.example/verify-email?token=t0k"
        );
    }
}

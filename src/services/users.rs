//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use once_cell::sync::Lazy;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{
        enums::Role,
        user::{CreateUser, RegisterUser, UpdateUser, User, UserClaims, UserQuery, UserShort},
    },
    repository::Repository,
};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Hash checked when the username is unknown, so both failures cost one argon2 verify
static UNKNOWN_USER_HASH: Lazy<Option<String>> =
    Lazy::new(|| hash_password("athenaeum-unknown-user").ok());

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Check a password against a stored PHC hash
pub fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Spend the same argon2 work as a real password check
fn reject_unknown_user(password: &str) {
    if let Some(hash) = UNKNOWN_USER_HASH.as_deref() {
        let _ = verify_password(hash, password);
    }
}

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Seconds a freshly issued token stays valid
    pub fn token_lifetime_secs(&self) -> i64 {
        self.config.jwt_expiration_hours as i64 * 3600
    }

    /// Authenticate user by username and return a JWT token
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<(String, User)> {
        let Some(user) = self.repository.users.get_by_username(username).await? else {
            reject_unknown_user(password);
            return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
        };

        if !verify_password(&user.password, password)? {
            tracing::warn!(username = %user.username, "Rejected login: wrong password");
            return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
        }

        let token = self.create_token_for_user(&user)?;
        tracing::info!(user_id = user.id, "User logged in");
        Ok((token, user))
    }

    /// Create JWT token for a user
    pub fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();

        let claims = UserClaims {
            sub: user.username.clone(),
            user_id: user.id,
            role: user.role,
            exp: now + self.token_lifetime_secs(),
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Self-service registration; always creates a member account
    pub async fn register(&self, request: RegisterUser) -> AppResult<User> {
        self.create_user(CreateUser::from(request)).await
    }

    /// Seed the default administrator if missing.
    ///
    /// Returns `None` when the account already exists.
    pub async fn create_default_admin(&self) -> AppResult<Option<User>> {
        let username = &self.config.default_admin_username;
        if self.repository.users.get_by_username(username).await?.is_some() {
            return Ok(None);
        }

        let admin = CreateUser {
            username: username.clone(),
            email: self.config.default_admin_email.clone(),
            password: self.config.default_admin_password.clone(),
            full_name: self.config.default_admin_full_name.clone(),
            role: Some(Role::Admin),
        };

        let created = match self.create_user(admin).await {
            Ok(created) => created,
            Err(AppError::Validation(message)) => {
                // A concurrent init may have inserted it since the check above
                if self.repository.users.get_by_username(username).await?.is_some() {
                    return Ok(None);
                }
                return Err(AppError::Validation(message));
            }
            Err(e) => return Err(e),
        };

        tracing::info!(username = %created.username, "Default administrator created");
        Ok(Some(created))
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    /// Search users
    pub async fn search_users(&self, query: &UserQuery) -> AppResult<(Vec<UserShort>, i64)> {
        self.repository.users.search(query).await
    }

    /// Create a new user; duplicate username or email is rejected before any write
    pub async fn create_user(&self, user: CreateUser) -> AppResult<User> {
        if self.repository.users.username_exists(&user.username, None).await? {
            return Err(AppError::Validation("Username is already taken".to_string()));
        }

        if self.repository.users.email_exists(&user.email, None).await? {
            return Err(AppError::Validation("Email is already in use".to_string()));
        }

        let password = hash_password(&user.password)?;
        self.repository.users.create(&user, &password).await
    }

    /// Update an existing user
    pub async fn update_user(&self, id: i32, user: UpdateUser) -> AppResult<User> {
        self.repository.users.get_by_id(id).await?;

        if let Some(ref username) = user.username {
            if self.repository.users.username_exists(username, Some(id)).await? {
                return Err(AppError::Validation("Username is already taken".to_string()));
            }
        }

        if let Some(ref email) = user.email {
            if self.repository.users.email_exists(email, Some(id)).await? {
                return Err(AppError::Validation("Email is already in use".to_string()));
            }
        }

        let password = match user.password {
            Some(ref password) => Some(hash_password(password)?),
            None => None,
        };

        self.repository.users.update(id, &user, password.as_deref()).await
    }

    /// Delete a user
    pub async fn delete_user(&self, id: i32) -> AppResult<()> {
        self.repository.users.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "correct horse").unwrap());
        assert!(!verify_password(&hash, "battery staple").unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_unknown_user_hash_matches_real_hash_cost() {
        let params = |hash: &str| hash.split('$').take(4).collect::<Vec<_>>().join("$");

        let decoy = UNKNOWN_USER_HASH.as_deref().expect("decoy hash");
        let real = hash_password("whatever").unwrap();
        assert_eq!(params(decoy), params(&real));
        assert!(!verify_password(decoy, "whatever").unwrap());

        reject_unknown_user("whatever");
    }

    #[test]
    fn test_garbage_hash_is_internal_error() {
        assert!(matches!(
            verify_password("not-a-phc-string", "x"),
            Err(AppError::Internal(_))
        ));
    }
}

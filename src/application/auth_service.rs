use crate::domain::error::DomainError;
use crate::domain::repository::UserRepository;
use crate::domain::user::{CreateUser, LoginRequest, User, normalize_email};
use crate::domain::validation::{BLANK, TAKEN, ValidationErrors, is_blank};
use crate::infrastructure::security::PasswordHashing;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, trace, warn};
use uuid::Uuid;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_PASSWORD_LEN: usize = 128;

/// Same message for unknown email and wrong password.
pub const INVALID_CREDENTIALS: &str = "Invalid Email or password.";

pub struct AuthService<R: UserRepository> {
    user_repository: Arc<R>,
    hasher: PasswordHashing,
    // Checked when the email is unknown so both failure paths cost one verification.
    dummy_hash: String,
}

/// `local@domain`, no whitespace, exactly one `@`.
fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

impl<R: UserRepository> AuthService<R> {
    pub fn new(user_repository: Arc<R>, hasher: PasswordHashing) -> Result<Self> {
        let dummy_hash = hasher.hash(&Uuid::new_v4().to_string()).map_err(|e| {
            DomainError::Internal(format!("Failed to prepare credential check: {}", e))
        })?;
        Ok(Self {
            user_repository,
            hasher,
            dummy_hash,
        })
    }

    #[instrument(skip(self, req))]
    pub async fn validate_registration(&self, req: &CreateUser) -> Result<ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let email = normalize_email(&req.email);

        if is_blank(&email) {
            errors.add("email", BLANK);
        } else if !looks_like_email(&email) {
            errors.add("email", "is invalid");
        } else if self.user_repository.find_user_by_email(&email).await?.is_some() {
            errors.add("email", TAKEN);
        }

        let password_len = req.password.chars().count();
        if req.password.is_empty() {
            errors.add("password", BLANK);
        } else if password_len < MIN_PASSWORD_LEN {
            errors.add(
                "password",
                format!("is too short (minimum is {} characters)", MIN_PASSWORD_LEN),
            );
        } else if password_len > MAX_PASSWORD_LEN {
            errors.add(
                "password",
                format!("is too long (maximum is {} characters)", MAX_PASSWORD_LEN),
            );
        }

        if let Some(confirmation) = &req.password_confirmation {
            if confirmation != &req.password {
                errors.add("password_confirmation", "doesn't match Password");
            }
        }

        Ok(errors)
    }

    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn register_user(&self, req: CreateUser) -> Result<User> {
        trace!("Starting user registration");

        let errors = self.validate_registration(&req).await?;
        if !errors.is_empty() {
            warn!(errors = %errors, "Registration rejected");
            return Err(DomainError::Validation(errors).into());
        }

        let hasher = self.hasher.clone();
        let password = req.password;
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| DomainError::Internal(format!("Password hashing task failed: {}", e)))?
            .map_err(|e| {
                error!(error = %e, "Failed to hash password");
                DomainError::Internal(format!("Failed to hash password: {}", e))
            })?;

        let user = User {
            id: Uuid::new_v4().to_string(),
            email: normalize_email(&req.email),
            password_hash,
        };

        debug!(user_id = %user.id, "Saving user to repository");
        self.user_repository.save_user(user.clone()).await?;

        info!(user_id = %user.id, email = %user.email, "User registered successfully");
        Ok(user)
    }

    /// Returns the user whose credentials match.
    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn login(&self, req: LoginRequest) -> Result<User> {
        trace!("Starting login");

        let email = normalize_email(&req.email);
        let user = self.user_repository.find_user_by_email(&email).await?;

        let hasher = self.hasher.clone();
        let password = req.password;
        let stored_hash = user
            .as_ref()
            .map_or_else(|| self.dummy_hash.clone(), |u| u.password_hash.clone());
        let is_valid = tokio::task::spawn_blocking(move || hasher.verify(&password, &stored_hash))
            .await
            .map_err(|e| DomainError::Internal(format!("Password check task failed: {}", e)))?
            .map_err(|e| {
                error!(error = %e, "Failed to verify password");
                DomainError::Internal(format!("Failed to verify password: {}", e))
            })?;

        let user = match user {
            Some(user) if is_valid => user,
            Some(user) => {
                warn!(user_id = %user.id, "Invalid password during login");
                return Err(DomainError::Unauthorized(INVALID_CREDENTIALS.to_string()).into());
            }
            None => {
                warn!("User not found during login");
                return Err(DomainError::Unauthorized(INVALID_CREDENTIALS.to_string()).into());
            }
        };

        info!(user_id = %user.id, "Login successful");
        Ok(user)
    }

    pub async fn find_user(&self, user_id: &str) -> Result<Option<User>> {
        self.user_repository.find_user_by_id(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::user_repository::InMemoryUserRepository;
    use crate::infrastructure::security::HashingParams;

    fn hasher() -> PasswordHashing {
        PasswordHashing::new(HashingParams::minimal()).unwrap()
    }

    fn service() -> AuthService<InMemoryUserRepository> {
        AuthService::new(Arc::new(InMemoryUserRepository::new()), hasher()).unwrap()
    }

    fn sign_up(email: &str, password: &str) -> CreateUser {
        CreateUser {
            email: email.to_string(),
            password: password.to_string(),
            password_confirmation: None,
        }
    }

    fn credentials(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn unauthorized(err: &anyhow::Error) -> bool {
        matches!(
            err.downcast_ref::<DomainError>(),
            Some(DomainError::Unauthorized(msg)) if msg == INVALID_CREDENTIALS
        )
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let service = service();
        let user = service
            .register_user(sign_up("test@test.com", "testtest"))
            .await
            .unwrap();
        assert_ne!(user.password_hash, "testtest");

        let signed_in = service
            .login(credentials("test@test.com", "testtest"))
            .await
            .unwrap();
        assert_eq!(signed_in.id, user.id);
        assert!(service.find_user(&user.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_email_is_normalised() {
        let service = service();
        let user = service
            .register_user(sign_up("  Test@Test.com ", "testtest"))
            .await
            .unwrap();
        assert_eq!(user.email, "test@test.com");
        assert!(
            service
                .login(credentials("TEST@test.com", "testtest"))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_login_failures_share_one_message() {
        let service = service();
        service
            .register_user(sign_up("test@test.com", "testtest"))
            .await
            .unwrap();

        let wrong_password = service
            .login(credentials("test@test.com", "wrongpass"))
            .await
            .unwrap_err();
        let unknown_email = service
            .login(credentials("nobody@test.com", "testtest"))
            .await
            .unwrap_err();
        assert!(unauthorized(&wrong_password));
        assert!(unauthorized(&unknown_email));
    }

    #[tokio::test]
    async fn test_unknown_email_still_checks_a_password() {
        let hasher = hasher();
        let service =
            AuthService::new(Arc::new(InMemoryUserRepository::new()), hasher.clone()).unwrap();
        service
            .register_user(sign_up("test@test.com", "testtest"))
            .await
            .unwrap();
        assert_eq!(hasher.verifications(), 0);

        let wrong_password = service
            .login(credentials("test@test.com", "wrongpass"))
            .await
            .unwrap_err();
        assert!(unauthorized(&wrong_password));
        assert_eq!(hasher.verifications(), 1);

        let unknown_email = service
            .login(credentials("nobody@test.com", "testtest"))
            .await
            .unwrap_err();
        assert!(unauthorized(&unknown_email));
        assert_eq!(hasher.verifications(), 2);
    }

    #[tokio::test]
    async fn test_registration_validation() {
        let service = service();
        service
            .register_user(sign_up("test@test.com", "testtest"))
            .await
            .unwrap();

        let taken = service
            .validate_registration(&sign_up("test@test.com", "testtest"))
            .await
            .unwrap();
        assert_eq!(taken.on("email"), vec![TAKEN]);

        let invalid = service
            .validate_registration(&sign_up("not-an-email", "short"))
            .await
            .unwrap();
        assert_eq!(invalid.on("email"), vec!["is invalid"]);
        assert_eq!(
            invalid.on("password"),
            vec!["is too short (minimum is 6 characters)"]
        );

        let blank = service.validate_registration(&sign_up("", "")).await.unwrap();
        assert_eq!(blank.on("email"), vec![BLANK]);
        assert_eq!(blank.on("password"), vec![BLANK]);

        let mismatch = service
            .validate_registration(&CreateUser {
                email: "new@test.com".to_string(),
                password: "testtest".to_string(),
                password_confirmation: Some("testtset".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(mismatch.len(), 1);
        assert_eq!(
            mismatch.on("password_confirmation"),
            vec!["doesn't match Password"]
        );
    }

    #[tokio::test]
    async fn test_rejected_registration_stores_nothing() {
        let service = service();
        assert!(service.register_user(sign_up("a@b", "x")).await.is_err());
        assert!(service.login(credentials("a@b", "x")).await.is_err());
    }

    #[test]
    fn test_looks_like_email() {
        assert!(looks_like_email("test@test.com"));
        assert!(!looks_like_email("test.com"));
        assert!(!looks_like_email("@test.com"));
        assert!(!looks_like_email("test@"));
        assert!(!looks_like_email("a@b@c"));
        assert!(!looks_like_email("te st@test.com"));
    }
}

//! Core business logic for the authentication flows.
//!
//! Sign-in, sign-up, and session revalidation against the user directory.
//! Every refusal maps to the message the sign-in page shows; directory
//! outages surface as a refusal too, never as a crash.

use crate::auth::directory::{UserDirectory, UserRecord};
use crate::config::Result;
use crate::core::pipeline::PrincipalRevalidator;
use crate::security::PasswordHasher;
use crate::session::{Principal, Role};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
use std::sync::Arc;
use tracing::{error, info};

/// Why a sign-in attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInError {
    /// Unknown email or wrong password. Deliberately indistinguishable.
    InvalidCredentials,
    /// Credentials are fine but the selected account type does not match.
    WrongAccountType,
    /// The account exists but has been deactivated.
    Deactivated,
    /// The directory could not be reached.
    Unavailable,
}

impl SignInError {
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::InvalidCredentials => "Invalid email or password",
            Self::WrongAccountType => "Invalid account type",
            Self::Deactivated => "Your account has been deactivated",
            Self::Unavailable => "An error occurred. Please try again.",
        }
    }
}

/// Why a sign-up attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignUpError {
    EmailTaken,
    Unavailable,
}

impl SignUpError {
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::EmailTaken => "Email already registered",
            Self::Unavailable => "An error occurred during registration",
        }
    }
}

/// A registration request.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password: String,
}

pub struct AuthService {
    directory: Arc<dyn UserDirectory>,
    hasher: PasswordHasher,
}

impl AuthService {
    #[must_use]
    pub fn new(directory: Arc<dyn UserDirectory>, hasher: PasswordHasher) -> Self {
        Self { directory, hasher }
    }

    /// Verifies credentials and the selected account type.
    ///
    /// # Errors
    ///
    /// Returns the refusal to flash back to the sign-in page.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
        role: Role,
    ) -> std::result::Result<Principal, SignInError> {
        let record = match self.directory.find_by_email(email).await {
            Ok(Some(record)) => record,
            Ok(None) => return Err(SignInError::InvalidCredentials),
            Err(e) => {
                error!(error = %e, "Sign in failed: directory unavailable");
                return Err(SignInError::Unavailable);
            }
        };

        let password_ok = self
            .hasher
            .verify(password.to_string(), record.password_hash.clone())
            .await
            .map_err(|e| {
                error!(error = %e, "Sign in failed: password verification error");
                SignInError::Unavailable
            })?;

        if !password_ok {
            return Err(SignInError::InvalidCredentials);
        }
        if record.role != role {
            return Err(SignInError::WrongAccountType);
        }
        if !record.active {
            return Err(SignInError::Deactivated);
        }

        info!(user_id = %record.id, role = %record.role, "User signed in");
        Ok(principal_of(&record))
    }

    /// Registers a new job-seeker account and returns its principal.
    ///
    /// # Errors
    ///
    /// Returns the refusal to flash back to the sign-in page.
    pub async fn sign_up(
        &self,
        account: NewAccount,
    ) -> std::result::Result<Principal, SignUpError> {
        self.create_account(account, Role::JobSeeker).await
    }

    /// Registers an account with an explicit role. Sign-up always creates
    /// job seekers; elevated roles are created by seeding or operator
    /// tooling.
    ///
    /// # Errors
    ///
    /// Returns the refusal to flash back to the sign-in page.
    pub async fn create_account(
        &self,
        account: NewAccount,
        role: Role,
    ) -> std::result::Result<Principal, SignUpError> {
        match self.directory.find_by_email(&account.email).await {
            Ok(Some(_)) => return Err(SignUpError::EmailTaken),
            Ok(None) => {}
            Err(e) => {
                error!(error = %e, "Sign up failed: directory unavailable");
                return Err(SignUpError::Unavailable);
            }
        }

        let password_hash = self.hasher.hash(account.password).await.map_err(|e| {
            error!(error = %e, "Sign up failed: password hashing error");
            SignUpError::Unavailable
        })?;

        let record = UserRecord {
            id: generate_account_id(),
            name: account.name,
            surname: account.surname,
            email: account.email,
            password_hash,
            role,
            active: true,
        };

        if let Err(e) = self.directory.create(record.clone()).await {
            error!(error = %e, "Sign up failed: directory rejected account");
            return Err(SignUpError::EmailTaken);
        }

        info!(user_id = %record.id, role = %record.role, "Account created");
        Ok(principal_of(&record))
    }
}

#[async_trait]
impl PrincipalRevalidator for AuthService {
    async fn is_active(&self, principal: &Principal) -> Result<bool> {
        let record = self.directory.find_by_id(&principal.id).await?;
        Ok(record.is_some_and(|r| r.active))
    }
}

fn principal_of(record: &UserRecord) -> Principal {
    Principal {
        id: record.id.clone(),
        name: record.name.clone(),
        surname: record.surname.clone(),
        email: record.email.clone(),
        role: record.role,
    }
}

fn generate_account_id() -> String {
    let random_bytes: [u8; 12] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::directory::MemoryUserDirectory;

    fn service() -> (AuthService, Arc<MemoryUserDirectory>) {
        let directory = Arc::new(MemoryUserDirectory::new());
        let service = AuthService::new(directory.clone(), PasswordHasher::with_params(4096, 1, 1));
        (service, directory)
    }

    async fn seed(service: &AuthService, email: &str, password: &str, role: Role) -> Principal {
        service
            .create_account(
                NewAccount {
                    name: "Test".to_string(),
                    surname: "User".to_string(),
                    email: email.to_string(),
                    password: password.to_string(),
                },
                role,
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_sign_in_success() {
        let (service, _) = service();
        seed(&service, "emp@example.com", "pw123456", Role::Employer).await;

        let principal = service
            .sign_in("emp@example.com", "pw123456", Role::Employer)
            .await
            .unwrap();
        assert_eq!(principal.role, Role::Employer);
        assert_eq!(principal.email, "emp@example.com");
    }

    #[tokio::test]
    async fn test_sign_in_wrong_password() {
        let (service, _) = service();
        seed(&service, "emp@example.com", "pw123456", Role::Employer).await;

        let err = service
            .sign_in("emp@example.com", "nope", Role::Employer)
            .await
            .unwrap_err();
        assert_eq!(err, SignInError::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_sign_in_unknown_email() {
        let (service, _) = service();
        let err = service
            .sign_in("ghost@example.com", "pw", Role::JobSeeker)
            .await
            .unwrap_err();
        assert_eq!(err, SignInError::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_sign_in_role_mismatch() {
        let (service, _) = service();
        seed(&service, "emp@example.com", "pw123456", Role::Employer).await;

        let err = service
            .sign_in("emp@example.com", "pw123456", Role::JobSeeker)
            .await
            .unwrap_err();
        assert_eq!(err, SignInError::WrongAccountType);
    }

    #[tokio::test]
    async fn test_sign_in_deactivated_account() {
        let (service, directory) = service();
        seed(&service, "emp@example.com", "pw123456", Role::Employer).await;
        directory.set_active("emp@example.com", false);

        let err = service
            .sign_in("emp@example.com", "pw123456", Role::Employer)
            .await
            .unwrap_err();
        assert_eq!(err, SignInError::Deactivated);
    }

    #[tokio::test]
    async fn test_sign_up_defaults_to_job_seeker() {
        let (service, _) = service();
        let principal = service
            .sign_up(NewAccount {
                name: "New".to_string(),
                surname: "Person".to_string(),
                email: "new@example.com".to_string(),
                password: "pw123456".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(principal.role, Role::JobSeeker);
    }

    #[tokio::test]
    async fn test_sign_up_duplicate_email() {
        let (service, _) = service();
        seed(&service, "dup@example.com", "pw123456", Role::JobSeeker).await;

        let err = service
            .sign_up(NewAccount {
                name: "Other".to_string(),
                surname: "Person".to_string(),
                email: "dup@example.com".to_string(),
                password: "pw123456".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, SignUpError::EmailTaken);
    }

    #[tokio::test]
    async fn test_revalidation_tracks_active_flag() {
        let (service, directory) = service();
        let principal = seed(&service, "emp@example.com", "pw123456", Role::Employer).await;

        assert!(service.is_active(&principal).await.unwrap());

        directory.set_active("emp@example.com", false);
        assert!(!service.is_active(&principal).await.unwrap());
    }
}

//! Signup, login and session checks backed by salted Argon2 hashes.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::future::Future;
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, instrument};

use crate::models::{
    parse_entity_id, require_credentials, CredentialsRequest, Role, ServiceError, ServiceResult,
    User, Validate,
};
use crate::observability::{BusinessTracingMiddleware, Metrics};
use crate::repositories::UserRepository;

/// Hash a password with a freshly generated salt. Returns the PHC string.
#[instrument(name = "auth_service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> ServiceResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!(error = %e, "Argon2 password hashing failed");
            ServiceError::PasswordHash {
                message: e.to_string(),
            }
        })
}

/// Check a password against a stored PHC string.
/// `Ok(false)` means a mismatch; `Err` means the stored hash is unusable.
#[instrument(name = "auth_service::verify_password", skip_all, err(Display))]
pub fn verify_password(stored_hash: &str, password: &str) -> ServiceResult<bool> {
    let parsed_hash = PasswordHash::new(stored_hash).map_err(|e| {
        error!(error = %e, "Failed to parse stored password hash");
        ServiceError::PasswordHash {
            message: e.to_string(),
        }
    })?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => {
            debug!("Password mismatch");
            Ok(false)
        }
        Err(e) => Err(ServiceError::PasswordHash {
            message: e.to_string(),
        }),
    }
}

/// Stand-in hash for unknown usernames, so a failed lookup pays the same
/// Argon2 cost as a wrong password.
fn dummy_password_hash() -> &'static str {
    static DUMMY_HASH: OnceLock<String> = OnceLock::new();
    DUMMY_HASH.get_or_init(|| hash_password("storefront-unknown-user").unwrap_or_default())
}

/// Argon2 is deliberately slow, keep it off the async workers
async fn run_blocking<T, F>(task: F) -> ServiceResult<T>
where
    F: FnOnce() -> ServiceResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ServiceError::PasswordHash {
            message: e.to_string(),
        })?
}

/// Account service for the storefront login page
pub struct AuthService {
    user_repository: Arc<dyn UserRepository>,
    business_tracing: Option<BusinessTracingMiddleware>,
}

impl AuthService {
    pub fn new(user_repository: Arc<dyn UserRepository>) -> Self {
        Self {
            user_repository,
            business_tracing: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.business_tracing = Some(BusinessTracingMiddleware::new(metrics));
        self
    }

    /// Create an account with the default role
    #[instrument(skip(self, request), fields(username = ?request.username))]
    pub async fn signup(&self, request: CredentialsRequest) -> ServiceResult<User> {
        request.validate()?;
        let (username, password) = require_credentials(&request)?;
        let username = username.to_string();
        let password = password.to_string();

        self.traced("signup", async {
            if self
                .user_repository
                .find_by_username(&username)
                .await?
                .is_some()
            {
                return Err(ServiceError::UsernameTaken { username });
            }

            let password_hash = run_blocking(move || hash_password(&password)).await?;

            // The unique constraint settles concurrent signups for one name
            let user = self
                .user_repository
                .create_user(&username, &password_hash, Role::User)
                .await
                .map_err(|e| {
                    if e.is_unique_violation() {
                        ServiceError::UsernameTaken {
                            username: username.clone(),
                        }
                    } else {
                        e.into()
                    }
                })?;

            crate::info_with_trace!("User {} created", user.id);
            Ok(user)
        })
        .await
    }

    /// Verify credentials. Unknown users and wrong passwords are
    /// indistinguishable to the caller.
    #[instrument(skip(self, request), fields(username = ?request.username))]
    pub async fn login(&self, request: CredentialsRequest) -> ServiceResult<User> {
        let (username, password) = require_credentials(&request)?;
        let username = username.to_string();
        let password = password.to_string();

        self.traced("login", async {
            let Some(user) = self.user_repository.find_by_username(&username).await? else {
                let _ = run_blocking(move || verify_password(dummy_password_hash(), &password)).await;
                return Err(ServiceError::InvalidCredentials);
            };

            let stored_hash = user.password_hash.clone();
            let matches = run_blocking(move || verify_password(&stored_hash, &password)).await?;
            if !matches {
                return Err(ServiceError::InvalidCredentials);
            }

            crate::info_with_trace!("User {} logged in", user.id);
            Ok(user)
        })
        .await
    }

    /// Resolve the user behind a session id. Missing, malformed and unknown
    /// ids are all `Unauthenticated`.
    #[instrument(skip(self), fields(user_id = ?user_id))]
    pub async fn check(&self, user_id: Option<&str>) -> ServiceResult<User> {
        let user_id = match user_id.map(|raw| parse_entity_id("userId", raw)) {
            Some(Ok(id)) => id,
            _ => return Err(ServiceError::Unauthenticated),
        };

        self.traced("check", async {
            self.user_repository
                .find_by_id(user_id)
                .await?
                .ok_or(ServiceError::Unauthenticated)
        })
        .await
    }

    async fn traced<F, T>(&self, operation: &str, future: F) -> ServiceResult<T>
    where
        F: Future<Output = ServiceResult<T>>,
    {
        match &self.business_tracing {
            Some(business_tracing) => {
                business_tracing
                    .trace_auth_operation(operation, future)
                    .await
            }
            None => future.await,
        }
    }
}

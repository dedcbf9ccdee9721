//! services/api/src/web/auth.rs
//!
//! Authentication endpoints: email/password signup and signin, and Google sign-in.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use sage_core::domain::{Account, AuthProvider, VerifiedIdentity};
use sage_core::ports::{PortError, UserRepository};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::HttpError;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct GoogleRequest {
    #[serde(default)]
    pub credential: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub email: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

/// Unwraps a JSON body, turning axum's rejection into our error shape.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, HttpError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| HttpError::BadRequest(format!("Invalid request body: {}", e.body_text())))
}

fn required_credentials(req: CredentialsRequest) -> Result<(String, String), HttpError> {
    let email = req.email.trim().to_string();
    if email.is_empty() || req.password.is_empty() {
        return Err(HttpError::BadRequest(
            "Email and password are required.".to_string(),
        ));
    }
    Ok((email, req.password))
}

fn session_response(
    state: &AppState,
    account: &Account,
    name: Option<String>,
    given_name: Option<String>,
) -> Result<AuthResponse, HttpError> {
    let token = state.tokens.issue(account, name, given_name)?;
    Ok(AuthResponse {
        token,
        user: UserResponse {
            email: account.email.clone(),
        },
    })
}

/// Finds or creates the Google account for a verified identity.
/// An insert that loses a race to a concurrent first sign-in falls back to the
/// account the other request created.
async fn google_account(
    users: &dyn UserRepository,
    identity: &VerifiedIdentity,
) -> Result<Account, HttpError> {
    if let Some(existing) = users.find_by_email(&identity.email).await? {
        return reuse_google_account(existing);
    }

    let inserted = users
        .insert(Account {
            id: identity.subject.clone(),
            email: identity.email.clone(),
            password_hash: None,
            provider: AuthProvider::Google,
        })
        .await;
    match inserted {
        Ok(account) => {
            info!("Created Google account {}", account.id);
            Ok(account)
        }
        Err(PortError::Conflict(message)) => match users.find_by_email(&identity.email).await? {
            Some(existing) => reuse_google_account(existing),
            None => Err(HttpError::Conflict(message)),
        },
        Err(e) => Err(e.into()),
    }
}

fn reuse_google_account(existing: Account) -> Result<Account, HttpError> {
    if existing.provider == AuthProvider::Google {
        return Ok(existing);
    }
    warn!("Google sign-in attempted for a local account");
    Err(HttpError::Conflict(
        "Email already registered with a password.".to_string(),
    ))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/auth/signup - Create a new email/password account
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Missing email or password"),
        (status = 409, description = "Email already exists"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), HttpError> {
    let (email, password) = required_credentials(json_body(payload)?)?;

    // 1. Reject known emails before paying for a hash
    if state.users.find_by_email(&email).await?.is_some() {
        return Err(HttpError::Conflict("Email already exists.".to_string()));
    }

    // 2. Hash the password
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            HttpError::Internal
        })?
        .to_string();

    // 3. Store the account; a concurrent signup for the same email still conflicts here
    let account = state
        .users
        .insert(Account {
            id: Uuid::new_v4().to_string(),
            email,
            password_hash: Some(password_hash),
            provider: AuthProvider::Local,
        })
        .await?;
    info!("Created local account {}", account.id);

    Ok((
        StatusCode::CREATED,
        Json(session_response(&state, &account, None, None)?),
    ))
}

/// POST /api/auth/signin - Sign in with email and password
#[utoipa::path(
    post,
    path = "/api/auth/signin",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signin_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, HttpError> {
    let (email, password) = required_credentials(json_body(payload)?)?;

    // 1. Only local accounts have a password to check
    let account = state
        .users
        .find_by_email(&email)
        .await?
        .filter(|a| a.provider == AuthProvider::Local)
        .ok_or(HttpError::Unauthorized)?;
    let stored_hash = account
        .password_hash
        .as_deref()
        .ok_or(HttpError::Unauthorized)?;

    // 2. Verify password
    let parsed_hash = PasswordHash::new(stored_hash).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        HttpError::Internal
    })?;
    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(HttpError::Unauthorized);
    }

    Ok(Json(session_response(&state, &account, None, None)?))
}

/// POST /api/auth/google - Sign in with a Google ID-token credential
#[utoipa::path(
    post,
    path = "/api/auth/google",
    request_body = GoogleRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 400, description = "Missing credential"),
        (status = 401, description = "Credential failed verification"),
        (status = 409, description = "Email is registered with a password"),
        (status = 503, description = "Google sign-in is not configured")
    )
)]
pub async fn google_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GoogleRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, HttpError> {
    let req = json_body(payload)?;
    let credential = req.credential.trim();
    if credential.is_empty() {
        return Err(HttpError::BadRequest("Credential is required.".to_string()));
    }
    let verifier = state.google.as_ref().ok_or_else(|| {
        HttpError::Unavailable("Google sign-in is not configured.".to_string())
    })?;

    // 1. Verify the credential with Google
    let identity = verifier.verify(credential).await?;

    // 2. Reuse the Google account, refuse to shadow a password account
    let account = google_account(state.users.as_ref(), &identity).await?;

    Ok(Json(session_response(
        &state,
        &account,
        identity.name,
        identity.given_name,
    )?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryUserRepository;
    use async_trait::async_trait;
    use sage_core::ports::PortResult;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Hides accounts from the first lookup, as if another request inserted
    /// one between this request's lookup and its insert.
    struct LateInsert {
        inner: InMemoryUserRepository,
        first_lookup: AtomicBool,
    }

    #[async_trait]
    impl UserRepository for LateInsert {
        async fn find_by_email(&self, email: &str) -> PortResult<Option<Account>> {
            if self.first_lookup.swap(false, Ordering::SeqCst) {
                return Ok(None);
            }
            self.inner.find_by_email(email).await
        }

        async fn insert(&self, account: Account) -> PortResult<Account> {
            self.inner.insert(account).await
        }
    }

    fn identity() -> VerifiedIdentity {
        VerifiedIdentity {
            subject: "1122334455".to_string(),
            email: "grace@example.com".to_string(),
            name: None,
            given_name: None,
        }
    }

    async fn racing_repo(provider: AuthProvider) -> LateInsert {
        let inner = InMemoryUserRepository::new();
        inner
            .insert(Account {
                id: "existing".to_string(),
                email: "grace@example.com".to_string(),
                password_hash: None,
                provider,
            })
            .await
            .unwrap();
        LateInsert {
            inner,
            first_lookup: AtomicBool::new(true),
        }
    }

    #[tokio::test]
    async fn losing_the_google_insert_race_reuses_the_new_account() {
        let users = racing_repo(AuthProvider::Google).await;
        let account = google_account(&users, &identity()).await.unwrap();
        assert_eq!(account.id, "existing");
        assert_eq!(account.provider, AuthProvider::Google);
    }

    #[tokio::test]
    async fn losing_the_race_to_a_password_account_conflicts() {
        let users = racing_repo(AuthProvider::Local).await;
        let result = google_account(&users, &identity()).await;
        assert!(matches!(result, Err(HttpError::Conflict(_))));
    }
}

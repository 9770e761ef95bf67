use argon2::{
    password_hash::{Encoding, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::{Duration, Utc};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use regex::Regex;
use thiserror::Error;

use crate::{
    util::{random_id, random_string},
    AuthSessionData, DatabaseError, HubContext, NewAuthSession, NewUser, Role, SharedDatabase,
    UserData,
};

lazy_static! {
    static ref EMAIL_PATTERN: Regex =
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles");
}

pub struct Auth {
    db: SharedDatabase,
    argon: Argon2<'static>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Email or password is incorrect
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("An admin account already exists")]
    AdminExists,
    #[error("{0} is not a valid email address")]
    InvalidEmail(String),
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
    #[error("HashError: {0}")]
    HashError(String),
}

impl Auth {
    const SESSION_DURATION_IN_HOURS: i64 = 24;
    const TOKEN_LENGTH: usize = 32;

    pub fn new(context: &HubContext) -> Self {
        Self {
            db: context.database.clone(),
            argon: Argon2::default(),
        }
    }

    /// Creates a new account.
    ///
    /// The admin role can only be claimed while no admin exists yet, which
    /// bootstraps the first one. Everyone after that registers as a student
    /// or counsellor and is promoted by an admin if need be.
    pub async fn register(&self, new_user: NewRegistration) -> Result<UserData, AuthError> {
        let email = new_user.email.trim().to_lowercase();

        if !EMAIL_PATTERN.is_match(&email) {
            return Err(AuthError::InvalidEmail(email));
        }

        if let Role::Admin = new_user.role {
            let has_admin = self.db.has_admin().await.map_err(AuthError::Db)?;

            if has_admin {
                return Err(AuthError::AdminExists);
            }
        }

        let salt = SaltString::generate(&mut OsRng);
        let hashed_password = self
            .argon
            .hash_password(new_user.password.as_bytes(), &salt)
            .map_err(|e| AuthError::HashError(e.to_string()))?
            .to_string();

        self.db
            .create_user(NewUser {
                id: random_id(),
                email,
                password: hashed_password,
                first_name: new_user.first_name,
                last_name: new_user.last_name,
                role: new_user.role,
            })
            .await
            .map_err(AuthError::Db)
    }

    /// Logs in a user, returning a new session
    pub async fn login(&self, credentials: Credentials) -> Result<AuthSessionData, AuthError> {
        self.clear_expired().await;

        let user = self
            .db
            .user_by_email(&credentials.email.trim().to_lowercase())
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound {
                    resource: _,
                    identifier: _,
                } => AuthError::InvalidCredentials,
                err => AuthError::Db(err),
            })?;

        let stored_password = PasswordHash::parse(&user.password, Encoding::default())
            .map_err(|e| AuthError::HashError(e.to_string()))?;

        self.argon
            .verify_password(credentials.password.as_bytes(), &stored_password)
            .map_err(|_| AuthError::InvalidCredentials)?;

        let expires_at = Utc::now() + Duration::hours(Self::SESSION_DURATION_IN_HOURS);

        let new_session = NewAuthSession {
            token: random_string(Self::TOKEN_LENGTH),
            user_id: user.id,
            expires_at,
        };

        self.db
            .create_session(new_session)
            .await
            .map_err(AuthError::Db)
    }

    /// Deletes the associated session, if it exists
    pub async fn logout(&self, token: &str) -> Result<(), DatabaseError> {
        self.db.delete_session_by_token(token).await
    }

    /// Returns a live session.
    ///
    /// An expired session is deleted and reported as missing, so callers
    /// treat expiry and absence the same way.
    pub async fn session(&self, token: &str) -> Result<AuthSessionData, DatabaseError> {
        let session = self.db.session_by_token(token).await?;

        if session.expires_at <= Utc::now() {
            self.db.delete_session_by_token(token).await?;

            return Err(DatabaseError::NotFound {
                resource: "session",
                identifier: "token",
            });
        }

        Ok(session)
    }

    async fn clear_expired(&self) {
        if let Err(e) = self.db.clear_expired_sessions().await {
            log::warn!("Failed to clear expired sessions: {e}");
        }
    }
}

#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug)]
pub struct NewRegistration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

#[cfg(test)]
mod test {
    use chrono::{Duration, Utc};

    use crate::{
        testing, AuthError, Credentials, DatabaseError, NewAuthSession, NewRegistration, Role,
    };

    fn registration(email: &str, role: Role) -> NewRegistration {
        NewRegistration {
            email: email.to_string(),
            password: "pw12345678".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            role,
        }
    }

    fn credentials(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let hub = testing::hub();

        let user = hub
            .auth
            .register(registration("alice@example.com", Role::Student))
            .await
            .expect("registers");

        assert_eq!(user.role, Role::Student);
        assert_ne!(user.password, "pw12345678", "password is not stored in plain text");

        let session = hub
            .auth
            .login(credentials("alice@example.com", "pw12345678"))
            .await
            .expect("logs in");

        assert_eq!(session.user.id, user.id);

        let validated = hub.auth.session(&session.token).await.expect("validates");
        assert_eq!(validated.user.id, user.id);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let hub = testing::hub();

        hub.auth
            .register(registration("alice@example.com", Role::Student))
            .await
            .expect("registers");

        let result = hub
            .auth
            .login(credentials("alice@example.com", "not-the-password"))
            .await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials)));

        let result = hub
            .auth
            .login(credentials("nobody@example.com", "pw12345678"))
            .await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let hub = testing::hub();

        hub.auth
            .register(registration("alice@example.com", Role::Student))
            .await
            .expect("registers");

        let result = hub
            .auth
            .register(registration("alice@example.com", Role::Counsellor))
            .await;

        assert!(matches!(
            result,
            Err(AuthError::Db(DatabaseError::Conflict { .. }))
        ));
    }

    #[tokio::test]
    async fn email_shape_is_checked() {
        let hub = testing::hub();

        let result = hub
            .auth
            .register(registration("not-an-email", Role::Student))
            .await;

        assert!(matches!(result, Err(AuthError::InvalidEmail(_))));
    }

    #[tokio::test]
    async fn logout_invalidates_the_token() {
        let hub = testing::hub();

        hub.auth
            .register(registration("alice@example.com", Role::Student))
            .await
            .expect("registers");

        let session = hub
            .auth
            .login(credentials("alice@example.com", "pw12345678"))
            .await
            .expect("logs in");

        hub.auth.logout(&session.token).await.expect("logs out");

        let result = hub.auth.session(&session.token).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn expired_sessions_no_longer_validate() {
        let hub = testing::hub();

        let user = hub
            .auth
            .register(registration("alice@example.com", Role::Student))
            .await
            .expect("registers");

        let expired = hub
            .database()
            .create_session(NewAuthSession {
                token: "stale-token".to_string(),
                user_id: user.id,
                expires_at: Utc::now() - Duration::hours(1),
            })
            .await
            .expect("stores session");

        let result = hub.auth.session(&expired.token).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn only_the_first_admin_registers_freely() {
        let hub = testing::hub();

        hub.auth
            .register(registration("root@example.com", Role::Admin))
            .await
            .expect("bootstraps the first admin");

        let result = hub
            .auth
            .register(registration("mallory@example.com", Role::Admin))
            .await;

        assert!(matches!(result, Err(AuthError::AdminExists)));
    }
}

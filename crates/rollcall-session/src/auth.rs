//! Authentication hook for identifying who is calling.
//!
//! Rollcall doesn't issue credentials. Whoever runs the campus login
//! (JWT service, SSO proxy, ...) does that. Rollcall only needs to know
//! whether a caller may start and stop sessions, so it asks an
//! [`Authenticator`] to turn the presented bearer token into an
//! [`Identity`].

use std::future::Future;

use crate::SessionError;

/// What a caller is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// May start and stop sessions.
    Teacher,
    /// May only poll and submit scans.
    Student,
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
    pub role: Role,
}

impl Identity {
    pub fn is_teacher(&self) -> bool {
        self.role == Role::Teacher
    }
}

/// Resolves a caller's bearer token to an [`Identity`].
///
/// `Send + Sync + 'static` because one authenticator is shared by every
/// request handler for the life of the server.
///
/// ```rust
/// use rollcall_session::{Authenticator, Identity, Role, SessionError};
///
/// /// Treats the token text as the subject and everyone as a student.
/// struct StudentsOnly;
///
/// impl Authenticator for StudentsOnly {
///     async fn authenticate(
///         &self,
///         bearer: Option<&str>,
///     ) -> Result<Identity, SessionError> {
///         let subject = bearer
///             .ok_or_else(|| SessionError::AuthFailed("missing token".into()))?;
///         Ok(Identity { subject: subject.to_string(), role: Role::Student })
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Validates the bearer token (without the `Bearer ` prefix).
    ///
    /// # Errors
    /// Returns [`SessionError::AuthFailed`] if the token is missing or
    /// rejected.
    fn authenticate(
        &self,
        bearer: Option<&str>,
    ) -> impl Future<Output = Result<Identity, SessionError>> + Send;
}

/// Accepts every caller as a teacher.
///
/// For deployments where an upstream gateway already authorized the
/// request, and for local development.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAccess;

impl Authenticator for OpenAccess {
    async fn authenticate(&self, _bearer: Option<&str>) -> Result<Identity, SessionError> {
        Ok(Identity {
            subject: "anonymous".to_string(),
            role: Role::Teacher,
        })
    }
}

/// Accepts exactly one shared teacher token.
#[derive(Debug, Clone)]
pub struct StaticTokenAuthenticator {
    teacher_token: String,
}

impl StaticTokenAuthenticator {
    pub fn new(teacher_token: impl Into<String>) -> Self {
        Self {
            teacher_token: teacher_token.into(),
        }
    }
}

impl Authenticator for StaticTokenAuthenticator {
    async fn authenticate(&self, bearer: Option<&str>) -> Result<Identity, SessionError> {
        let token =
            bearer.ok_or_else(|| SessionError::AuthFailed("missing bearer token".into()))?;
        if token != self.teacher_token {
            return Err(SessionError::AuthFailed("unknown token".into()));
        }
        Ok(Identity {
            subject: "teacher".to_string(),
            role: Role::Teacher,
        })
    }
}

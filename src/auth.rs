//! Login boundary.
//!
//! `Authenticator` turns a submitted form into a `User`. The only
//! implementation trusts whatever email and role were submitted once the
//! required fields are filled in.

use crate::role::Role;
use crate::session::User;

/// How the user chose to sign in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginMethod {
    Password { password: String },
    MagicLink,
}

/// The submitted login form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub role: Role,
    pub method: LoginMethod,
}

impl LoginForm {
    pub fn magic_link(email: &str, role: Role) -> Self {
        Self {
            email: email.to_string(),
            role,
            method: LoginMethod::MagicLink,
        }
    }

    pub fn with_password(email: &str, password: &str, role: Role) -> Self {
        Self {
            email: email.to_string(),
            role,
            method: LoginMethod::Password {
                password: password.to_string(),
            },
        }
    }
}

/// Form validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    MissingEmail,
    MissingPassword,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingEmail => write!(f, "Please enter your email address"),
            AuthError::MissingPassword => write!(f, "Please enter your password"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Source of the current time in milliseconds since the epoch
pub trait Clock {
    fn now_millis(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

pub trait Authenticator {
    fn login(&self, form: &LoginForm) -> Result<User, AuthError>;
}

/// Accepts any filled-in form; ids are `user-<millis>`
pub struct TrustOnSubmit<C: Clock> {
    clock: C,
}

impl<C: Clock> TrustOnSubmit<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> Authenticator for TrustOnSubmit<C> {
    fn login(&self, form: &LoginForm) -> Result<User, AuthError> {
        let email = form.email.trim();
        if email.is_empty() {
            return Err(AuthError::MissingEmail);
        }
        if let LoginMethod::Password { password } = &form.method {
            if password.is_empty() {
                return Err(AuthError::MissingPassword);
            }
        }

        Ok(User::new(
            format!("user-{}", self.clock.now_millis()),
            email,
            form.role,
        ))
    }
}

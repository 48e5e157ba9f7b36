//! Error types for the user store
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum UserError {
    #[error("User not found: {username}")]
    UserNotFound { username: String },

    #[error("Wrong password for user {username}")]
    WrongPassword { username: String },

    #[error("No user with email {email}")]
    EmailNotFound { email: String },

    #[error("Field {field} not set for user {username}")]
    FieldNotFound { username: String, field: String },

    #[error("Confirmation code not found")]
    ConfirmationCodeNotFound,

    #[error("No unique confirmation code of length {min}..={max}")]
    ConfirmationCodesExhausted { min: usize, max: usize },

    #[error("Can not set a cookie for an empty username")]
    EmptyUsername,

    #[error("Can not set a cookie for unknown user {username}")]
    CookieForUnknownUser { username: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("Only letters, numbers and underscore are allowed in usernames")]
    InvalidUsername { username: String },

    #[error("Username and password must be different")]
    PasswordMatchesUsername,
}

impl UserError {
    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            UserError::UserNotFound { .. }
                | UserError::EmailNotFound { .. }
                | UserError::FieldNotFound { .. }
                | UserError::ConfirmationCodeNotFound
        )
    }

    /// Check if this error is a failed credential check.
    pub fn is_authentication_error(&self) -> bool {
        matches!(self, UserError::WrongPassword { .. })
    }

    /// Check if this error comes from settings or from a cookie request that can never succeed.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            UserError::InvalidConfiguration { .. }
                | UserError::EmptyUsername
                | UserError::CookieForUnknownUser { .. }
        )
    }

    /// Check if registration input was rejected.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            UserError::InvalidUsername { .. } | UserError::PasswordMatchesUsername
        )
    }

    /// Check if confirmation code generation gave up.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, UserError::ConfirmationCodesExhausted { .. })
    }
}

impl From<UserError> for crate::Error {
    fn from(err: UserError) -> Self {
        crate::Error::User(err)
    }
}

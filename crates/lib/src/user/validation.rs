//! Registration input checks

use super::errors::UserError;
use crate::Result;

/// Characters allowed in a username besides ASCII letters and digits.
const EXTRA_USERNAME_CHARS: &str = "_æøåÆØÅ";

fn allowed_in_username(c: char) -> bool {
    c.is_ascii_alphanumeric() || EXTRA_USERNAME_CHARS.contains(c)
}

/// Check a username and password pair before registering it.
///
/// The username must be non-empty and use only ASCII letters, digits,
/// underscore and `æøåÆØÅ`. The password must differ from the username.
///
/// ```
/// use tollgate::user::valid_username_password;
///
/// assert!(valid_username_password("bob", "hunter1").is_ok());
/// assert!(valid_username_password("bad name", "p").is_err());
/// assert!(valid_username_password("bob", "bob").is_err());
/// ```
pub fn valid_username_password(username: &str, password: &str) -> Result<()> {
    if username.is_empty() || !username.chars().all(allowed_in_username) {
        return Err(UserError::InvalidUsername {
            username: username.to_string(),
        }
        .into());
    }
    if username == password {
        return Err(UserError::PasswordMatchesUsername.into());
    }
    Ok(())
}

//! Confirmation codes for newly registered users

use tracing::{debug, info};

use super::{Flag, UserError, UserState};
use crate::Result;
use crate::constants::{FIELD_CONFIRMATION_CODE, FIELD_CONFIRMED};

impl UserState {
    /// Store `code` for `username` and mark the user as awaiting confirmation.
    ///
    /// An already confirmed user drops back to unconfirmed.
    pub async fn add_unconfirmed(&self, username: &str, code: &str) -> Result<()> {
        self.inner
            .users
            .set(username, FIELD_CONFIRMED, Flag::stored(false))
            .await?;
        self.inner
            .users
            .set(username, FIELD_CONFIRMATION_CODE, code)
            .await?;
        // A member of `unconfirmed` always has a code to look up
        self.inner.unconfirmed.add(username).await
    }

    /// Drop the pending confirmation of `username`.
    pub async fn remove_unconfirmed(&self, username: &str) -> Result<()> {
        let results = [
            self.inner.unconfirmed.del(username).await,
            self.inner
                .users
                .del_key(username, FIELD_CONFIRMATION_CODE)
                .await,
        ];
        results.into_iter().collect()
    }

    pub async fn all_unconfirmed_usernames(&self) -> Result<Vec<String>> {
        self.inner.unconfirmed.all().await
    }

    pub async fn confirmation_code(&self, username: &str) -> Result<String> {
        self.field(username, FIELD_CONFIRMATION_CODE).await
    }

    /// Mark `username` confirmed and drop the pending code.
    ///
    /// Every step is attempted; the first error is returned.
    pub async fn confirm(&self, username: &str) -> Result<()> {
        let results = [
            self.inner.unconfirmed.del(username).await,
            self.mark_confirmed(username).await,
            self.inner
                .users
                .del_key(username, FIELD_CONFIRMATION_CODE)
                .await,
        ];
        info!(username, "user confirmed");
        results.into_iter().collect()
    }

    /// The unconfirmed user holding `code`.
    ///
    /// Users that have been removed in the meantime are skipped.
    pub async fn find_user_by_confirmation_code(&self, code: &str) -> Result<String> {
        for username in self.all_unconfirmed_usernames().await? {
            let stored = match self
                .inner
                .users
                .get(&username, FIELD_CONFIRMATION_CODE)
                .await
            {
                Ok(stored) => stored,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            };
            if stored == code && self.try_has_user(&username).await? {
                return Ok(username);
            }
        }
        Err(UserError::ConfirmationCodeNotFound.into())
    }

    /// Confirm whichever unconfirmed user holds `code`.
    pub async fn confirm_user_by_confirmation_code(&self, code: &str) -> Result<()> {
        let username = self.find_user_by_confirmation_code(code).await?;
        self.confirm(&username).await
    }

    /// True iff some unconfirmed user currently holds `code`.
    pub async fn already_has_confirmation_code(&self, code: &str) -> Result<bool> {
        for username in self.all_unconfirmed_usernames().await? {
            match self
                .inner
                .users
                .get(&username, FIELD_CONFIRMATION_CODE)
                .await
            {
                Ok(stored) if stored == code => return Ok(true),
                Ok(_) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(false)
    }

    /// A confirmation code no unconfirmed user currently holds.
    ///
    /// Starts at the minimum length and grows by one character after each
    /// collision. Gives up with [`UserError::ConfirmationCodesExhausted`] once
    /// the maximum length has collided too.
    pub async fn generate_unique_confirmation_code(&self) -> Result<String> {
        let settings = self.settings();
        let (min, max) = (
            settings.min_confirmation_code_length,
            settings.max_confirmation_code_length,
        );
        let generate = self.code_generator();

        for length in min..=max {
            let candidate = generate(length);
            if !self.already_has_confirmation_code(&candidate).await? {
                return Ok(candidate);
            }
            debug!(length, "confirmation code collision");
        }
        Err(UserError::ConfirmationCodesExhausted { min, max }.into())
    }
}

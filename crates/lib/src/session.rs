//! Binding users to HTTP requests through the signed `user` cookie.
//!
//! Being logged in takes two things: a valid cookie naming the user, and the
//! user's `loggedin` flag. [`UserState::logout`] only clears the flag, so a
//! cookie that is still valid stops granting rights right away. Use
//! [`UserState::clear_cookie`] as well to drop it from the browser.
//!
//! Cookies are `HttpOnly` and, unless [`UserState::set_secure_cookies`] is on,
//! not `Secure`. Deployments behind HTTPS should enable it or call
//! [`UserState::set_username_cookie_only_https`] directly.

use axum::http::HeaderMap;
use tracing::{debug, info};

use crate::Result;
use crate::constants::{COOKIE_PATH, USER_COOKIE};
use crate::cookie::{self, CookieOptions};
use crate::user::{UserError, UserState};

impl UserState {
    /// The username carried by the request cookie, or an empty string.
    pub fn username(&self, headers: &HeaderMap) -> String {
        self.username_cookie(headers).unwrap_or_default()
    }

    /// The username carried by the request cookie.
    ///
    /// Fails when the cookie is missing, forged or expired.
    pub fn username_cookie(&self, headers: &HeaderMap) -> Result<String> {
        Ok(self.cookies().read_secure_cookie(headers, USER_COOKIE)?)
    }

    /// Add a `Set-Cookie` header naming `username` to the response headers.
    ///
    /// Nothing is written for an empty or unknown username.
    pub async fn set_username_cookie(&self, headers: &mut HeaderMap, username: &str) -> Result<()> {
        self.write_username_cookie(headers, username, false).await
    }

    /// Like [`UserState::set_username_cookie`], with the `Secure` attribute.
    pub async fn set_username_cookie_only_https(
        &self,
        headers: &mut HeaderMap,
        username: &str,
    ) -> Result<()> {
        self.write_username_cookie(headers, username, true).await
    }

    async fn write_username_cookie(
        &self,
        headers: &mut HeaderMap,
        username: &str,
        secure: bool,
    ) -> Result<()> {
        if username.is_empty() {
            return Err(UserError::EmptyUsername.into());
        }
        if !self.try_has_user(username).await? {
            return Err(UserError::CookieForUnknownUser {
                username: username.to_string(),
            }
            .into());
        }
        let options = CookieOptions {
            path: COOKIE_PATH,
            ttl: self.cookie_timeout(),
            secure,
            http_only: true,
        };
        self.cookies()
            .set_secure_cookie(headers, USER_COOKIE, username, options)?;
        Ok(())
    }

    /// Mark `username` as logged in and hand out its cookie.
    ///
    /// The flag stays set if writing the cookie fails.
    pub async fn login(&self, headers: &mut HeaderMap, username: &str) -> Result<()> {
        self.set_logged_in(username).await?;
        self.write_username_cookie(headers, username, self.secure_cookies())
            .await?;
        info!(username, "logged in");
        Ok(())
    }

    /// Clear the `loggedin` flag. The cookie is left alone.
    pub async fn logout(&self, username: &str) -> Result<()> {
        self.set_logged_out(username).await?;
        info!(username, "logged out");
        Ok(())
    }

    /// Add a `Set-Cookie` header that expires the username cookie.
    pub fn clear_cookie(&self, headers: &mut HeaderMap) -> Result<()> {
        cookie::clear_cookie(headers, USER_COOKIE, COOKIE_PATH)?;
        Ok(())
    }

    /// True iff the request carries a valid cookie for a logged-in user.
    pub async fn user_rights(&self, headers: &HeaderMap) -> bool {
        match self.username_cookie(headers) {
            Ok(username) => self.is_logged_in(&username).await,
            Err(e) => {
                debug!(error = %e, "no user rights");
                false
            }
        }
    }

    /// True iff [`UserState::user_rights`] holds and the user is an admin.
    pub async fn admin_rights(&self, headers: &HeaderMap) -> bool {
        match self.username_cookie(headers) {
            Ok(username) => self.is_logged_in(&username).await && self.is_admin(&username).await,
            Err(e) => {
                debug!(error = %e, "no admin rights");
                false
            }
        }
    }
}

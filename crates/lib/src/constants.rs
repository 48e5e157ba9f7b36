//! Constants used throughout the Tollgate library.
//!
//! Central definitions for collection identifiers, user field names, cookie
//! parameters and the default path prefixes of the permission middleware.

use std::time::Duration;

/// Collection id of the set holding every registered username.
pub const USERNAMES: &str = "usernames";

/// Collection id of the set holding usernames that still await confirmation.
pub const UNCONFIRMED: &str = "unconfirmed";

/// Collection id of the `user -> field -> value` hash map.
pub const USERS: &str = "users";

/// User field holding the password hash.
pub const FIELD_PASSWORD: &str = "password";

/// User field holding the e-mail address.
pub const FIELD_EMAIL: &str = "email";

/// Boolean user field set while the user is logged in.
pub const FIELD_LOGGED_IN: &str = "loggedin";

/// Boolean user field set once the user has been confirmed.
pub const FIELD_CONFIRMED: &str = "confirmed";

/// Boolean user field marking administrators.
pub const FIELD_ADMIN: &str = "admin";

/// User field holding the pending confirmation code.
pub const FIELD_CONFIRMATION_CODE: &str = "confirmationCode";

/// User field holding a short-lived authentication token.
pub const FIELD_TOKEN: &str = "token";

/// Boolean fields written as `"false"` when a user is added.
pub const REQUIRED_FLAGS: [&str; 3] = [FIELD_LOGGED_IN, FIELD_CONFIRMED, FIELD_ADMIN];

/// Name of the cookie carrying the username.
pub const USER_COOKIE: &str = "user";

/// Path of the username cookie.
pub const COOKIE_PATH: &str = "/";

/// Default lifetime of a login cookie.
pub const DEFAULT_COOKIE_TTL: Duration = Duration::from_secs(24 * 3600);

/// Length of a generated cookie secret.
pub const COOKIE_SECRET_LENGTH: usize = 30;

/// Default minimum length of a generated confirmation code.
pub const MIN_CONFIRMATION_CODE_LENGTH: usize = 20;

/// Generated confirmation codes never get longer than this.
pub const MAX_CONFIRMATION_CODE_LENGTH: usize = 100;

/// bcrypt work factor used for new hashes.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Lowest work factor bcrypt accepts.
pub const MIN_BCRYPT_COST: u32 = 4;

/// Highest work factor bcrypt accepts.
pub const MAX_BCRYPT_COST: u32 = 31;

/// Default admin-only path prefixes.
pub const DEFAULT_ADMIN_PREFIXES: &[&str] = &["/admin"];

/// Default user-only path prefixes.
pub const DEFAULT_USER_PREFIXES: &[&str] = &["/repo", "/data"];

/// Default public path prefixes.
pub const DEFAULT_PUBLIC_PREFIXES: &[&str] = &[
    "/",
    "/login",
    "/register",
    "/favicon.ico",
    "/style",
    "/img",
    "/js",
    "/robots.txt",
    "/sitemap_index.xml",
];

/// Body of the default deny response.
pub const PERMISSION_DENIED: &str = "Permission denied.";

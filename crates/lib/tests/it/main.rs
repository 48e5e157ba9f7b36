/*! Integration tests for Tollgate.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the main library structure:
 * - backend: Tests for the capability traits against every backend
 * - user: Tests for the user store (lifecycle, passwords, confirmation codes)
 * - session: Tests for the username cookie and login state
 * - permissions: Tests for the path-prefix middleware
 * - scenarios: End-to-end flows across all of the above
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("tollgate=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod helpers;
mod permissions;
mod scenarios;
mod session;
mod user;

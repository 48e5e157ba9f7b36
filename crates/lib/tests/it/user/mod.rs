//! User store integration tests

mod confirmation_tests;
mod lifecycle_tests;

//! Session binding integration tests

mod cookie_tests;
mod rights_tests;

//! Permission middleware integration tests

mod middleware_tests;

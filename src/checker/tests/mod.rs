mod check_tests;
pub mod common;

mod engine_tests;
pub mod common;

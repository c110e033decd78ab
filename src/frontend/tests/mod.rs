// Common test utilities
mod common;

// Test modules organized by component
mod expr_parser;
mod spec_parser;

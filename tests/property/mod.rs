//! Property-based tests for the sqrt cache harness.
//!
//! Run with: cargo test --test property_tests
//!
//! These tests use proptest to generate argument sets and verify that
//! invariants hold across both call paths.

pub mod caching;

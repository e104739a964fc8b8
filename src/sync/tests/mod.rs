//! Unit tests for the sync layer.

mod repair_tests;
mod writer_tests;

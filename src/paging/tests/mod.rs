//! Unit tests for the paging layer.

mod controller_tests;

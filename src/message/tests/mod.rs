//! Unit tests for the message mirror.
//!
//! Domain tests cover ordering and coverage rules; store tests run the same
//! contract against both adapters.

mod domain_tests;

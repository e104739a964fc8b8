//! Step definitions for the pagination feature.

mod given;
mod then;
mod when;
pub mod world;

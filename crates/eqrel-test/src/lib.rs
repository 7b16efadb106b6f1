//! Shared test fixtures for eqrel crates.
//!
//! - [`shapes`] - Boxes with top, bottom and height variables
//! - [`ladder`] - Totally ordered priority levels
//!
//! # Usage
//!
//! Add as a dev-dependency in your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! eqrel-test = { workspace = true }
//! ```
//!
//! Then import the fixtures you need:
//!
//! ```ignore
//! use eqrel_test::{BoxShape, PriorityLadder};
//! ```

pub mod ladder;
pub mod shapes;

pub use ladder::PriorityLadder;
pub use shapes::BoxShape;

//! Core types and trait definitions for the school census backend.
//!
//! No HTTP or database code lives here. The store and the server crates
//! build on these types and traits.

pub mod census;
pub mod error;
pub mod export;
pub mod folder;
pub mod locations;
pub mod school;
pub mod sink;
pub mod store;

pub use error::{Error, Result};

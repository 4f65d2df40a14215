//! Core trait abstractions for the capture library.
//!
//! These traits define the seams applications plug into: per-provider
//! custom strategies, key/value persistence, the history backend, and the
//! page input surface.

pub mod backend;
pub mod input;
pub mod store;
pub mod strategy;

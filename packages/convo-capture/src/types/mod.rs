//! Domain types: conversations, persisted history records, descriptors, config.

pub mod config;
pub mod conversation;
pub mod descriptor;
pub mod history;

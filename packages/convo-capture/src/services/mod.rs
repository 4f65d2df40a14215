//! Services composed over the engine: descriptor resolution and sync.

pub mod descriptor_store;
pub mod sync;

pub use descriptor_store::{builtin_descriptor_values, DescriptorStore, ResolvedDescriptors, Source};
pub use sync::{extract_page, to_backend_payload, SyncAllReport, SyncOutcome, SyncService};

//! Provider descriptors: the built-in set, the transport format, custom
//! strategies and the registry the engine resolves pages against.

pub mod builtin;
pub mod custom;
pub mod registry;
pub mod transport;

pub use builtin::{builtin_descriptors, builtin_registry, BUILTIN_VERSION};
pub use custom::{DeepSeekContent, DeepSeekRole, DoubaoId, DoubaoRole, DoubaoTitle};
pub use registry::{resolve_active_descriptor, url_pattern_matches, ProviderRegistry};
pub use transport::{decode_descriptors, OneOrMany, StoredDescriptor, StrategyRegistry};

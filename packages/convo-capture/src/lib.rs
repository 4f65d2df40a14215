//! Provider-Agnostic Chat Transcript Capture
//!
//! Extracts AI chat transcripts from provider web pages into one canonical
//! conversation shape, merges repeated captures of the same conversation
//! without duplicating messages, and syncs the result to a history backend.
//!
//! # Design
//!
//! - Providers are data: a [`ProviderDescriptor`] says where the id, title,
//!   messages, roles and timestamps live on one site's page
//! - Logic a descriptor cannot express plugs in as a named custom strategy
//! - Extraction and merging are synchronous and pure; only storage and the
//!   backend are async
//!
//! # Usage
//!
//! ```rust,ignore
//! use convo_capture::{builtin_registry, extract_page, Page, StrategyRegistry};
//!
//! let registry = builtin_registry(&StrategyRegistry::with_builtins());
//! let page = Page::parse("https://chatgpt.com/c/abc123", &html);
//! let conversation = extract_page(&registry, &page)?;
//! ```
//!
//! # Modules
//!
//! - [`dom`] - Parsed page and element queries
//! - [`pipeline`] - Extraction engine, dedup and merge
//! - [`providers`] - Built-in descriptors, transport format, custom strategies
//! - [`services`] - Descriptor store and sync service
//! - [`fill`] - Prompt templates and input filling
//! - [`stores`] - Key/value store implementations
//! - [`testing`] - Mock backend and fixtures

pub mod dom;
pub mod error;
pub mod fill;
pub mod pipeline;
pub mod providers;
pub mod services;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use dom::Page;
pub use error::{
    BackendError, DescriptorError, ExtractionError, FillError, StoreError, SyncError, SyncResult,
};
pub use traits::{
    backend::HistoryBackend,
    input::{InputEvent, InputEventKind, InputHandle, InputKind, InputSurface},
    store::KeyValueStore,
    strategy::{
        ContentExtractor, Custom, IdResolver, MessageFilter, MessageFinder, RoleDetector, Strategy,
        TimestampParser, TitleResolver,
    },
};
pub use types::{
    config::SyncConfig,
    conversation::{Conversation, Message, Role},
    descriptor::{
        ContentStrategy, IdRule, IdStrategy, MessageStrategy, ProviderDescriptor, RoleRules, TimestampRule,
        TitleRule, TitleStrategy,
    },
    history::{
        build_history_key, build_quarantine_key, ChatPayload, HistoryRecord, HISTORY_KEY_PREFIX, QUARANTINE_KEY_PREFIX,
        UNTITLED_CONVERSATION,
    },
};

// Re-export pipeline components
pub use pipeline::{
    deduplicate_messages, detect_role, extract_conversation, generate_message_hash, merge_messages,
    normalize_conversation, normalize_conversation_at, resolve_conversation_id, resolve_title,
};

// Re-export providers and services
pub use fill::{fill_for_descriptor, fill_input, render_template, template_variables_from, TemplateVariable};
pub use providers::{
    builtin_registry, resolve_active_descriptor, url_pattern_matches, ProviderRegistry, StoredDescriptor,
    StrategyRegistry,
};
pub use services::{
    extract_page, to_backend_payload, DescriptorStore, ResolvedDescriptors, Source, SyncAllReport,
    SyncOutcome, SyncService,
};
pub use stores::{list_histories, FileStore, MemoryStore};

pub use history_api_client::{HistoryApiClient, LibraryItemKind};

//! Extraction pipeline - the core of the library.
//!
//! The pipeline orchestrates:
//! - Identity and title resolution
//! - Message discovery with per-message role, content and timestamp
//! - Fingerprinting and order-preserving deduplication
//! - Merging a fresh extraction into the stored history record

pub mod dedupe;
pub mod extract;
pub mod identity;
pub mod messages;
pub mod normalize;
pub mod role;

pub use dedupe::{deduplicate_messages, generate_message_hash};
pub use extract::{extract_conversation, infer_role};
pub use identity::{resolve_conversation_id, resolve_title};
pub use messages::{collect_message_elements, extract_content, extract_timestamp, parse_timestamp};
pub use normalize::{merge_messages, normalize_conversation, normalize_conversation_at};
pub use role::{detect_role, match_class_hints};

//! # xrit-core
//!
//! The control channel between a Node (orchestrator) and a Service (host)
//! - THE LOGIC.
//!
//! The Node pushes a declarative configuration of live data sources; the
//! Service reconciles it against the sources it already runs, reports
//! structured errors, and pushes status back.
//!
//! ## Data Flow
//!
//! ```text
//! frames ──► ChunkedChannel ──► envelope ──► codec::from_str ──► Configuration
//!                                                                    │
//!                                                                reconcile ◄──► SourceBackend
//!                                                                    │
//! frames ◄── ChunkedChannel ◄── envelope ◄── codec::to_string ◄── result / status
//! ```
//!
//! ## Architectural Constraints
//!
//! - No async, no sockets, no logging: the app crate owns all I/O
//! - Parsing and reconciliation accumulate errors instead of failing fast
//! - Types plug into the codec through static reflection tables

// =============================================================================
// MODULES
// =============================================================================

pub mod channel;
pub mod codec;
pub mod document;
pub mod error;
pub mod identifier;
pub mod livelink;
pub mod mock;
pub mod primitives;
pub mod protocol;
pub mod reconcile;
pub mod reflect;

#[doc(hidden)]
pub use serde_json;

// =============================================================================
// RE-EXPORTS: Plumbing
// =============================================================================

pub use error::{LiveLinkError, LiveLinkErrorCode, ParseError, ParseErrorCode, XritError};
pub use identifier::{Identifier, IdentifierError};
pub use reflect::{Category, MapKey, Reflect, ReflectEnum, ReflectRecord, ReflectVariant};

// =============================================================================
// RE-EXPORTS: Wire
// =============================================================================

pub use channel::{ChunkedChannel, Frame, FrameFlags, TransmitRequester};
pub use protocol::{
    Channel, Message, NodeCommand, ServiceCommand, create_node_message, create_service_message,
    decode_node_message, decode_service_message, split_message,
};

// =============================================================================
// RE-EXPORTS: Domain
// =============================================================================

pub use document::{Configuration, Ip, LiveLink, SetConfigurationResult};
pub use livelink::{LiveLinkSource, LiveLinkSourceSettings, SourceKind};
pub use reconcile::{SourceBackend, SourceCache, SourceCacheEntry, collect_status, reconcile};

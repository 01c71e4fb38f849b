//! Core domain models for the mensa vendor marketplace.
//!
//! Provides strongly-typed identifiers, the closed action and priority
//! enums, integration event definitions, and the shared error taxonomy.
//! All other crates depend on these foundational types for type safety
//! and consistency.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod models;
pub mod time;

pub use error::{CoreError, Result};
pub use events::{EventDraft, EventKind, EventSource, IntegrationEvent, DEFAULT_MAX_RETRIES};
pub use models::{
    Action, ActorId, EventId, MarketplaceRequest, Priority, RequestId, RiskTier, SchoolId,
    VendorId,
};
pub use time::{Clock, RealClock, TestClock};

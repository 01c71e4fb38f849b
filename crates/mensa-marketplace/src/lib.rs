//! Vendor marketplace integration layer.
//!
//! This crate implements the request-routing core of the school
//! food-ordering platform's vendor marketplace: inbound action requests
//! are validated against a closed action set, admitted under a fixed
//! in-flight ceiling, served from a whitelisted result cache where
//! possible, and dispatched to exactly one handler backed by external
//! collaborator services. Handlers publish retryable integration events
//! on a priority-aware in-memory queue.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────┐   ┌─────────┐   ┌──────────────┐
//! │ Validator │──▶│ Capacity │──▶│ Result  │──▶│ ActionRouter │
//! │           │   │ Governor │   │ Cache   │   │ (10 actions) │
//! └───────────┘   └──────────┘   └─────────┘   └──────┬───────┘
//!                                                     │ events
//!                                                     ▼
//!                                           ┌──────────────────┐
//!                                           │ EventDispatcher  │
//!                                           │ inline + drained │
//!                                           └──────────────────┘
//! ```
//!
//! # Key Properties
//!
//! - **Exhaustive dispatch** - the action enum is closed; an unhandled
//!   action cannot compile
//! - **Guaranteed release** - capacity permits are RAII guards, released
//!   on every exit path
//! - **Bounded queues** - event lanes reject overflow instead of growing
//! - **Exactly-one processing path** - immediate-priority events are
//!   never also queued
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use mensa_core::RealClock;
//! use mensa_marketplace::{
//!     Collaborators, MarketplaceConfig, MarketplaceService, RawRequest,
//! };
//!
//! # async fn example(collaborators: Collaborators) {
//! let config = MarketplaceConfig::default();
//! let service = MarketplaceService::new(config, collaborators, Arc::new(RealClock));
//! service.start();
//!
//! let envelope = service
//!     .process_request(RawRequest {
//!         school_id: "school-042".into(),
//!         actor_id: "admin-7".into(),
//!         action: "search_vendors".into(),
//!         ..Default::default()
//!     })
//!     .await;
//! assert!(envelope.success);
//!
//! service.shutdown().await;
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod capacity;
pub mod collaborators;
pub mod config;
pub mod dashboard;
pub mod dispatch;
pub mod envelope;
pub mod metrics;
pub mod risk;
pub mod router;
pub mod service;
pub mod validate;

pub use cache::{cache_key, InMemoryCacheStore, ResultCache};
pub use capacity::{CapacityGovernor, CapacityPermit};
pub use collaborators::Collaborators;
pub use config::MarketplaceConfig;
pub use dashboard::{DashboardPayload, RawDashboardQuery, Timeframe};
pub use dispatch::{DispatchConfig, EventDispatcher};
pub use envelope::{ResponseMeta, ResultEnvelope, ERROR_SENTINEL};
pub use metrics::{MarketplaceStats, StatsSnapshot};
pub use router::{ActionRouter, ResponseData, RouteOutcome};
pub use service::MarketplaceService;
pub use validate::{validate, RawRequest};

/// Default in-flight request ceiling.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 100;

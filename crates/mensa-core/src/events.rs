//! Integration event types for decoupled side-channel notifications.
//!
//! Handlers describe the events they want published as [`EventDraft`]s;
//! the dispatcher stamps each draft with a generated id and timestamp when
//! it is emitted. Events carry a retry budget and are processed either
//! inline (high and critical priority) or by a periodic queue drain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{EventId, Priority};

/// Default retry budget for integration events.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// The kind of integration event.
///
/// Five kinds have registered processors; the remainder are announcements
/// that downstream systems observe out of band. Announcements are logged
/// and dropped by the processor without retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A vendor's tracked performance crossed an alert threshold.
    VendorPerformanceAlert,
    /// An order moved to a new lifecycle status.
    OrderStatusChange,
    /// Automated quality control recommended rejection.
    QualityInspectionFailed,
    /// A delivery slipped past its committed window.
    DeliveryDelayed,
    /// Sustainability tracking crossed a configured threshold.
    SustainabilityThresholdExceeded,
    /// An RFP document was generated and persisted.
    RfpGenerated,
    /// An order was orchestrated and placed.
    OrderPlaced,
    /// A marketplace request failed after acceptance.
    RequestFailed,
}

impl EventKind {
    /// Whether a processor is registered for this kind.
    pub const fn is_processable(&self) -> bool {
        matches!(
            self,
            Self::VendorPerformanceAlert
                | Self::OrderStatusChange
                | Self::QualityInspectionFailed
                | Self::DeliveryDelayed
                | Self::SustainabilityThresholdExceeded
        )
    }

    /// Returns the snake_case wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::VendorPerformanceAlert => "vendor_performance_alert",
            Self::OrderStatusChange => "order_status_change",
            Self::QualityInspectionFailed => "quality_inspection_failed",
            Self::DeliveryDelayed => "delivery_delayed",
            Self::SustainabilityThresholdExceeded => "sustainability_threshold_exceeded",
            Self::RfpGenerated => "rfp_generated",
            Self::OrderPlaced => "order_placed",
            Self::RequestFailed => "request_failed",
        }
    }
}

/// Component that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    /// The marketplace action router itself.
    MarketplaceRouter,
    /// The procurement recommendation engine.
    ProcurementEngine,
    /// The vendor intelligence service.
    VendorIntelligence,
    /// The supply chain automation service.
    SupplyChainAutomation,
}

impl EventSource {
    /// Returns the snake_case wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MarketplaceRouter => "marketplace_router",
            Self::ProcurementEngine => "procurement_engine",
            Self::VendorIntelligence => "vendor_intelligence",
            Self::SupplyChainAutomation => "supply_chain_automation",
        }
    }
}

/// Event description produced by an action handler, before emission.
///
/// Drafts carry no identity or timestamp; the dispatcher stamps those at
/// emission time so that every emitted event has exactly one id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDraft {
    /// Kind of event to publish.
    pub kind: EventKind,

    /// Component publishing the event.
    pub source: EventSource,

    /// Optional target component or recipient hint.
    pub target: Option<String>,

    /// Untyped event payload.
    pub payload: serde_json::Value,

    /// Processing priority.
    pub priority: Priority,
}

impl EventDraft {
    /// Creates a draft with the default medium priority and no target.
    pub fn new(kind: EventKind, source: EventSource, payload: serde_json::Value) -> Self {
        Self { kind, source, target: None, payload, priority: Priority::default() }
    }

    /// Sets the draft priority.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the target hint.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

/// A stamped, retryable integration event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationEvent {
    /// Generated event identifier.
    pub id: EventId,

    /// Kind of event.
    pub kind: EventKind,

    /// Component that produced the event.
    pub source: EventSource,

    /// Optional target component or recipient hint.
    pub target: Option<String>,

    /// Untyped event payload.
    pub payload: serde_json::Value,

    /// Emission timestamp.
    pub created_at: DateTime<Utc>,

    /// Processing priority.
    pub priority: Priority,

    /// Completed failed attempts so far. Starts at zero.
    pub retry_count: u32,

    /// Retry budget before the event is marked permanently failed.
    pub max_retries: u32,
}

impl IntegrationEvent {
    /// Stamps a draft into an event with identity and timestamp.
    pub fn stamp(draft: EventDraft, created_at: DateTime<Utc>, max_retries: u32) -> Self {
        Self {
            id: EventId::new(),
            kind: draft.kind,
            source: draft.source,
            target: draft.target,
            payload: draft.payload,
            created_at,
            priority: draft.priority,
            retry_count: 0,
            max_retries,
        }
    }
}

//! Request fixtures and builders.

use mensa_marketplace::{dashboard::RawDashboardQuery, RawRequest};
use serde_json::{Map, Value};

/// Builder for raw marketplace requests with sensible test defaults.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    school_id: String,
    actor_id: String,
    action: String,
    parameters: Option<Value>,
    priority: Option<String>,
    metadata: Option<Map<String, Value>>,
}

impl RequestBuilder {
    /// Starts a request for the given action wire name.
    pub fn new(action: &str) -> Self {
        Self {
            school_id: "school-042".into(),
            actor_id: "admin-7".into(),
            action: action.into(),
            parameters: None,
            priority: None,
            metadata: None,
        }
    }

    /// Overrides the school id.
    #[must_use]
    pub fn school(mut self, school_id: &str) -> Self {
        self.school_id = school_id.into();
        self
    }

    /// Overrides the actor id.
    #[must_use]
    pub fn actor(mut self, actor_id: &str) -> Self {
        self.actor_id = actor_id.into();
        self
    }

    /// Sets the parameter bag.
    #[must_use]
    pub fn parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Sets the priority wire name.
    #[must_use]
    pub fn priority(mut self, priority: &str) -> Self {
        self.priority = Some(priority.into());
        self
    }

    /// Builds the raw request.
    pub fn build(self) -> RawRequest {
        RawRequest {
            school_id: self.school_id,
            actor_id: self.actor_id,
            action: self.action,
            parameters: self.parameters,
            priority: self.priority,
            metadata: self.metadata,
        }
    }
}

/// A well-formed dashboard query for tests.
pub fn dashboard_query(timeframe: &str) -> RawDashboardQuery {
    RawDashboardQuery {
        school_id: "school-042".into(),
        timeframe: timeframe.into(),
        metrics: vec!["orders".into(), "spend".into()],
        filters: None,
    }
}

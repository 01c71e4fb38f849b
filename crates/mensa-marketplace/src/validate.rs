//! Request validation.
//!
//! Parses an inbound raw request into a typed [`MarketplaceRequest`].
//! Validation is a pure function with no side effects: any defect in the
//! shape rejects the whole request before capacity accounting, caching,
//! or dispatch happen.

use mensa_core::{Action, ActorId, CoreError, MarketplaceRequest, Priority, Result, SchoolId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Unvalidated request shape as received from the caller.
///
/// Every field the caller can get wrong is optional or stringly typed
/// here; [`validate`] is the only path to a [`MarketplaceRequest`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRequest {
    /// Tenant (school) identifier.
    #[serde(default)]
    pub school_id: String,

    /// Acting-user identifier.
    #[serde(default)]
    pub actor_id: String,

    /// Action wire name.
    #[serde(default)]
    pub action: String,

    /// Per-action parameter bag.
    #[serde(default)]
    pub parameters: Option<Value>,

    /// Priority wire name; absent means medium.
    #[serde(default)]
    pub priority: Option<String>,

    /// Open metadata bag.
    #[serde(default)]
    pub metadata: Option<serde_json::Map<String, Value>>,
}

/// Validates a raw request into its typed form.
///
/// Checks that the school and actor identifiers are non-empty, the action
/// is one of the ten recognized wire names, and the priority (when given)
/// is one of the four recognized levels. Optional bags default to empty.
pub fn validate(raw: RawRequest) -> Result<MarketplaceRequest> {
    if raw.school_id.trim().is_empty() {
        return Err(CoreError::validation("school_id must be non-empty"));
    }
    if raw.actor_id.trim().is_empty() {
        return Err(CoreError::validation("actor_id must be non-empty"));
    }

    let action: Action = raw.action.parse()?;

    let priority = match raw.priority.as_deref() {
        None | Some("") => Priority::default(),
        Some(p) => p.parse()?,
    };

    Ok(MarketplaceRequest {
        school_id: SchoolId::new(raw.school_id),
        actor_id: ActorId::new(raw.actor_id),
        action,
        parameters: raw.parameters.unwrap_or_else(|| Value::Object(Default::default())),
        priority,
        metadata: raw.metadata.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn raw(action: &str) -> RawRequest {
        RawRequest {
            school_id: "school-042".into(),
            actor_id: "admin-7".into(),
            action: action.into(),
            ..Default::default()
        }
    }

    #[test]
    fn valid_request_passes_with_defaults() {
        let request = validate(raw("search_vendors")).expect("should validate");
        assert_eq!(request.action, Action::SearchVendors);
        assert_eq!(request.priority, Priority::Medium);
        assert_eq!(request.parameters, json!({}));
        assert!(request.metadata.is_empty());
    }

    #[test]
    fn empty_school_id_rejected() {
        let mut r = raw("place_order");
        r.school_id = "  ".into();
        let err = validate(r).unwrap_err();
        assert_eq!(err.code(), "M1001");
    }

    #[test]
    fn empty_actor_id_rejected() {
        let mut r = raw("place_order");
        r.actor_id = String::new();
        let err = validate(r).unwrap_err();
        assert_eq!(err.code(), "M1001");
    }

    #[test]
    fn unknown_action_rejected_as_unsupported() {
        let err = validate(raw("summon_chef")).unwrap_err();
        assert_eq!(err.code(), "M1002");
    }

    #[test]
    fn unknown_priority_rejected() {
        let mut r = raw("cost_analysis");
        r.priority = Some("urgent".into());
        let err = validate(r).unwrap_err();
        assert_eq!(err.code(), "M1001");
    }

    #[test]
    fn explicit_priority_honored() {
        let mut r = raw("quality_inspection");
        r.priority = Some("critical".into());
        let request = validate(r).expect("should validate");
        assert_eq!(request.priority, Priority::Critical);
    }

    #[test]
    fn parameter_bag_passed_through() {
        let mut r = raw("track_delivery");
        r.parameters = Some(json!({"order_id": "ord-9"}));
        let request = validate(r).expect("should validate");
        assert_eq!(request.parameters["order_id"], "ord-9");
    }
}

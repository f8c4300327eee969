//! Request payloads for the billing API verbs the pipeline uses.

use crate::models::{EntityId, UsageWindow};
use serde_json::{Value, json};

pub const LIST_SUBSCRIBER: &str = "listSubscriber";
pub const LIST_SUBSCRIBER_PACKAGES: &str = "listSubscriberPrepaidPackages";
pub const LIST_TEMPLATE: &str = "listPrepaidPackageTemplate";
pub const GET_TEMPLATE: &str = "getPrepaidPackageTemplate";
pub const SUBSCRIBER_USAGE: &str = "subscriberUsageOverPeriod";

/// Timestamp format the usage endpoint expects.
const PERIOD_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn list_subscriber(account_id: i64) -> Value {
    json!({ LIST_SUBSCRIBER: { "accountId": account_id } })
}

pub fn list_subscriber_packages(subscriber_id: &EntityId) -> Value {
    json!({ LIST_SUBSCRIBER_PACKAGES: { "subscriber": { "subscriberId": subscriber_id.to_value() } } })
}

/// Lookup verb A: list-style, keyed by `templateId`.
pub fn list_template(template_id: &EntityId) -> Value {
    json!({ LIST_TEMPLATE: { "templateId": template_id.to_value() } })
}

/// Lookup verb B: get-style, keyed by `prepaidpackagetemplateid`.
pub fn get_template(template_id: &EntityId) -> Value {
    json!({ GET_TEMPLATE: { "prepaidpackagetemplateid": template_id.to_value() } })
}

pub fn subscriber_usage(subscriber_id: &EntityId, window: &UsageWindow) -> Value {
    json!({
        SUBSCRIBER_USAGE: {
            "subscriber": { "subscriberId": subscriber_id.to_value() },
            "period": {
                "start": window.start.format(PERIOD_FORMAT).to_string(),
                "end": window.end.format(PERIOD_FORMAT).to_string(),
            }
        }
    })
}

/// The verb a payload invokes, i.e. its first top-level key.
pub fn verb_of(payload: &Value) -> &str {
    payload
        .as_object()
        .and_then(|map| map.keys().next())
        .map(String::as_str)
        .unwrap_or("unknown")
}

/// Arguments object of a payload, whatever its verb.
pub fn args_of(payload: &Value) -> &Value {
    payload
        .as_object()
        .and_then(|map| map.values().next())
        .unwrap_or(&Value::Null)
}

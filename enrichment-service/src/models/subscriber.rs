//! Subscriber as returned by the listing call.

use super::EntityId;
use crate::pipeline::shape::{pick_id, pick_string};
use serde_json::Value;

const SUBSCRIBER_ID: &[&str] = &["/subscriberId", "/id"];
const ICCID: &[&str] = &["/iccid", "/imsiList/0/iccid", "/sim/iccid"];
const IMSI: &[&str] = &["/imsi", "/imsiList/0/imsi"];
const MSISDN: &[&str] = &["/msisdn", "/phoneNumber", "/imsiList/0/msisdn"];
const STATUS: &[&str] = &["/status", "/subscriberStatus", "/sim/status"];
const ACCOUNT_ID: &[&str] = &["/accountId", "/account/id"];
const RESELLER_ID: &[&str] = &["/resellerId", "/reseller/id"];
const TEMPLATE_ID_HINT: &[&str] = &[
    "/prepaidpackagetemplateid",
    "/prepaidPackageTemplateId",
    "/templateId",
];
const TEMPLATE_NAME_HINT: &[&str] = &["/prepaidpackagetemplatename", "/templateName"];

/// A subscriber from the account listing. Read-only; enriched into a `Row`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Subscriber {
    /// Required for every follow-up lookup. A listing entry without one still
    /// produces a row, just an unenriched one.
    pub subscriber_id: Option<EntityId>,
    pub iccid: Option<String>,
    pub imsi: Option<String>,
    pub msisdn: Option<String>,
    pub status: Option<String>,
    pub account_id: Option<EntityId>,
    pub reseller_id: Option<EntityId>,
    /// Hints the listing may or may not populate.
    pub template_id: Option<EntityId>,
    pub template_name: Option<String>,
}

impl Subscriber {
    pub fn from_value(value: &Value) -> Self {
        Self {
            subscriber_id: pick_id(value, SUBSCRIBER_ID),
            iccid: pick_string(value, ICCID),
            imsi: pick_string(value, IMSI),
            msisdn: pick_string(value, MSISDN),
            status: pick_string(value, STATUS),
            account_id: pick_id(value, ACCOUNT_ID),
            reseller_id: pick_id(value, RESELLER_ID),
            template_id: pick_id(value, TEMPLATE_ID_HINT),
            template_name: pick_string(value, TEMPLATE_NAME_HINT),
        }
    }
}

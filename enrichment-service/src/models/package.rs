//! Prepaid package, the canonical shape regardless of how the upstream nested it.

use super::EntityId;
use crate::pipeline::shape::{pick_bytes, pick_decimal, pick_id, pick_string, pick_timestamp};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

const PACKAGE_ID: &[&str] = &["/subscriberprepaidpackageid", "/packageId", "/id"];
const TEMPLATE_ID: &[&str] = &[
    "/prepaidpackagetemplate/prepaidpackagetemplateid",
    "/prepaidpackagetemplateid",
    "/templateId",
];
const TEMPLATE_NAME: &[&str] = &[
    "/prepaidpackagetemplate/prepaidpackagetemplatename",
    "/prepaidpackagetemplatename",
    "/templateName",
];
const ACTIVATED_AT: &[&str] = &["/tsactivationutc", "/activationDate", "/activation/ts"];
const EXPIRES_AT: &[&str] = &["/tsexpirationutc", "/expirationDate", "/expiration/ts"];
const PROVISIONED_BYTES: &[&str] = &["/pckdatabyte", "/dataBytes", "/data/provisioned"];
const USED_BYTES: &[&str] = &["/useddatabyte", "/usedDataBytes", "/data/used"];
const ONE_TIME_FEE: &[&str] = &[
    "/oneTimeFee",
    "/onetimefee",
    "/activationFee",
    "/prepaidpackagetemplate/oneTimeFee",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Package {
    pub package_id: Option<EntityId>,
    pub template_id: Option<EntityId>,
    pub template_name: Option<String>,
    pub activated_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub provisioned_bytes: Option<u64>,
    pub used_bytes: Option<u64>,
    /// Fee embedded in the package itself; only a fallback for the template price.
    pub one_time_fee: Option<Decimal>,
}

impl Package {
    pub fn from_value(value: &Value) -> Self {
        Self {
            package_id: pick_id(value, PACKAGE_ID),
            template_id: pick_id(value, TEMPLATE_ID),
            template_name: pick_string(value, TEMPLATE_NAME),
            activated_at: pick_timestamp(value, ACTIVATED_AT),
            expires_at: pick_timestamp(value, EXPIRES_AT),
            provisioned_bytes: pick_bytes(value, PROVISIONED_BYTES),
            used_bytes: pick_bytes(value, USED_BYTES),
            one_time_fee: pick_decimal(value, ONE_TIME_FEE),
        }
    }

    /// Activation time used for "latest package" ordering; missing sorts as the epoch.
    pub fn activation_sort_key(&self) -> i64 {
        self.activated_at.map(|t| t.timestamp_millis()).unwrap_or(0)
    }
}

//! Externally visible output of the pipeline.

use super::{EntityId, Package, Subscriber, UsageTotals};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One fully (or partially) enriched subscriber. Every listed subscriber gets
/// exactly one row; enrichment that failed shows up as `null` fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub subscriber_id: Option<EntityId>,
    pub iccid: Option<String>,
    pub imsi: Option<String>,
    pub msisdn: Option<String>,
    pub status: Option<String>,
    pub account_id: Option<EntityId>,
    pub reseller_id: Option<EntityId>,

    pub package_id: Option<EntityId>,
    #[serde(rename = "prepaidpackagetemplateid")]
    pub template_id: Option<EntityId>,
    #[serde(rename = "prepaidpackagetemplatename")]
    pub template_name: Option<String>,
    #[serde(rename = "tsactivationutc")]
    pub activated_at: Option<DateTime<Utc>>,
    #[serde(rename = "tsexpirationutc")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(rename = "pckdatabyte")]
    pub provisioned_bytes: Option<u64>,
    #[serde(rename = "useddatabyte")]
    pub used_bytes: Option<u64>,

    #[serde(
        rename = "subscriberOneTimeCost",
        default,
        with = "rust_decimal::serde::float_option"
    )]
    pub one_time_cost: Option<Decimal>,

    pub total_usage_bytes: Option<u64>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub total_reseller_cost: Option<Decimal>,
}

impl Row {
    /// Row carrying only the listing data; every enrichment field is absent.
    pub fn from_subscriber(subscriber: &Subscriber) -> Self {
        Self {
            subscriber_id: subscriber.subscriber_id.clone(),
            iccid: subscriber.iccid.clone(),
            imsi: subscriber.imsi.clone(),
            msisdn: subscriber.msisdn.clone(),
            status: subscriber.status.clone(),
            account_id: subscriber.account_id.clone(),
            reseller_id: subscriber.reseller_id.clone(),
            template_id: subscriber.template_id.clone(),
            template_name: subscriber.template_name.clone(),
            ..Default::default()
        }
    }

    pub fn apply_package(&mut self, package: &Package) {
        self.package_id = package.package_id.clone();
        if package.template_id.is_some() {
            self.template_id = package.template_id.clone();
        }
        if package.template_name.is_some() {
            self.template_name = package.template_name.clone();
        }
        self.activated_at = package.activated_at;
        self.expires_at = package.expires_at;
        self.provisioned_bytes = package.provisioned_bytes;
        self.used_bytes = package.used_bytes;
    }

    pub fn apply_usage(&mut self, usage: &UsageTotals) {
        self.total_usage_bytes = Some(usage.total_bytes);
        self.total_reseller_cost = Some(usage.total_cost);
    }

    /// True when every requested enrichment came back.
    pub fn is_complete(&self, usage_requested: bool) -> bool {
        self.template_id.is_some()
            && self.one_time_cost.is_some()
            && (!usage_requested || self.total_usage_bytes.is_some())
    }
}

/// One page of rows plus the offset of the next page, if any.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub rows: Vec<Row>,
    pub next_cursor: Option<usize>,
}

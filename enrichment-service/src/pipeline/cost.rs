//! Template cost resolution.
//!
//! Templates carry their price in whatever shape the catalog happened to use:
//! a flat field, a nested price object, or a list of typed charge entries. The
//! resolver scans for anything that looks like money, then picks the one-time
//! fee out of the candidates.

use super::shape::{coerce_decimal, extract, pick_id, pick_string};
use crate::client::BillingApi;
use crate::client::verbs::{self, verb_of};
use crate::models::EntityId;
use crate::services::metrics::record_template_cache;
use dashmap::DashMap;
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::sync::{Arc, LazyLock};
use tokio::sync::OnceCell;

const LIST_TEMPLATE_PATHS: &[&str] = &[
    "/listPrepaidPackageTemplate/template",
    "/listPrepaidPackageTemplate/templates",
    "/template",
];
const GET_TEMPLATE_PATHS: &[&str] = &[
    "/getPrepaidPackageTemplate/template",
    "/getPrepaidPackageTemplate",
    "/template",
];
const TEMPLATE_ID: &[&str] = &["/prepaidpackagetemplateid", "/templateId", "/id"];
const TEMPLATE_NAME: &[&str] = &["/prepaidpackagetemplatename", "/templateName", "/name"];

/// Nesting levels below the template root that are still scanned.
const MAX_SCAN_DEPTH: usize = 6;

const DISCRIMINATOR_KEYS: [&str; 4] = ["type", "kind", "chargeType", "category"];

static COST_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)cost|price|amount|fee|one[-_]?time|activation|setup|subscribercost|value")
        .expect("cost key pattern is valid")
});

static ONE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)one[-_]?time|activation|setup|fee").expect("one-time pattern is valid")
});

/// A monetary value found somewhere in a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostCandidate {
    pub value: Decimal,
    /// Found under a one-time/activation/setup/fee key or charge entry.
    pub one_time: bool,
}

/// Outcome of a template lookup. Both fields absent is a valid, cacheable result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedCost {
    pub cost: Option<Decimal>,
    pub name: Option<String>,
}

/// Keys that can match the cost pattern but never hold a price.
fn is_excluded_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    is_id_key(key)
        || lower.starts_with("ts")
        || ["date", "utc", "currency", "count", "byte"]
            .iter()
            .any(|word| lower.contains(word))
}

/// `id`, `price_id`, `fee-id`, `priceId` or `priceID`, but not `prepaid`.
fn is_id_key(key: &str) -> bool {
    if key.eq_ignore_ascii_case("id") {
        return true;
    }
    let lower = key.to_ascii_lowercase();
    if lower.ends_with("_id") || lower.ends_with("-id") {
        return true;
    }
    let Some(stem) = key.strip_suffix("Id").or_else(|| key.strip_suffix("ID")) else {
        return false;
    };
    stem.chars()
        .last()
        .is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

fn is_one_time_entry(entry: &Map<String, Value>) -> bool {
    DISCRIMINATOR_KEYS
        .iter()
        .filter_map(|k| entry.get(*k).and_then(Value::as_str))
        .any(|tag| ONE_TIME.is_match(tag))
}

/// Collect every cost-looking value in `template`, at most [`MAX_SCAN_DEPTH`]
/// levels deep.
pub fn scan_cost_candidates(template: &Value) -> Vec<CostCandidate> {
    let mut found = Vec::new();
    scan(template, 0, false, &mut found);
    found
}

fn scan(value: &Value, depth: usize, one_time: bool, found: &mut Vec<CostCandidate>) {
    if depth > MAX_SCAN_DEPTH {
        return;
    }
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if is_excluded_key(key) {
                    continue;
                }
                let tagged = one_time || ONE_TIME.is_match(key);
                if COST_KEY.is_match(key)
                    && let Some(amount) = coerce_decimal(child)
                {
                    found.push(CostCandidate {
                        value: amount,
                        one_time: tagged,
                    });
                }
                if child.is_object() || child.is_array() {
                    scan(child, depth + 1, tagged, found);
                }
            }
        }
        Value::Array(entries) => {
            for entry in entries {
                let tagged = one_time || entry.as_object().is_some_and(is_one_time_entry);
                scan(entry, depth + 1, tagged, found);
            }
        }
        _ => {}
    }
}

/// Pick the price: smallest positive one-time candidate, else smallest positive
/// candidate, else zero if a zero was seen, else nothing.
pub fn select_cost(candidates: &[CostCandidate]) -> Option<Decimal> {
    let smallest_positive = |one_time_only: bool| {
        candidates
            .iter()
            .filter(|c| c.value > Decimal::ZERO && (c.one_time || !one_time_only))
            .map(|c| c.value)
            .min()
    };

    smallest_positive(true)
        .or_else(|| smallest_positive(false))
        .or_else(|| {
            candidates
                .iter()
                .any(|c| c.value.is_zero())
                .then_some(Decimal::ZERO)
        })
}

/// Resolved template costs, keyed by template id. Concurrent lookups of the same
/// id wait on one shared upstream fetch.
#[derive(Clone, Default)]
pub struct TemplateCache {
    entries: Arc<DashMap<EntityId, Arc<OnceCell<ResolvedCost>>>>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached result for `id`, if a lookup has completed.
    pub fn get(&self, id: &EntityId) -> Option<ResolvedCost> {
        self.entries.get(id).and_then(|slot| slot.value().get().cloned())
    }

    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.value().initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, id: &EntityId) -> Arc<OnceCell<ResolvedCost>> {
        self.entries.entry(id.clone()).or_default().clone()
    }
}

pub struct CostResolver {
    api: Arc<dyn BillingApi>,
    cache: TemplateCache,
}

impl CostResolver {
    pub fn new(api: Arc<dyn BillingApi>, cache: TemplateCache) -> Self {
        Self { api, cache }
    }

    pub fn cache(&self) -> &TemplateCache {
        &self.cache
    }

    /// Resolve the one-time cost and name of a template. Never fails: lookup
    /// errors resolve to an empty result, which is cached like any other.
    pub async fn resolve_cost(&self, template_id: &EntityId) -> ResolvedCost {
        let slot = self.cache.slot(template_id);
        let mut fetched = false;
        let resolved = slot
            .get_or_init(|| {
                fetched = true;
                self.lookup(template_id)
            })
            .await
            .clone();

        record_template_cache(if fetched { "miss" } else { "hit" });
        resolved
    }

    async fn lookup(&self, template_id: &EntityId) -> ResolvedCost {
        let Some(template) = self.fetch_template(template_id).await else {
            tracing::warn!(template_id = %template_id, "Template not found by any lookup verb");
            return ResolvedCost::default();
        };

        let candidates = scan_cost_candidates(&template);
        let cost = select_cost(&candidates);
        tracing::debug!(
            template_id = %template_id,
            candidates = candidates.len(),
            cost = ?cost,
            "Template cost resolved"
        );

        ResolvedCost {
            cost,
            name: pick_string(&template, TEMPLATE_NAME),
        }
    }

    /// Try the list-style verb, then the get-style verb.
    async fn fetch_template(&self, template_id: &EntityId) -> Option<Value> {
        let attempts = [
            (verbs::list_template(template_id), LIST_TEMPLATE_PATHS),
            (verbs::get_template(template_id), GET_TEMPLATE_PATHS),
        ];

        for (payload, paths) in attempts {
            let verb = verb_of(&payload).to_string();
            match self.api.call(payload).await {
                Ok(response) => {
                    if let Some(template) = find_template(&response, paths, template_id) {
                        return Some(template.clone());
                    }
                    tracing::debug!(template_id = %template_id, verb = %verb, "Empty template response");
                }
                Err(e) => {
                    tracing::warn!(
                        template_id = %template_id,
                        verb = %verb,
                        error = %e,
                        "Template lookup failed"
                    );
                }
            }
        }
        None
    }
}

/// Locate the template in a lookup response. A list prefers the entry whose id
/// matches, falling back to its first non-empty entry that carries no id.
fn find_template<'a>(
    response: &'a Value,
    paths: &[&str],
    template_id: &EntityId,
) -> Option<&'a Value> {
    let non_empty = |v: &&Value| v.as_object().is_some_and(|m| !m.is_empty());
    match extract(response, paths)? {
        Value::Array(entries) => entries
            .iter()
            .filter(non_empty)
            .find(|e| pick_id(e, TEMPLATE_ID).is_some_and(|id| id.matches(template_id)))
            .or_else(|| {
                entries
                    .iter()
                    .filter(non_empty)
                    .find(|e| pick_id(e, TEMPLATE_ID).is_none())
            }),
        single => Some(single).filter(non_empty),
    }
}

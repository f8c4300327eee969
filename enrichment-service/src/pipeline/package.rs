//! Current-package lookup for a subscriber.

use super::shape::extract_list;
use crate::client::BillingApi;
use crate::client::verbs;
use crate::error::TransportError;
use crate::models::{EntityId, Package};
use std::sync::Arc;

const PACKAGE_LIST_PATHS: &[&str] = &[
    "/listSubscriberPrepaidPackages/packages",
    "/packages",
    "/listSubscriberPrepaidPackages/prepaidPackages",
];

pub struct PackageResolver {
    api: Arc<dyn BillingApi>,
}

impl PackageResolver {
    pub fn new(api: Arc<dyn BillingApi>) -> Self {
        Self { api }
    }

    /// Fetch the subscriber's packages and return the most recently activated
    /// one, or `None` if the subscriber has none.
    pub async fn resolve_latest_package(
        &self,
        subscriber_id: &EntityId,
    ) -> Result<Option<Package>, TransportError> {
        let response = self
            .api
            .call(verbs::list_subscriber_packages(subscriber_id))
            .await?;

        let packages: Vec<Package> = extract_list(&response, PACKAGE_LIST_PATHS)
            .iter()
            .filter(|v| v.is_object())
            .map(Package::from_value)
            .collect();

        tracing::debug!(
            subscriber_id = %subscriber_id,
            packages = packages.len(),
            "Subscriber packages fetched"
        );

        Ok(latest(packages))
    }
}

/// Latest by activation time. The sort is stable, so among equal activation
/// times the one listed last wins.
pub fn latest(mut packages: Vec<Package>) -> Option<Package> {
    packages.sort_by_key(Package::activation_sort_key);
    packages.pop()
}

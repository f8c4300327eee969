//! Test helper module for enrichment-service integration tests.
//!
//! Provides a scripted billing API for a small account and an in-process
//! server on a random port.

#![allow(dead_code)]

use enrichment_service::client::verbs::{self, args_of};
use enrichment_service::client::{BillingApi, MockBillingApi};
use enrichment_service::config::{BillingApiConfig, EnrichmentConfig, PipelineConfig};
use enrichment_service::error::TransportError;
use enrichment_service::startup::Application;
use serde_json::{Value, json};
use service_core::config::Config as CoreConfig;
use std::sync::Arc;
use std::time::Duration;

pub const ACCOUNT_ID: i64 = 7;
pub const TEST_TOKEN: &str = "test-token";

/// Billing API settings pointing at `base_url`, tuned for fast tests.
pub fn billing_api_config(base_url: &str) -> BillingApiConfig {
    BillingApiConfig {
        timeout: Duration::from_secs(2),
        initial_backoff: Duration::from_millis(5),
        requests_per_second: 1000,
        ..BillingApiConfig::new(base_url, TEST_TOKEN)
    }
}

pub fn test_config(base_url: &str) -> EnrichmentConfig {
    EnrichmentConfig {
        common: CoreConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        service_name: "enrichment-service-test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        billing_api: billing_api_config(base_url),
        pipeline: PipelineConfig::default(),
    }
}

pub fn subscriber(id: i64, iccid: &str) -> Value {
    json!({
        "subscriberId": id,
        "iccid": iccid,
        "imsi": format!("2040{id}"),
        "msisdn": format!("3161{id}"),
        "status": "ACTIVE",
        "accountId": ACCOUNT_ID,
        "resellerId": 3
    })
}

/// Account with two subscribers. Subscriber 1001 has a package on template 77
/// (one-time fee 3, bundle 50); the package lookup of 1002 fails.
pub fn two_subscriber_account() -> MockBillingApi {
    MockBillingApi::new()
        .on(verbs::LIST_SUBSCRIBER, |_| {
            Ok(json!({"listSubscriber": {"subscriberList": [
                subscriber(1001, "89880001"),
                subscriber(1002, "89880002"),
            ]}}))
        })
        .on(verbs::LIST_SUBSCRIBER_PACKAGES, |payload| {
            match args_of(payload)["subscriber"]["subscriberId"].as_i64() {
                Some(1001) => Ok(json!({"listSubscriberPrepaidPackages": {"packages": [
                    {
                        "subscriberprepaidpackageid": 1,
                        "prepaidpackagetemplate": {"prepaidpackagetemplateid": 70},
                        "tsactivationutc": "2024-01-01 00:00:00",
                        "pckdatabyte": 100
                    },
                    {
                        "subscriberprepaidpackageid": 2,
                        "prepaidpackagetemplate": {
                            "prepaidpackagetemplateid": 77,
                            "prepaidpackagetemplatename": "EU 1GB"
                        },
                        "tsactivationutc": "2024-05-01 08:00:00",
                        "tsexpirationutc": "2024-06-01 08:00:00",
                        "pckdatabyte": 1073741824,
                        "useddatabyte": 1024
                    }
                ]}})),
                _ => Err(TransportError::from_status(500, "package service down".into())),
            }
        })
        .on(verbs::LIST_TEMPLATE, |_| {
            Ok(json!({"listPrepaidPackageTemplate": {"template": {
                "prepaidpackagetemplateid": 77,
                "prepaidpackagetemplatename": "EU 1GB",
                "charges": [
                    {"type": "ONE_TIME", "price": {"value": 3}},
                    {"type": "BUNDLE", "price": {"value": 50}}
                ]
            }}}))
        })
        .on(verbs::SUBSCRIBER_USAGE, |_| {
            Ok(json!({"subscriberUsageOverPeriod": {"total": {
                "quantityPerType": {"33": 500},
                "resellerCost": "0.10"
            }}}))
        })
}

/// Test application wrapper for HTTP-level tests.
pub struct TestApp {
    pub address: String,
    pub port: u16,
}

impl TestApp {
    /// Spawn the service on a random port, backed by `api`.
    pub async fn spawn_with_api(api: Arc<dyn BillingApi>) -> Self {
        let config = test_config("http://127.0.0.1:1/unused");
        let app = Application::build_with_api(config, api)
            .await
            .expect("Failed to build application");

        let port = app.port();
        tokio::spawn(app.run_until_stopped());

        Self {
            address: format!("http://127.0.0.1:{}", port),
            port,
        }
    }

    /// Spawn the service against a real HTTP billing API at `base_url`.
    pub async fn spawn_with_upstream(base_url: &str) -> Self {
        let app = Application::build(test_config(base_url))
            .await
            .expect("Failed to build application");

        let port = app.port();
        tokio::spawn(app.run_until_stopped());

        Self {
            address: format!("http://127.0.0.1:{}", port),
            port,
        }
    }
}

//! End-to-end pipeline tests over a scripted billing API.

mod common;

use common::{ACCOUNT_ID, subscriber, two_subscriber_account};
use enrichment_service::client::{MockBillingApi, verbs};
use enrichment_service::config::PipelineConfig;
use enrichment_service::error::{PipelineError, TransportError};
use enrichment_service::models::EntityId;
use enrichment_service::pipeline::{EnrichmentPipeline, FetchOptions};
use rust_decimal_macros::dec;
use serde_json::json;
use std::sync::Arc;

fn usage_options() -> FetchOptions {
    FetchOptions {
        include_usage: true,
        usage_from: Some("2024-01-01".into()),
        usage_to: Some("2024-01-20".into()),
        ..Default::default()
    }
}

#[tokio::test]
async fn failed_package_lookup_degrades_only_that_row() {
    let api = Arc::new(two_subscriber_account());
    let pipeline = EnrichmentPipeline::new(api.clone(), PipelineConfig::default());

    let page = pipeline
        .fetch_all_data(ACCOUNT_ID, usage_options())
        .await
        .unwrap();

    assert_eq!(page.rows.len(), 2);
    assert_eq!(page.next_cursor, None);

    let ok = &page.rows[0];
    assert_eq!(ok.subscriber_id, Some(EntityId::Number(1001)));
    assert_eq!(ok.iccid.as_deref(), Some("89880001"));
    assert_eq!(ok.package_id, Some(EntityId::Number(2)));
    assert_eq!(ok.template_id, Some(EntityId::Number(77)));
    assert_eq!(ok.template_name.as_deref(), Some("EU 1GB"));
    assert!(ok.activated_at.is_some());
    assert!(ok.expires_at.is_some());
    assert_eq!(ok.provisioned_bytes, Some(1_073_741_824));
    assert_eq!(ok.used_bytes, Some(1024));
    assert_eq!(ok.one_time_cost, Some(dec!(3)));
    // 2024-01-01 through 2024-01-20 inclusive: 20 days, three windows
    assert_eq!(ok.total_usage_bytes, Some(1500));
    assert_eq!(ok.total_reseller_cost, Some(dec!(0.30)));
    assert!(ok.is_complete(true));

    let degraded = &page.rows[1];
    assert_eq!(degraded.subscriber_id, Some(EntityId::Number(1002)));
    assert_eq!(degraded.iccid.as_deref(), Some("89880002"));
    assert_eq!(degraded.template_id, None);
    assert_eq!(degraded.one_time_cost, None);
    assert_eq!(degraded.total_usage_bytes, Some(1500));

    let json = serde_json::to_value(degraded).unwrap();
    assert!(json["prepaidpackagetemplateid"].is_null());
    assert!(json["subscriberOneTimeCost"].is_null());

    assert_eq!(api.calls_for(verbs::SUBSCRIBER_USAGE), 6);
}

#[tokio::test]
async fn usage_is_skipped_unless_requested() {
    let api = Arc::new(two_subscriber_account());
    let pipeline = EnrichmentPipeline::new(api.clone(), PipelineConfig::default());

    let page = pipeline
        .fetch_all_data(ACCOUNT_ID, FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(page.rows.len(), 2);
    assert!(page.rows.iter().all(|r| r.total_usage_bytes.is_none()));
    assert!(page.rows.iter().all(|r| r.total_reseller_cost.is_none()));
    assert_eq!(api.calls_for(verbs::SUBSCRIBER_USAGE), 0);
}

#[tokio::test]
async fn repeated_runs_are_identical_and_served_from_cache() {
    let api = Arc::new(two_subscriber_account());
    let pipeline = EnrichmentPipeline::new(api.clone(), PipelineConfig::default());

    let first = pipeline
        .fetch_all_data(ACCOUNT_ID, usage_options())
        .await
        .unwrap();
    let template_calls = api.calls_for(verbs::LIST_TEMPLATE);
    assert_eq!(template_calls, 1);

    let second = pipeline
        .fetch_all_data(ACCOUNT_ID, usage_options())
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(api.calls_for(verbs::LIST_TEMPLATE), template_calls);
    assert_eq!(
        pipeline.template_cache().get(&EntityId::Number(77)).unwrap().cost,
        Some(dec!(3))
    );
}

#[tokio::test]
async fn zero_template_cost_is_kept_distinct_from_unknown() {
    let api = Arc::new(
        MockBillingApi::new()
            .on(verbs::LIST_SUBSCRIBER, |_| {
                Ok(json!({"subscriberList": [{
                    "subscriberId": 1,
                    "prepaidpackagetemplateid": 5
                }]}))
            })
            .on(verbs::LIST_SUBSCRIBER_PACKAGES, |_| Ok(json!({"packages": []})))
            .on(verbs::LIST_TEMPLATE, |_| Ok(json!({"template": {"cost": 0}}))),
    );
    let pipeline = EnrichmentPipeline::new(api, PipelineConfig::default());

    let page = pipeline
        .fetch_all_data(ACCOUNT_ID, FetchOptions::default())
        .await
        .unwrap();

    let row = &page.rows[0];
    assert_eq!(row.template_id, Some(EntityId::Number(5)));
    assert_eq!(row.package_id, None);
    assert_eq!(row.one_time_cost, Some(dec!(0)));
    assert_eq!(
        serde_json::to_value(row).unwrap()["subscriberOneTimeCost"],
        json!(0.0)
    );
}

#[tokio::test]
async fn package_fee_fills_in_when_template_has_no_price() {
    let api = Arc::new(
        MockBillingApi::new()
            .on(verbs::LIST_SUBSCRIBER, |_| {
                Ok(json!({"subscriberList": [subscriber(1, "8988")]}))
            })
            .on(verbs::LIST_SUBSCRIBER_PACKAGES, |_| {
                Ok(json!({"packages": [{
                    "packageId": 10,
                    "templateId": 9,
                    "oneTimeFee": "4.50"
                }]}))
            })
            .on(verbs::LIST_TEMPLATE, |_| {
                Err(TransportError::from_status(500, "catalog down".into()))
            })
            .on(verbs::GET_TEMPLATE, |_| {
                Err(TransportError::Network("connection reset".into()))
            }),
    );
    let pipeline = EnrichmentPipeline::new(api, PipelineConfig::default());

    let page = pipeline
        .fetch_all_data(ACCOUNT_ID, FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(page.rows[0].template_id, Some(EntityId::Number(9)));
    assert_eq!(page.rows[0].one_time_cost, Some(dec!(4.50)));
}

#[tokio::test]
async fn template_price_wins_over_package_fee() {
    let api = Arc::new(
        MockBillingApi::new()
            .on(verbs::LIST_SUBSCRIBER, |_| {
                Ok(json!({"subscriberList": [subscriber(1, "8988")]}))
            })
            .on(verbs::LIST_SUBSCRIBER_PACKAGES, |_| {
                Ok(json!({"packages": [{"templateId": 9, "oneTimeFee": 4.5}]}))
            })
            .on(verbs::LIST_TEMPLATE, |_| {
                Ok(json!({"template": {"activationFee": 2, "monthlyPrice": 20}}))
            }),
    );
    let pipeline = EnrichmentPipeline::new(api, PipelineConfig::default());

    let page = pipeline
        .fetch_all_data(ACCOUNT_ID, FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(page.rows[0].one_time_cost, Some(dec!(2)));
}

#[tokio::test]
async fn pages_through_the_listing() {
    let api = Arc::new(
        MockBillingApi::new()
            .on(verbs::LIST_SUBSCRIBER, |_| {
                let subscribers: Vec<_> = (1..=5).map(|id| subscriber(id, "8988")).collect();
                Ok(json!({"listSubscriber": {"subscribers": subscribers}}))
            })
            .on(verbs::LIST_SUBSCRIBER_PACKAGES, |_| Ok(json!({}))),
    );
    let pipeline = EnrichmentPipeline::new(api, PipelineConfig::default());
    let page_of = |cursor| FetchOptions {
        limit: Some(2),
        cursor: Some(cursor),
        ..Default::default()
    };

    let first = pipeline.fetch_all_data(ACCOUNT_ID, page_of(0)).await.unwrap();
    assert_eq!(first.rows.len(), 2);
    assert_eq!(first.next_cursor, Some(2));
    assert_eq!(first.rows[0].subscriber_id, Some(EntityId::Number(1)));

    let last = pipeline.fetch_all_data(ACCOUNT_ID, page_of(4)).await.unwrap();
    assert_eq!(last.rows.len(), 1);
    assert_eq!(last.rows[0].subscriber_id, Some(EntityId::Number(5)));
    assert_eq!(last.next_cursor, None);

    let beyond = pipeline.fetch_all_data(ACCOUNT_ID, page_of(50)).await.unwrap();
    assert!(beyond.rows.is_empty());
    assert_eq!(beyond.next_cursor, None);
}

#[tokio::test]
async fn listing_failure_fails_the_whole_call() {
    let api = Arc::new(MockBillingApi::new().on(verbs::LIST_SUBSCRIBER, |_| {
        Err(TransportError::from_status(503, "maintenance".into()))
    }));
    let pipeline = EnrichmentPipeline::new(api.clone(), PipelineConfig::default());

    let err = pipeline
        .fetch_all_data(ACCOUNT_ID, FetchOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Listing { account_id: ACCOUNT_ID, .. }));
    assert_eq!(api.calls().len(), 1);
}

#[tokio::test]
async fn empty_listing_is_an_empty_page() {
    let api = Arc::new(
        MockBillingApi::new().on(verbs::LIST_SUBSCRIBER, |_| Ok(json!({"unexpected": true}))),
    );
    let pipeline = EnrichmentPipeline::new(api, PipelineConfig::default());

    let page = pipeline
        .fetch_all_data(ACCOUNT_ID, FetchOptions::default())
        .await
        .unwrap();

    assert!(page.rows.is_empty());
    assert_eq!(page.next_cursor, None);
}

#[tokio::test]
async fn failed_usage_window_leaves_totals_empty() {
    let api = Arc::new(
        MockBillingApi::new()
            .on(verbs::LIST_SUBSCRIBER, |_| {
                Ok(json!({"subscriberList": [subscriber(1, "8988")]}))
            })
            .on(verbs::LIST_SUBSCRIBER_PACKAGES, |_| Ok(json!({"packages": []})))
            .on(verbs::SUBSCRIBER_USAGE, |_| {
                Err(TransportError::from_status(400, "period too long".into()))
            }),
    );
    let pipeline = EnrichmentPipeline::new(api, PipelineConfig::default());

    let page = pipeline
        .fetch_all_data(ACCOUNT_ID, usage_options())
        .await
        .unwrap();

    assert_eq!(page.rows.len(), 1);
    assert_eq!(page.rows[0].total_usage_bytes, None);
    assert_eq!(page.rows[0].total_reseller_cost, None);
}

#[tokio::test]
async fn overflowing_usage_cost_degrades_only_that_row() {
    let api = Arc::new(
        MockBillingApi::new()
            .on(verbs::LIST_SUBSCRIBER, |_| {
                Ok(json!({"subscriberList": [subscriber(1, "8988"), subscriber(2, "8989")]}))
            })
            .on(verbs::LIST_SUBSCRIBER_PACKAGES, |_| Ok(json!({"packages": []})))
            .on(verbs::SUBSCRIBER_USAGE, |payload| {
                let cost = if verbs::args_of(payload)["subscriber"]["subscriberId"] == 1 {
                    json!("79228162514264337593543950335")
                } else {
                    json!("0.10")
                };
                Ok(json!({"total": {"quantityPerType": {"33": 100}, "resellerCost": cost}}))
            }),
    );
    let pipeline = EnrichmentPipeline::new(api, PipelineConfig::default());

    let page = pipeline
        .fetch_all_data(ACCOUNT_ID, usage_options())
        .await
        .unwrap();

    assert_eq!(page.rows.len(), 2);
    assert_eq!(page.rows[0].total_usage_bytes, None);
    assert_eq!(page.rows[0].total_reseller_cost, None);
    assert_eq!(page.rows[1].total_usage_bytes, Some(300));
    assert_eq!(page.rows[1].total_reseller_cost, Some(dec!(0.30)));
}

//! End-to-end tests for the lookup pipeline against an in-memory database,
//! a scripted provider, and a recording sheet transport.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::SqlitePool;

use imet_intake::config::IntakeConfig;
use imet_intake::db::init_tables;
use imet_intake::error::{LookupError, LookupErrorCode, LookupResult};
use imet_intake::models::{
    BatchLookupRequest, LookupContext, LookupRequest, LookupSource, RawProviderResponse,
};
use imet_intake::services::provider::DeviceProvider;
use imet_intake::services::sheet_mirror::SheetTransport;
use imet_intake::services::{run_batch, LookupOrchestrator, SheetMirror};

// Both pass the Luhn check.
const IMEI_A: &str = "490154203237518";
const IMEI_B: &str = "352099001761481";

struct ScriptedProvider {
    responses: Mutex<VecDeque<LookupResult<RawProviderResponse>>>,
    services: Value,
    lookup_calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(responses: Vec<LookupResult<RawProviderResponse>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            services: json!({}),
            lookup_calls: AtomicUsize::new(0),
        })
    }

    fn with_services(
        responses: Vec<LookupResult<RawProviderResponse>>,
        services: Value,
    ) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            services,
            lookup_calls: AtomicUsize::new(0),
        })
    }

    fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceProvider for ScriptedProvider {
    async fn lookup(
        &self,
        _identifier: &str,
        _service_id: &str,
        _api_key: &str,
    ) -> LookupResult<RawProviderResponse> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LookupError::internal("no scripted response left")))
    }

    async fn fetch_balance(&self, _api_key: &str) -> LookupResult<Option<f64>> {
        Ok(None)
    }

    async fn fetch_services(&self, _api_key: &str) -> LookupResult<Value> {
        Ok(self.services.clone())
    }
}

#[derive(Default)]
struct RecordingTransport {
    rows: Mutex<Vec<(String, String, Vec<String>)>>,
}

impl RecordingTransport {
    fn rows(&self) -> Vec<(String, String, Vec<String>)> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl SheetTransport for RecordingTransport {
    async fn ensure_tab(
        &self,
        _sheet_id: &str,
        _title: &str,
        _headers: &[&str],
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn append_row(&self, sheet_id: &str, tab: &str, row: &[String]) -> anyhow::Result<()> {
        self.rows
            .lock()
            .unwrap()
            .push((sheet_id.to_string(), tab.to_string(), row.to_vec()));
        Ok(())
    }
}

fn test_config() -> IntakeConfig {
    IntakeConfig {
        provider_api_key: Some("test-key".to_string()),
        provider_base_url: "http://localhost/unused".to_string(),
        default_service_id: Some("30".to_string()),
        database_path: PathBuf::from(":memory:"),
        port: 0,
        sheet_id: Some("sheet-1".to_string()),
        sheet_tab: Some("INTAKE".to_string()),
        sheet_utc_offset_minutes: -360,
        sheet_sync_enabled: true,
    }
}

async fn setup(
    provider: Arc<ScriptedProvider>,
    config: IntakeConfig,
) -> (SqlitePool, Arc<RecordingTransport>, LookupOrchestrator) {
    let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
    init_tables(&pool).await.unwrap();

    let transport = Arc::new(RecordingTransport::default());
    let mirror = SheetMirror::new(transport.clone());
    let orchestrator = LookupOrchestrator::new(pool.clone(), provider, mirror, config);

    (pool, transport, orchestrator)
}

fn success_response(imei: &str) -> RawProviderResponse {
    RawProviderResponse {
        result: Some(json!({
            "Manufacturer": "Apple",
            "Model Name": "iPhone 14 Pro",
            "Storage": "256GB",
            "Carrier": "T-Mobile",
            "SIM-Lock": "Unlocked",
        })),
        imei: imei.to_string(),
        balance: Some(json!("42.50")),
        price: Some(json!(0.09)),
        service: Some("30".to_string()),
        id: None,
        status: "success".to_string(),
        message: None,
        error: None,
    }
}

fn error_response(imei: &str, message: &str) -> RawProviderResponse {
    RawProviderResponse {
        result: None,
        imei: imei.to_string(),
        balance: None,
        price: None,
        service: Some("30".to_string()),
        id: None,
        status: "error".to_string(),
        message: Some(message.to_string()),
        error: None,
    }
}

fn context(tenant: &str) -> LookupContext {
    LookupContext {
        tenant_id: tenant.to_string(),
        actor_id: "tester".to_string(),
    }
}

fn request(imei: &str) -> LookupRequest {
    LookupRequest {
        imei: Some(imei.to_string()),
        ..Default::default()
    }
}

async fn count_lookups(pool: &SqlitePool, status: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM lookups WHERE status = ?")
        .bind(status)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn live_success_persists_and_mirrors() {
    let provider = ScriptedProvider::new(vec![Ok(success_response(IMEI_A))]);
    let (pool, transport, orchestrator) = setup(provider.clone(), test_config()).await;

    let mut req = request(IMEI_A);
    req.grade = Some("A".to_string());
    req.cost = Some(250.0);

    let outcome = orchestrator.process(&req, &context("acme")).await.unwrap();

    assert_eq!(outcome.source, LookupSource::Live);
    assert_eq!(outcome.data.manufacturer.as_deref(), Some("Apple"));
    assert_eq!(outcome.data.model_name.as_deref(), Some("iPhone 14 Pro"));
    assert_eq!(outcome.data.user_grade.as_deref(), Some("A"));
    assert_eq!(outcome.data.provider_balance_after, Some(42.5));
    assert_eq!(outcome.data.service_name.as_deref(), Some("Apple Basic Info"));

    assert_eq!(provider.lookup_calls(), 1);
    assert_eq!(count_lookups(&pool, "success").await, 1);

    let rows = transport.rows();
    assert_eq!(rows.len(), 1);
    let (sheet_id, tab, row) = &rows[0];
    assert_eq!(sheet_id, "sheet-1");
    assert_eq!(tab, "INTAKE");
    assert_eq!(row[0], "iPhone 14 Pro");
    assert_eq!(row[3], IMEI_A);
    assert_eq!(row[4], "$250");
    assert_eq!(row[6], "Unlocked");
}

#[tokio::test]
async fn cache_hit_skips_provider_but_still_mirrors() {
    let provider = ScriptedProvider::new(vec![Ok(success_response(IMEI_A))]);
    let (pool, transport, orchestrator) = setup(provider.clone(), test_config()).await;

    let first = orchestrator
        .process(&request(IMEI_A), &context("acme"))
        .await
        .unwrap();
    assert_eq!(first.source, LookupSource::Live);

    let second = orchestrator
        .process(&request(IMEI_A), &context("acme"))
        .await
        .unwrap();
    assert_eq!(second.source, LookupSource::Cache);
    assert_eq!(second.data.model_name.as_deref(), Some("iPhone 14 Pro"));

    // One paid call, one stored row, but two sheet rows: the sheet logs
    // every checked unit.
    assert_eq!(provider.lookup_calls(), 1);
    assert_eq!(count_lookups(&pool, "success").await, 1);
    assert_eq!(transport.rows().len(), 2);
}

#[tokio::test]
async fn provider_error_is_classified_and_recorded() {
    let provider = ScriptedProvider::new(vec![Ok(error_response(
        IMEI_A,
        "Sorry, this IMEI was not found (R01)",
    ))]);
    let (pool, transport, orchestrator) = setup(provider.clone(), test_config()).await;

    let err = orchestrator
        .process(&request(IMEI_A), &context("acme"))
        .await
        .unwrap_err();

    assert_eq!(err.code, LookupErrorCode::R01NotFound);
    assert_eq!(
        err.raw_message.as_deref(),
        Some("Sorry, this IMEI was not found (R01)")
    );

    // The failure is logged for telemetry but never mirrored
    assert_eq!(count_lookups(&pool, "error").await, 1);
    assert!(transport.rows().is_empty());

    // A failed lookup is not cached; the next attempt pays again
    let _ = orchestrator.process(&request(IMEI_A), &context("acme")).await;
    assert_eq!(provider.lookup_calls(), 2);
}

#[tokio::test]
async fn blank_grade_does_not_clobber_cached_overlay() {
    let provider = ScriptedProvider::new(vec![Ok(success_response(IMEI_A))]);
    let (_pool, _transport, orchestrator) = setup(provider, test_config()).await;

    let mut first = request(IMEI_A);
    first.grade = Some("B+".to_string());
    first.cost = Some(180.0);
    orchestrator.process(&first, &context("acme")).await.unwrap();

    let mut second = request(IMEI_A);
    second.grade = Some("   ".to_string());
    let outcome = orchestrator.process(&second, &context("acme")).await.unwrap();

    assert_eq!(outcome.source, LookupSource::Cache);
    assert_eq!(outcome.data.user_grade.as_deref(), Some("B+"));
    assert_eq!(outcome.data.user_cost, Some(180.0));
}

#[tokio::test]
async fn cache_is_tenant_scoped() {
    let provider = ScriptedProvider::new(vec![
        Ok(success_response(IMEI_A)),
        Ok(success_response(IMEI_A)),
    ]);
    let (_pool, _transport, orchestrator) = setup(provider.clone(), test_config()).await;

    let first = orchestrator
        .process(&request(IMEI_A), &context("tenant-a"))
        .await
        .unwrap();
    assert_eq!(first.source, LookupSource::Live);

    // Same identifier, different tenant: never served from tenant-a's cache
    let second = orchestrator
        .process(&request(IMEI_A), &context("tenant-b"))
        .await
        .unwrap();
    assert_eq!(second.source, LookupSource::Live);
    assert_eq!(provider.lookup_calls(), 2);
}

#[tokio::test]
async fn oversized_batch_is_rejected_before_any_call() {
    let provider = ScriptedProvider::new(vec![]);
    let (_pool, _transport, orchestrator) = setup(provider.clone(), test_config()).await;

    let batch = BatchLookupRequest {
        imeis: (0..51).map(|i| format!("{:015}", i)).collect(),
        delay_ms: Some(0),
        ..Default::default()
    };

    let err = run_batch(&orchestrator, &batch, &context("acme"))
        .await
        .unwrap_err();
    assert!(err.message.contains("maximum of 50"));
    assert_eq!(provider.lookup_calls(), 0);

    let empty = BatchLookupRequest {
        delay_ms: Some(0),
        ..Default::default()
    };
    assert!(run_batch(&orchestrator, &empty, &context("acme")).await.is_err());
}

#[tokio::test]
async fn batch_that_sanitizes_to_nothing_is_rejected() {
    let provider = ScriptedProvider::new(vec![]);
    let (_pool, _transport, orchestrator) = setup(provider.clone(), test_config()).await;

    // IMEI mode strips letters entirely, so nothing survives cleaning
    let batch = BatchLookupRequest {
        imeis: vec!["abc".to_string(), "xyz".to_string()],
        delay_ms: Some(0),
        ..Default::default()
    };

    let err = run_batch(&orchestrator, &batch, &context("acme"))
        .await
        .unwrap_err();
    assert!(err.message.contains("No identifiers"));
    assert_eq!(provider.lookup_calls(), 0);
}

#[tokio::test]
async fn cap_applies_after_dedup_and_fifty_yield_fifty_ordered_results() {
    let responses = (0..50)
        .map(|i| Ok(success_response(&format!("SERIAL{:02}", i))))
        .collect();
    let provider = ScriptedProvider::new(responses);
    let (_pool, _transport, orchestrator) = setup(provider.clone(), test_config()).await;

    // 51 raw entries, but the first one reappears in different casing and
    // collapses during cleaning: exactly 50 unique identifiers remain
    let mut imeis: Vec<String> = (0..50).map(|i| format!("serial{:02}", i)).collect();
    imeis.push("SERIAL00".to_string());
    assert_eq!(imeis.len(), 51);

    let batch = BatchLookupRequest {
        imeis,
        delay_ms: Some(0),
        serial_mode: true,
        ..Default::default()
    };

    let results = run_batch(&orchestrator, &batch, &context("acme"))
        .await
        .unwrap();

    assert_eq!(results.len(), 50);
    for (i, result) in results.iter().enumerate() {
        assert!(result.is_ok());
        assert_eq!(result.identifier(), format!("SERIAL{:02}", i));
    }
    assert_eq!(provider.lookup_calls(), 50);
}

#[tokio::test]
async fn batch_reports_per_item_failures_in_order() {
    let provider = ScriptedProvider::new(vec![
        Ok(success_response(IMEI_A)),
        Ok(success_response(IMEI_B)),
    ]);
    let (_pool, _transport, orchestrator) = setup(provider.clone(), test_config()).await;

    let batch = BatchLookupRequest {
        imeis: vec![
            IMEI_A.to_string(),
            "12345".to_string(),
            IMEI_B.to_string(),
            IMEI_A.to_string(), // duplicate, dropped
        ],
        delay_ms: Some(0),
        ..Default::default()
    };

    let results = run_batch(&orchestrator, &batch, &context("acme"))
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert_eq!(results[0].identifier(), IMEI_A);
    assert!(!results[1].is_ok());
    assert_eq!(results[1].identifier(), "12345");
    assert!(results[2].is_ok());
    assert_eq!(results[2].identifier(), IMEI_B);

    // The malformed entry never reached the provider
    assert_eq!(provider.lookup_calls(), 2);
}

#[tokio::test]
async fn incompatible_service_error_is_enriched_with_service_name() {
    let provider = ScriptedProvider::with_services(
        vec![Ok(error_response(IMEI_A, "S02: not supported"))],
        json!({
            "Service List": [
                {"service": "30", "name": "Apple Basic Info", "price": "0.05"}
            ]
        }),
    );
    let (_pool, _transport, orchestrator) = setup(provider, test_config()).await;

    let err = orchestrator
        .process(&request(IMEI_A), &context("acme"))
        .await
        .unwrap_err();

    assert_eq!(err.code, LookupErrorCode::S02ServiceIncompatible);
    assert!(err.message.contains("Service #30"));
    assert!(err.message.contains("Apple Basic Info"));
    assert_eq!(err.raw_message.as_deref(), Some("S02: not supported"));
}

#[tokio::test]
async fn missing_api_key_fails_before_provider_call() {
    let provider = ScriptedProvider::new(vec![Ok(success_response(IMEI_A))]);
    let mut config = test_config();
    config.provider_api_key = None;
    let (pool, _transport, orchestrator) = setup(provider.clone(), config).await;

    let err = orchestrator
        .process(&request(IMEI_A), &context("acme"))
        .await
        .unwrap_err();

    assert_eq!(err.code, LookupErrorCode::A01ApiKeyInvalid);
    assert_eq!(err.status, 401);
    assert_eq!(provider.lookup_calls(), 0);
    // Configuration gaps are not logged as lookup attempts
    assert_eq!(count_lookups(&pool, "error").await, 0);
}

#[tokio::test]
async fn credential_row_overrides_key_and_mirroring() {
    let provider = ScriptedProvider::new(vec![Ok(success_response(IMEI_A))]);
    let mut config = test_config();
    config.provider_api_key = None;
    let (pool, transport, orchestrator) = setup(provider, config).await;

    // Tenant brings its own key but has mirroring switched off
    sqlx::query(
        "INSERT INTO credentials (tenant_id, provider_api_key, sync_to_sheets) VALUES (?, ?, 0)",
    )
    .bind("quiet-tenant")
    .bind("tenant-key")
    .execute(&pool)
    .await
    .unwrap();

    let outcome = orchestrator
        .process(&request(IMEI_A), &context("quiet-tenant"))
        .await
        .unwrap();

    assert_eq!(outcome.source, LookupSource::Live);
    assert_eq!(count_lookups(&pool, "success").await, 1);
    assert!(transport.rows().is_empty());
}

#[tokio::test]
async fn serial_mode_validates_and_uppercases() {
    let provider = ScriptedProvider::new(vec![Ok(success_response("F2LW48XHHG04"))]);
    let (_pool, _transport, orchestrator) = setup(provider, test_config()).await;

    let req = LookupRequest {
        imei: Some("  f2lw48xhhg04 ".to_string()),
        serial_mode: true,
        ..Default::default()
    };
    let outcome = orchestrator.process(&req, &context("acme")).await.unwrap();
    assert_eq!(outcome.data.imei, "F2LW48XHHG04");

    let bad = LookupRequest {
        imei: Some("ab".to_string()),
        serial_mode: true,
        ..Default::default()
    };
    let err = orchestrator.process(&bad, &context("acme")).await.unwrap_err();
    assert_eq!(err.code, LookupErrorCode::E02InvalidSn);
}

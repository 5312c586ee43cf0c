//! End-to-end flows against a scripted HTTP backend.

use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use payguard::config::{BackendSettings, EngineConfig};
use payguard::orchestrator::{FlowOutcome, ProgressEvent};
use payguard::store::{InMemoryStore, IntentStore};
use payguard::types::{
    CustodyType, GuardKind, GuardPolicy, IntentStatus, PaymentRequest, WalletBinding, WalletRole,
};
use payguard::Engine;

fn engine_config(server: &MockServer, policies: Vec<GuardPolicy>) -> EngineConfig {
    EngineConfig {
        backend: BackendSettings {
            endpoint: server.uri(),
            bearer_token: "test-token".to_string(),
            timeout_ms: 5_000,
            max_retries: 3,
        },
        policies,
        ..Default::default()
    }
}

fn single_tx_limit(limit: i64) -> GuardPolicy {
    GuardPolicy::new(
        "g-tx",
        "Single transaction limit",
        GuardKind::SingleTransactionLimit,
        Decimal::new(limit, 0),
    )
}

fn auto_approve(limit: i64) -> GuardPolicy {
    GuardPolicy::new(
        "g-auto",
        "Auto-approve threshold",
        GuardKind::AutoApproveThreshold,
        Decimal::new(limit, 0),
    )
}

fn agent_request(amount: i64) -> PaymentRequest {
    PaymentRequest {
        amount: Decimal::new(amount, 0),
        currency: "USD".to_string(),
        recipient_label: "Acme API".to_string(),
        recipient_address: "0xrecipient".to_string(),
        chain: "BASE".to_string(),
        destination_chain: None,
        from_wallet: WalletBinding::new(WalletRole::Agent, CustodyType::PlatformManaged, "w-1"),
        metadata: Default::default(),
    }
}

async fn mount_backend(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .and(body_partial_json(json!({"method": "wallet.balance"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {"wallet_reference": "w-1", "available": "1000", "currency": "USD"}
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rpc"))
        .and(body_partial_json(json!({"method": "payment.simulate"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {"would_succeed": true, "route": "base-native", "estimated_fee": "0.01"}
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rpc"))
        .and(body_partial_json(json!({"method": "payment.transfer"})))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {"transfer_id": "tr-900", "tx_hash": null, "explorer_url": null}
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rpc"))
        .and(body_partial_json(json!({"method": "transaction.status"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "state": "confirmed",
                "tx_hash": "0xfinal",
                "explorer_url": "https://scan.example/tx/0xfinal"
            }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn full_flow_executes_and_confirms_a_guarded_payment() {
    let server = MockServer::start().await;
    mount_backend(&server).await;

    let store = Arc::new(InMemoryStore::new());
    let mut config = engine_config(&server, vec![single_tx_limit(100), auto_approve(75)]);
    config.approval.fast_path = false;
    let engine = Engine::from_config(&config, store.clone()).unwrap();

    let events: Arc<Mutex<Vec<ProgressEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let events = events.clone();
        move |event: ProgressEvent| events.lock().unwrap().push(event)
    };

    let outcome = engine.flow.run(agent_request(50), &sink).await;
    let FlowOutcome::Completed {
        intent,
        transfer_id,
        tx_hash,
    } = outcome
    else {
        panic!("expected completion, got {outcome:?}");
    };
    assert_eq!(transfer_id, "tr-900");
    assert_eq!(tx_hash.as_deref(), Some("0xfinal"));

    let intent = intent.unwrap();
    assert_eq!(intent.status, IntentStatus::Succeeded);
    let artifacts = intent.artifacts.as_ref().unwrap();
    assert!(artifacts.confirmed);

    // The durable record matches what the flow returned
    let stored = store.get(&intent.id).await.unwrap().unwrap();
    assert_eq!(stored, intent);

    // Settlement record carries the final amount and hash
    let settlement = store
        .settlement_for_intent(&intent.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(settlement.amount, Decimal::new(50, 0));
    assert_eq!(settlement.tx_hash.as_deref(), Some("0xfinal"));

    let events = events.lock().unwrap();
    assert_eq!(events[0], ProgressEvent::CreatingIntent);
    assert!(matches!(events.last(), Some(ProgressEvent::Completed { .. })));
}

#[tokio::test]
async fn blocked_payment_never_reaches_the_transfer_endpoint() {
    let server = MockServer::start().await;
    mount_backend(&server).await;

    let store = Arc::new(InMemoryStore::new());
    let mut config = engine_config(&server, vec![single_tx_limit(100)]);
    config.approval.fast_path = false;
    let engine = Engine::from_config(&config, store.clone()).unwrap();

    let outcome = engine
        .flow
        .run(agent_request(150), &|_event: ProgressEvent| {})
        .await;
    let FlowOutcome::Failed {
        intent,
        reason,
        requires_manual_approval,
    } = outcome
    else {
        panic!("expected failure, got {outcome:?}");
    };
    assert!(requires_manual_approval);
    assert!(reason.contains("Single transaction limit"));
    assert_eq!(intent.unwrap().status, IntentStatus::Blocked);

    let transfer_calls = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| {
            serde_json::from_slice::<serde_json::Value>(&r.body)
                .map(|b| b["method"] == "payment.transfer")
                .unwrap_or(false)
        })
        .count();
    assert_eq!(transfer_calls, 0);
}

#[tokio::test]
async fn fast_path_payment_touches_only_the_transfer_endpoint() {
    let server = MockServer::start().await;
    mount_backend(&server).await;

    let store = Arc::new(InMemoryStore::new());
    let config = engine_config(&server, vec![auto_approve(75)]);
    let engine = Engine::from_config(&config, store.clone()).unwrap();

    let outcome = engine
        .flow
        .run(agent_request(50), &|_event: ProgressEvent| {})
        .await;
    assert!(matches!(outcome, FlowOutcome::Completed { .. }));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["method"], "payment.transfer");
}

#[tokio::test]
async fn manual_approval_gate_holds_until_approved() {
    let server = MockServer::start().await;
    mount_backend(&server).await;

    let store = Arc::new(InMemoryStore::new());
    let mut config = engine_config(&server, vec![single_tx_limit(100), auto_approve(75)]);
    config.approval.require_manual = true;
    config.approval.fast_path = false;
    let engine = Engine::from_config(&config, store.clone()).unwrap();

    let outcome = engine
        .flow
        .run(agent_request(50), &|_event: ProgressEvent| {})
        .await;
    let FlowOutcome::RequiresApproval { intent } = outcome else {
        panic!("expected approval gate, got {outcome:?}");
    };
    assert_eq!(intent.status, IntentStatus::AwaitingApproval);

    let approved = engine.machine.approve(&intent.id).await.unwrap();
    assert_eq!(approved.status, IntentStatus::Approved);

    let executed = engine.machine.execute(&intent.id).await.unwrap();
    assert_eq!(executed.status, IntentStatus::Succeeded);
}

#[tokio::test]
async fn replay_reports_how_todays_policies_would_decide() {
    let server = MockServer::start().await;
    mount_backend(&server).await;

    let store = Arc::new(InMemoryStore::new());
    let mut config = engine_config(&server, vec![single_tx_limit(100), auto_approve(75)]);
    config.approval.fast_path = false;
    let engine = Engine::from_config(&config, store.clone()).unwrap();

    let outcome = engine
        .flow
        .run(agent_request(50), &|_event: ProgressEvent| {})
        .await;
    let FlowOutcome::Completed { intent, .. } = outcome else {
        panic!("expected completion, got {outcome:?}");
    };
    let intent_id = intent.unwrap().id;

    // The limit was tightened to $40 after the payment went through
    let tightened = engine_config(&server, vec![single_tx_limit(40)]);
    let reviewer = Engine::from_config(&tightened, store.clone()).unwrap();

    let report = reviewer.replay.replay(&intent_id).await.unwrap();
    assert_eq!(report.differences.len(), 1);
    let diff = &report.differences[0];
    assert_eq!(diff.policy_id, "g-tx");
    assert!(diff.original_passed);
    assert_eq!(diff.current_passed, Some(false));
}

#[tokio::test]
async fn misconfigured_engine_is_refused_at_construction() {
    let config = EngineConfig::default();
    let err = Engine::from_config(&config, Arc::new(InMemoryStore::new())).unwrap_err();
    assert!(err.to_string().contains("validation"));
}

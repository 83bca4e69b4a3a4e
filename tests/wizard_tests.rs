//! Wizard flow tests: the four stages end to end, bootstrap paths, and
//! budget reconciliation against the estimated transport cost.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use mockito::{Matcher, Server, ServerGuard};
use trip_planner_rs::{
    encode_for_sharing, BootstrapQuery, FareEstimator, FixedLocationProvider, GeminiClient,
    GeminiConfig, ItineraryGenerator, MemoryStore, PlanStore, RetryPolicy, Stage, Wizard,
};

const GENERATE_PATH: &str = "/models/gemini-2.5-flash:generateContent";

fn test_client(server: &ServerGuard) -> Arc<GeminiClient> {
    let client = GeminiClient::new(GeminiConfig {
        api_key: "test-key".to_string(),
        endpoint: server.url(),
        ..GeminiConfig::default()
    })
    .unwrap()
    .with_retry_policy(RetryPolicy {
        max_retries: 1,
        base_delay: Duration::from_millis(5),
        multiplier: 2,
        max_elapsed: None,
    });
    Arc::new(client)
}

fn wizard_for(server: &ServerGuard, store: PlanStore) -> Wizard {
    let client = test_client(server);
    Wizard::new(
        ItineraryGenerator::new(Arc::clone(&client)),
        FareEstimator::new(client),
        Arc::new(FixedLocationProvider::tokyo_station()),
        store,
    )
}

fn candidate_body(text: &str) -> String {
    serde_json::json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] } }]
    })
    .to_string()
}

fn destinations_json() -> String {
    serde_json::json!({
        "destinations": [{
            "id": "hokkaido-furano",
            "name": "北海道富良野",
            "nameEn": "Furano Hokkaido",
            "description": "パウダースノーで知られるスキーの町",
            "bestSeason": "12月〜3月",
            "estimatedCost": 80000,
            "highlights": ["スキー", "ラベンダー"]
        }]
    })
    .to_string()
}

fn plan_json() -> String {
    serde_json::json!({
        "summary": "富良野で2泊3日のスキー旅行",
        "itinerary": [
            { "day": 1, "date": "2025-06-01", "title": "移動", "items": [] },
            { "day": 2, "date": "2025-06-02", "title": "スキー", "items": [] },
            { "day": 3, "date": "2025-06-03", "title": "帰路", "items": [] }
        ],
        "hotels": [],
        "budgetBreakdown": {
            "transportation": 5000,
            "accommodation": 24000,
            "activities": 10000,
            "meals": 8000,
            "other": 3000,
            "total": 50000
        },
        "tips": [],
        "packingList": []
    })
    .to_string()
}

/// Mock the suggestion and transport-cost prompts on one server, telling
/// them apart by distinctive prompt fragments in the request body. The
/// plan prompt is mocked per test.
async fn mock_suggestions_and_transport(server: &mut ServerGuard, transport_reply: &str) {
    server
        .mock("POST", GENERATE_PATH)
        .match_query(Matcher::Any)
        .match_body(Matcher::Regex("旅行先を3つ提案".to_string()))
        .with_status(200)
        .with_body(candidate_body(&destinations_json()))
        .create_async()
        .await;
    server
        .mock("POST", GENERATE_PATH)
        .match_query(Matcher::Any)
        .match_body(Matcher::Regex("片道交通費".to_string()))
        .with_status(200)
        .with_body(candidate_body(transport_reply))
        .create_async()
        .await;
}

#[tokio::test]
async fn the_four_stages_run_end_to_end() {
    let mut server = Server::new_async().await;
    mock_suggestions_and_transport(&mut server, "12000").await;
    server
        .mock("POST", GENERATE_PATH)
        .match_query(Matcher::Any)
        .match_body(Matcher::Regex("詳細な旅行プラン".to_string()))
        .with_status(200)
        .with_body(candidate_body(&plan_json()))
        .create_async()
        .await;

    let store = PlanStore::new(Arc::new(MemoryStore::new()));
    let mut wizard = wizard_for(&server, store.clone());

    // Stage 1
    wizard.submit_activity("スキー").unwrap();

    // Stage 2
    let suggestions = wizard.load_destinations().await.unwrap().to_vec();
    assert_eq!(suggestions.len(), 1);
    let request = wizard.choose_destination(suggestions[0].clone()).unwrap();
    assert_eq!(wizard.stage(), Stage::Details);

    // Geolocation resolves before the cost estimate; both land via the
    // epoch guard.
    let update = wizard.resolve_transport_cost(&request).await;
    assert!(wizard.apply_transport_cost(update));
    assert_eq!(wizard.params().transport_cost, 12000);
    assert!(wizard.params().user_location.is_some());
    // With no budget entered yet, the estimate suggests one.
    assert_eq!(wizard.params().budget, Some(62000));

    // Stage 3
    wizard.set_dates(
        NaiveDate::from_ymd_opt(2025, 6, 1),
        NaiveDate::from_ymd_opt(2025, 6, 3),
    );
    wizard.set_budget(Some(100000));
    wizard.submit_details().unwrap();
    assert_eq!(wizard.stage(), Stage::Plan);

    // Stage 4
    let plan = wizard.generate().await.unwrap();
    assert_eq!(plan.itinerary.len(), 3);
    assert_eq!(plan.budget_breakdown.total, 50000);

    // Saving keeps the wizard snapshot alongside the plan.
    let record = wizard.save().await.unwrap();
    let listed = store.list().await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, record.id);
    assert_eq!(listed[0].params.activity, "スキー");
    assert_eq!(listed[0].params.transport_cost, 12000);
}

#[tokio::test]
async fn the_generator_receives_the_transport_reduced_budget() {
    let mut server = Server::new_async().await;
    mock_suggestions_and_transport(&mut server, "30000").await;

    // 100000 budget - 30000 transport = a 70000 generation target.
    let budget_probe = server
        .mock("POST", GENERATE_PATH)
        .match_query(Matcher::Any)
        .match_body(Matcher::Regex("予算: 70000円".to_string()))
        .with_status(200)
        .with_body(candidate_body(&plan_json()))
        .expect(1)
        .create_async()
        .await;

    let mut wizard = wizard_for(&server, PlanStore::new(Arc::new(MemoryStore::new())));
    wizard.submit_activity("スキー").unwrap();
    let suggestions = wizard.load_destinations().await.unwrap().to_vec();
    let request = wizard.choose_destination(suggestions[0].clone()).unwrap();
    let update = wizard.resolve_transport_cost(&request).await;
    wizard.apply_transport_cost(update);

    wizard.set_dates(
        NaiveDate::from_ymd_opt(2025, 6, 1),
        NaiveDate::from_ymd_opt(2025, 6, 3),
    );
    wizard.set_budget(Some(100000));
    wizard.submit_details().unwrap();
    wizard.generate().await.unwrap();

    budget_probe.assert_async().await;
}

#[tokio::test]
async fn a_reduction_that_zeroes_the_budget_falls_back_to_the_full_amount() {
    let mut server = Server::new_async().await;
    mock_suggestions_and_transport(&mut server, "60000").await;

    // Transport equals the budget; the unreduced amount goes to the AI.
    let budget_probe = server
        .mock("POST", GENERATE_PATH)
        .match_query(Matcher::Any)
        .match_body(Matcher::Regex("予算: 60000円".to_string()))
        .with_status(200)
        .with_body(candidate_body(&plan_json()))
        .expect(1)
        .create_async()
        .await;

    let mut wizard = wizard_for(&server, PlanStore::new(Arc::new(MemoryStore::new())));
    wizard.submit_activity("スキー").unwrap();
    let suggestions = wizard.load_destinations().await.unwrap().to_vec();
    let request = wizard.choose_destination(suggestions[0].clone()).unwrap();
    let update = wizard.resolve_transport_cost(&request).await;
    wizard.apply_transport_cost(update);

    wizard.set_dates(
        NaiveDate::from_ymd_opt(2025, 6, 1),
        NaiveDate::from_ymd_opt(2025, 6, 3),
    );
    wizard.set_budget(Some(60000));
    wizard.submit_details().unwrap();
    wizard.generate().await.unwrap();

    budget_probe.assert_async().await;
}

#[tokio::test]
async fn load_more_accumulates_and_excludes_previous_ids() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", GENERATE_PATH)
        .match_query(Matcher::Any)
        .match_body(Matcher::Regex("旅行先を3つ提案".to_string()))
        .with_status(200)
        .with_body(candidate_body(&destinations_json()))
        .create_async()
        .await;
    let more_mock = server
        .mock("POST", GENERATE_PATH)
        .match_query(Matcher::Any)
        .match_body(Matcher::Regex("提案済みです: hokkaido-furano".to_string()))
        .with_status(200)
        .with_body(candidate_body(
            &serde_json::json!({
                "destinations": [{
                    "id": "nagano-hakuba",
                    "name": "長野県白馬",
                    "description": "山岳リゾート",
                    "bestSeason": "冬",
                    "estimatedCost": 60000,
                    "highlights": []
                }]
            })
            .to_string(),
        ))
        .expect(1)
        .create_async()
        .await;

    let mut wizard = wizard_for(&server, PlanStore::new(Arc::new(MemoryStore::new())));
    wizard.submit_activity("スキー").unwrap();

    wizard.load_destinations().await.unwrap();
    assert_eq!(wizard.destinations().len(), 1);

    wizard.load_more().await.unwrap();
    more_mock.assert_async().await;

    // The batch accumulates, it never replaces.
    assert_eq!(wizard.destinations().len(), 2);
    assert_eq!(wizard.destinations()[0].id, "hokkaido-furano");
    assert_eq!(wizard.destinations()[1].id, "nagano-hakuba");
}

#[tokio::test]
async fn generation_failure_leaves_the_stage_interactive_for_retry() {
    let mut server = Server::new_async().await;
    mock_suggestions_and_transport(&mut server, "12000").await;
    let failing = server
        .mock("POST", GENERATE_PATH)
        .match_query(Matcher::Any)
        .match_body(Matcher::Regex("詳細な旅行プラン".to_string()))
        .with_status(429)
        .with_body(r#"{"error":{"status":"RESOURCE_EXHAUSTED","message":"quota"}}"#)
        .expect(2)
        .create_async()
        .await;

    let mut wizard = wizard_for(&server, PlanStore::new(Arc::new(MemoryStore::new())));
    wizard.submit_activity("スキー").unwrap();
    let suggestions = wizard.load_destinations().await.unwrap().to_vec();
    wizard.choose_destination(suggestions[0].clone()).unwrap();
    wizard.set_dates(
        NaiveDate::from_ymd_opt(2025, 6, 1),
        NaiveDate::from_ymd_opt(2025, 6, 3),
    );
    wizard.set_budget(Some(100000));
    wizard.submit_details().unwrap();

    let err = wizard.generate().await.unwrap_err();
    assert_eq!(err.error_code(), "QUOTA_EXCEEDED");
    assert!(err.is_retryable());

    // The wizard stays at the plan stage with no plan attached and is not
    // stuck busy.
    failing.assert_async().await;
    assert_eq!(wizard.stage(), Stage::Plan);
    assert!(wizard.generated_plan().is_none());
    assert!(!wizard.is_busy());
}

#[tokio::test]
async fn bootstrap_resumes_a_saved_plan_without_regenerating() {
    let server = Server::new_async().await;
    let store = PlanStore::new(Arc::new(MemoryStore::new()));

    // Seed a saved record through a throwaway wizard save.
    let plan: trip_planner_rs::Plan = serde_json::from_str(&plan_json()).unwrap();
    let params = trip_planner_rs::WizardParams {
        activity: "スキー".to_string(),
        budget: Some(100000),
        ..Default::default()
    };
    let record = store.save(&plan, &params).await.unwrap();

    let mut wizard = wizard_for(&server, store);
    let bootstrapped = wizard
        .bootstrap(&BootstrapQuery {
            plan_id: Some(record.id.clone()),
            shared_plan: None,
        })
        .await;

    assert!(bootstrapped);
    assert_eq!(wizard.stage(), Stage::Plan);
    assert_eq!(wizard.params().activity, "スキー");

    // generate() returns the attached plan; no endpoint is configured, so
    // any network call would fail loudly.
    let generated = wizard.generate().await.unwrap();
    assert_eq!(generated.summary, "富良野で2泊3日のスキー旅行");
}

#[tokio::test]
async fn bootstrap_restores_a_shared_plan_and_survives_round_trip() {
    let server = Server::new_async().await;

    let mut plan: trip_planner_rs::Plan = serde_json::from_str(&plan_json()).unwrap();
    plan.params = Some(trip_planner_rs::PlanParams {
        activity: "スキー".to_string(),
        destination: "北海道富良野".to_string(),
        start_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2025, 6, 3).unwrap(),
        budget: 100000,
    });
    let payload = encode_for_sharing(&plan).unwrap();

    let mut wizard = wizard_for(&server, PlanStore::new(Arc::new(MemoryStore::new())));
    let bootstrapped = wizard
        .bootstrap(&BootstrapQuery {
            plan_id: None,
            shared_plan: Some(payload),
        })
        .await;

    assert!(bootstrapped);
    assert_eq!(wizard.stage(), Stage::Plan);
    assert_eq!(wizard.params().activity, "スキー");
    assert_eq!(wizard.params().budget, Some(100000));
    assert_eq!(
        wizard.generated_plan().unwrap().summary,
        "富良野で2泊3日のスキー旅行"
    );
}

#[tokio::test]
async fn a_corrupt_share_link_falls_back_to_the_initial_stage() {
    let server = Server::new_async().await;
    let mut wizard = wizard_for(&server, PlanStore::new(Arc::new(MemoryStore::new())));

    let bootstrapped = wizard
        .bootstrap(&BootstrapQuery {
            plan_id: None,
            shared_plan: Some("これは壊れたリンクです!!".to_string()),
        })
        .await;

    assert!(!bootstrapped);
    assert_eq!(wizard.stage(), Stage::Activity);
    assert!(wizard.generated_plan().is_none());
}

#[tokio::test]
async fn an_unknown_saved_plan_id_does_not_bootstrap() {
    let server = Server::new_async().await;
    let mut wizard = wizard_for(&server, PlanStore::new(Arc::new(MemoryStore::new())));

    let bootstrapped = wizard
        .bootstrap(&BootstrapQuery {
            plan_id: Some("plan_missing".to_string()),
            shared_plan: None,
        })
        .await;

    assert!(!bootstrapped);
    assert_eq!(wizard.stage(), Stage::Activity);
}

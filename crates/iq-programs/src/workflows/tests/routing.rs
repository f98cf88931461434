use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::workflows::address::RuleBasedTagger;
use crate::workflows::catalog::ProgramId;
use crate::workflows::storage::InMemoryStore;
use crate::workflows::{benefits_router, BenefitsService, Collaborators};

type Service = BenefitsService<InMemoryStore, RecordingNotifier>;

fn build_service() -> (Arc<Service>, Arc<InMemoryStore>, Arc<RecordingNotifier>) {
    let store = Arc::new(InMemoryStore::with_catalog(standard_catalog()));
    let notifier = Arc::new(RecordingNotifier::default());
    let service = BenefitsService::new(
        Arc::clone(&store),
        Collaborators {
            tagger: Arc::new(RuleBasedTagger),
            validator: Arc::new(FakeValidator::knowing(vec![canonical_postal(
                "300 Laporte Ave",
                "",
            )])),
            service_area: serviceable_resolver(),
            documents: Arc::new(MemoryDocuments::default()),
            notifier: Arc::clone(&notifier),
        },
    );
    (Arc::new(service), store, notifier)
}

async fn send(service: &Arc<Service>, method: &str, uri: &str, body: Option<Value>) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    let body = match body {
        Some(value) => Body::from(serde_json::to_vec(&value).expect("json encodes")),
        None => Body::empty(),
    };
    benefits_router(Arc::clone(service))
        .oneshot(request.body(body).expect("request builds"))
        .await
        .expect("route executes")
}

async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[tokio::test]
async fn resolve_route_returns_canonical_record() {
    let (service, store, _) = build_service();

    let response = send(
        &service,
        "POST",
        "/api/v1/addresses/resolve",
        Some(json!({
            "address1": "300 laporte ave",
            "city": "Fort Collins",
            "state": "co",
            "zip_code": "80521"
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["outcome"], "resolved");
    assert_eq!(payload["record"]["address1"], "300 LAPORTE AVE");
    assert_eq!(payload["record"]["is_in_service_area"], true);
    assert_eq!(payload["matches_input"], true);
    assert_eq!(store.address_count(), 1);
}

#[tokio::test]
async fn unresolvable_address_returns_correction_prompt() {
    let (service, _, _) = build_service();

    let response = send(
        &service,
        "POST",
        "/api/v1/addresses/resolve",
        Some(json!({ "address1": "1 Unknown Way", "zip_code": "80521" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["outcome"], "needs_correction");
    assert!(payload["guidance"]
        .as_str()
        .is_some_and(|guidance| guidance.starts_with("We couldn't verify")));
}

#[tokio::test]
async fn finalize_without_selections_is_unprocessable() {
    let (service, store, notifier) = build_service();
    let home = store_address(&store, "300 Laporte Ave", in_area(true));
    seed_user(&store, 1, &home, None);

    let response = send(&service, "POST", "/api/v1/users/1/finalize", Some(json!({}))).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn selections_then_finalize_enrolls_user() {
    let (service, store, notifier) = build_service();
    let home = store_address(&store, "300 Laporte Ave", in_area(true));
    seed_user(&store, 1, &home, None);

    let response = send(
        &service,
        "POST",
        "/api/v1/users/1/eligibility-programs",
        Some(json!({
            "program_id": 1,
            "document": {
                "file_name": "snap-letter.pdf",
                "content_type": "application/pdf",
                "bytes": [37, 80, 68, 70]
            }
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["document"], "1/1/snap-letter.pdf");

    let response = send(&service, "POST", "/api/v1/users/1/finalize", Some(json!({}))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["target"], "broadcast");
    assert_eq!(payload["applied"], json!([1, 2, 4]));
    assert_eq!(notifier.sent().len(), 2);
}

#[tokio::test]
async fn selection_route_validates_program_and_document() {
    let (service, store, _) = build_service();
    let home = store_address(&store, "300 Laporte Ave", in_area(true));
    seed_user(&store, 1, &home, None);

    let unknown = send(
        &service,
        "POST",
        "/api/v1/users/1/eligibility-programs",
        Some(json!({ "program_id": 77 })),
    )
    .await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    let empty = send(
        &service,
        "POST",
        "/api/v1/users/1/eligibility-programs",
        Some(json!({
            "program_id": 2,
            "document": { "file_name": "blank.pdf", "content_type": "application/pdf", "bytes": [] }
        })),
    )
    .await;
    assert_eq!(empty.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn programs_route_lists_dashboard() {
    let (service, store, _) = build_service();
    let home = store_address(&store, "300 Laporte Ave", in_area(true));
    let user = seed_user(&store, 1, &home, Some("0.3"));
    hold(&store, user, 1, true);

    let response = send(&service, "GET", "/api/v1/users/1/programs", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let programs = payload["programs"].as_array().expect("programs listed");
    assert_eq!(programs.len(), 4);
    assert_eq!(programs[0]["status"], "ACTIVE");
    assert_eq!(programs[1]["status"], Value::Null);

    let missing = send(&service, "GET", "/api/v1/users/99/programs", None).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn apply_route_creates_once() {
    let (service, store, _) = build_service();
    let home = store_address(&store, "300 Laporte Ave", in_area(true));
    seed_user(&store, 1, &home, Some("0.3"));

    let created = send(&service, "POST", "/api/v1/users/1/programs/3/apply", None).await;
    assert_eq!(created.status(), StatusCode::CREATED);

    let duplicate = send(&service, "POST", "/api/v1/users/1/programs/3/apply", None).await;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let enroll = send(&service, "POST", "/api/v1/admin/users/1/programs/4/enroll", None).await;
    assert_eq!(enroll.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reconcile_route_previews_before_commit() {
    let (service, store, _) = build_service();
    let home = store_address(&store, "300 Laporte Ave", in_area(true));
    let away = store_address(&store, "1 Far Rd", outside_area());
    seed_user(&store, 1, &home, Some("0.3"));
    let outsider = seed_user(&store, 2, &away, Some("0.3"));
    hold(&store, outsider, 1, false);

    let preview = send(
        &service,
        "POST",
        "/api/v1/admin/programs/1/reconcile",
        Some(json!({ "commit": false })),
    )
    .await;
    assert_eq!(preview.status(), StatusCode::OK);
    let payload = read_json_body(preview).await;
    assert_eq!(payload["committed"], false);
    assert_eq!(payload["affected"]["to_apply"], json!([1]));
    assert_eq!(payload["affected"]["to_remove"], json!([2]));
    assert_eq!(held_programs(&store, outsider), vec![1]);

    let commit = send(
        &service,
        "POST",
        "/api/v1/admin/programs/1/reconcile",
        Some(json!({ "commit": true })),
    )
    .await;
    let payload = read_json_body(commit).await;
    assert_eq!(payload["committed"], true);
    assert_eq!(payload["counts"]["applied"], 1);
    assert_eq!(payload["counts"]["removed"], 1);
    assert!(held_programs(&store, outsider).is_empty());
}

#[tokio::test]
async fn program_update_route_validates_and_reconciles() {
    let (service, store, _) = build_service();
    let home = store_address(&store, "300 Laporte Ave", in_area(true));
    let user = seed_user(&store, 1, &home, Some("0.5"));
    hold(&store, user, 1, false);

    let mut grocery = standard_catalog()
        .assistance_program(ProgramId(1))
        .cloned()
        .expect("grocery exists");

    let mismatch = send(
        &service,
        "PUT",
        "/api/v1/admin/programs/2",
        Some(serde_json::to_value(&grocery).expect("program encodes")),
    )
    .await;
    assert_eq!(mismatch.status(), StatusCode::BAD_REQUEST);

    grocery.ami_threshold = decimal("1.5");
    let invalid = send(
        &service,
        "PUT",
        "/api/v1/admin/programs/1",
        Some(serde_json::to_value(&grocery).expect("program encodes")),
    )
    .await;
    assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);

    grocery.ami_threshold = decimal("0.4");
    let updated = send(
        &service,
        "PUT",
        "/api/v1/admin/programs/1",
        Some(serde_json::to_value(&grocery).expect("program encodes")),
    )
    .await;
    assert_eq!(updated.status(), StatusCode::OK);
    let payload = read_json_body(updated).await;
    assert_eq!(payload["counts"]["removed"], 1);
    assert!(held_programs(&store, user).is_empty());
}

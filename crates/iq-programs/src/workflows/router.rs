use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::address::{AddressId, AddressInput, AddressWorkflow};
use super::catalog::{AssistanceProgram, EligibilityProgramId, ProgramId};
use super::enrollment::{EnrollmentStore, Notifier, UploadedDocument, UserId};
use super::service::{BenefitsService, ServiceError};

/// JSON routes for address resolution, enrollment and program administration.
pub fn benefits_router<S, N>(service: Arc<BenefitsService<S, N>>) -> Router
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route("/api/v1/addresses/resolve", post(resolve_handler::<S, N>))
        .route("/api/v1/addresses/resume", post(resume_handler::<S, N>))
        .route(
            "/api/v1/admin/addresses/:address_id/recheck",
            post(recheck_handler::<S, N>),
        )
        .route("/api/v1/users/:user_id/address", put(link_address_handler::<S, N>))
        .route(
            "/api/v1/users/:user_id/eligibility-programs",
            post(selection_handler::<S, N>),
        )
        .route("/api/v1/users/:user_id/finalize", post(finalize_handler::<S, N>))
        .route("/api/v1/users/:user_id/reconcile", post(reconcile_user_handler::<S, N>))
        .route("/api/v1/users/:user_id/programs", get(programs_handler::<S, N>))
        .route(
            "/api/v1/users/:user_id/programs/:program_id/apply",
            post(apply_handler::<S, N>),
        )
        .route(
            "/api/v1/admin/users/:user_id/programs/:program_id/enroll",
            post(enroll_handler::<S, N>),
        )
        .route(
            "/api/v1/admin/programs/:program_id",
            put(update_program_handler::<S, N>),
        )
        .route(
            "/api/v1/admin/programs/:program_id/reconcile",
            post(reconcile_handler::<S, N>),
        )
        .with_state(service)
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct FinalizeRequest {
    #[serde(default)]
    pub renewal_mode: bool,
    #[serde(default = "default_true")]
    pub update_user: bool,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct ReconcileRequest {
    #[serde(default)]
    pub commit: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SelectionRequest {
    pub program_id: EligibilityProgramId,
    #[serde(default)]
    pub document: Option<UploadedDocument>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct LinkAddressRequest {
    pub eligibility_address_id: AddressId,
    #[serde(default)]
    pub mailing_address_id: Option<AddressId>,
}

fn default_true() -> bool {
    true
}

fn error_response(err: ServiceError) -> Response {
    let payload = json!({ "error": err.to_string() });
    (err.status(), Json(payload)).into_response()
}

fn respond<T: Serialize>(result: Result<T, ServiceError>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn resolve_handler<S, N>(
    State(service): State<Arc<BenefitsService<S, N>>>,
    Json(input): Json<AddressInput>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
{
    respond(service.resolve_address(input))
}

pub(crate) async fn resume_handler<S, N>(
    State(service): State<Arc<BenefitsService<S, N>>>,
    Json(workflow): Json<AddressWorkflow>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
{
    respond(service.resume_address(workflow))
}

pub(crate) async fn recheck_handler<S, N>(
    State(service): State<Arc<BenefitsService<S, N>>>,
    Path(address_id): Path<u64>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
{
    respond(service.recheck_address(AddressId(address_id)))
}

pub(crate) async fn link_address_handler<S, N>(
    State(service): State<Arc<BenefitsService<S, N>>>,
    Path(user_id): Path<u64>,
    Json(request): Json<LinkAddressRequest>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
{
    respond(service.link_user_address(
        UserId(user_id),
        request.eligibility_address_id,
        request.mailing_address_id,
    ))
}

pub(crate) async fn selection_handler<S, N>(
    State(service): State<Arc<BenefitsService<S, N>>>,
    Path(user_id): Path<u64>,
    Json(request): Json<SelectionRequest>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
{
    match service.record_eligibility_selection(UserId(user_id), request.program_id, request.document) {
        Ok(selection) => (StatusCode::CREATED, Json(selection)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn finalize_handler<S, N>(
    State(service): State<Arc<BenefitsService<S, N>>>,
    Path(user_id): Path<u64>,
    Json(request): Json<FinalizeRequest>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
{
    respond(service.finalize(UserId(user_id), request.renewal_mode, request.update_user))
}

pub(crate) async fn reconcile_user_handler<S, N>(
    State(service): State<Arc<BenefitsService<S, N>>>,
    Path(user_id): Path<u64>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
{
    respond(service.reconcile_user(UserId(user_id)))
}

pub(crate) async fn programs_handler<S, N>(
    State(service): State<Arc<BenefitsService<S, N>>>,
    Path(user_id): Path<u64>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
{
    respond(service.dashboard(UserId(user_id), Utc::now()))
}

pub(crate) async fn apply_handler<S, N>(
    State(service): State<Arc<BenefitsService<S, N>>>,
    Path((user_id, program_id)): Path<(u64, u32)>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
{
    match service.apply_to_program(UserId(user_id), ProgramId(program_id)) {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn enroll_handler<S, N>(
    State(service): State<Arc<BenefitsService<S, N>>>,
    Path((user_id, program_id)): Path<(u64, u32)>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
{
    respond(service.mark_enrolled(UserId(user_id), ProgramId(program_id)))
}

pub(crate) async fn update_program_handler<S, N>(
    State(service): State<Arc<BenefitsService<S, N>>>,
    Path(program_id): Path<u32>,
    Json(program): Json<AssistanceProgram>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
{
    if program.id != ProgramId(program_id) {
        let payload = json!({ "error": "program id in path and body differ" });
        return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
    }

    match service.update_program(program) {
        Ok((program, counts)) => {
            (StatusCode::OK, Json(json!({ "program": program, "counts": counts }))).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn reconcile_handler<S, N>(
    State(service): State<Arc<BenefitsService<S, N>>>,
    Path(program_id): Path<u32>,
    Json(request): Json<ReconcileRequest>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
{
    let program_id = ProgramId(program_id);
    if request.commit {
        match service.reconcile_program(program_id, true) {
            Ok(counts) => {
                (StatusCode::OK, Json(json!({ "committed": true, "counts": counts })))
                    .into_response()
            }
            Err(err) => error_response(err),
        }
    } else {
        match service.preview_program_change(program_id) {
            Ok(affected) => {
                (StatusCode::OK, Json(json!({ "committed": false, "affected": affected })))
                    .into_response()
            }
            Err(err) => error_response(err),
        }
    }
}

use rocket::{serde::json::Json, State};
use shared::{compute_ledger, ContributionStatus};

use crate::db::{types::NewContribution, DB};
use crate::error::ApiError;
use crate::sync::{reconcile, SyncReport};
use crate::ProgramConfig;

use super::types::{
    ContributionResponse, PreviewResponse, RejectRequest, SubmitRequest, SubmitResponse,
    SyncRequest,
};
use super::Admin;

#[utoipa::path(responses(
    (status = 200, description = "Records awaiting review", body = Vec<ContributionResponse>)
))]
#[get("/pending-prs")]
async fn pending_prs(db: &State<DB>) -> Json<Vec<ContributionResponse>> {
    Json(
        db.list_pending()
            .await
            .into_iter()
            .map(Into::into)
            .collect(),
    )
}

#[utoipa::path(responses(
    (status = 200, description = "All records regardless of state", body = Vec<ContributionResponse>)
))]
#[get("/all-prs")]
async fn all_prs(db: &State<DB>) -> Json<Vec<ContributionResponse>> {
    Json(db.list_all().await.into_iter().map(Into::into).collect())
}

#[utoipa::path(responses(
    (status = 200, description = "Rejected records", body = Vec<ContributionResponse>)
))]
#[get("/rejected-prs")]
async fn rejected_prs(db: &State<DB>) -> Json<Vec<ContributionResponse>> {
    Json(
        db.list_rejected()
            .await
            .into_iter()
            .map(Into::into)
            .collect(),
    )
}

/// Submission intake. The suggested points are copied from the accepted
/// repository's configured value; a repeated submission of the same
/// (user, repo, number) tuple is a no-op with `created: false`.
#[utoipa::path(responses(
    (status = 200, description = "Conditional insert outcome", body = SubmitResponse),
    (status = 400, description = "Unaccepted repository or pre-program merge")
))]
#[post("/submit-pr", data = "<body>")]
async fn submit_pr(
    _admin: Admin,
    body: Json<SubmitRequest>,
    db: &State<DB>,
    config: &State<ProgramConfig>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let body = body.into_inner();
    let repo = db.get_repo(&body.repo_url).await.ok_or_else(|| {
        ApiError::Validation(format!(
            "repository {} is not accepted into the program",
            body.repo_url
        ))
    })?;
    if body.merged_at < config.start_date {
        return Err(ApiError::Validation(format!(
            "contribution was merged before the program start date ({})",
            config.start_date.date_naive()
        )));
    }

    let submitted = db
        .submit_contribution(NewContribution {
            user: body.user,
            repo_url: body.repo_url,
            number: body.number,
            title: body.title,
            merged_at: body.merged_at,
            suggested_points: repo.points,
        })
        .await;
    Ok(Json(SubmitResponse {
        created: submitted.created,
        id: submitted.id,
    }))
}

#[utoipa::path(responses(
    (status = 200, description = "Approved record", body = ContributionResponse),
    (status = 404, description = "Unknown id"),
    (status = 409, description = "Record is not pending")
))]
#[post("/pr/<id>/approve")]
async fn approve_pr(
    admin: Admin,
    id: u64,
    db: &State<DB>,
) -> Result<Json<ContributionResponse>, ApiError> {
    let record = db.approve(id, &admin.login).await?;
    Ok(Json(record.into()))
}

#[utoipa::path(responses(
    (status = 200, description = "Rejected record", body = ContributionResponse),
    (status = 404, description = "Unknown id"),
    (status = 409, description = "Record is not pending")
))]
#[post("/pr/<id>/reject", data = "<body>")]
async fn reject_pr(
    _admin: Admin,
    id: u64,
    body: Option<Json<RejectRequest>>,
    db: &State<DB>,
) -> Result<Json<ContributionResponse>, ApiError> {
    let reason = body.and_then(|b| b.into_inner().reason);
    let record = db.reject(id, reason).await?;
    Ok(Json(record.into()))
}

/// Overwrites the adjusted-points field of an approved record. The body is
/// validated by hand so a negative or non-numeric value answers 400 with a
/// precise message instead of a generic parse failure.
#[utoipa::path(responses(
    (status = 200, description = "Adjusted record", body = ContributionResponse),
    (status = 400, description = "Negative or non-numeric points"),
    (status = 404, description = "Unknown id"),
    (status = 409, description = "Record is not approved")
))]
#[patch("/pr/<id>/points", data = "<body>")]
async fn adjust_points(
    _admin: Admin,
    id: u64,
    body: Json<serde_json::Value>,
    db: &State<DB>,
) -> Result<Json<ContributionResponse>, ApiError> {
    let points = body
        .get("points")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| {
            ApiError::Validation("points must be a non-negative integer".to_string())
        })?;
    let points = u32::try_from(points)
        .map_err(|_| ApiError::Validation("points exceeds the supported range".to_string()))?;

    let record = db.adjust_points(id, points).await?;
    Ok(Json(record.into()))
}

#[utoipa::path(responses(
    (status = 200, description = "Record deleted"),
    (status = 404, description = "Unknown id"),
    (status = 409, description = "Record is not rejected")
))]
#[delete("/pr/<id>")]
async fn delete_pr(_admin: Admin, id: u64, db: &State<DB>) -> Result<(), ApiError> {
    db.delete(id).await
}

/// Single-user scoring preview for review UIs: the ledger the owning user
/// would hold if this record counted, without touching any stored ledger.
#[utoipa::path(responses(
    (status = 200, description = "Prospective ledger", body = PreviewResponse),
    (status = 404, description = "Unknown id")
))]
#[get("/pr/<id>/preview")]
async fn preview_pr(id: u64, db: &State<DB>) -> Result<Json<PreviewResponse>, ApiError> {
    let record = db
        .get_contribution(id)
        .await
        .ok_or(ApiError::NotFound(id))?;
    let login = record.user.clone();

    let mut records = db.list_for_user(&login).await;
    for candidate in &mut records {
        if candidate.id == id && !candidate.status.is_approved() {
            candidate.status = ContributionStatus::Approved {
                reviewer: String::new(),
                reviewed_at: candidate.merged_at,
            };
        }
    }

    Ok(Json(PreviewResponse::new(login, compute_ledger(&records))))
}

#[utoipa::path(responses(
    (status = 200, description = "Reconciliation summary", body = SyncReport)
))]
#[post("/sync-pending-prs", data = "<body>")]
async fn sync_pending_prs(
    _admin: Admin,
    body: Option<Json<SyncRequest>>,
    db: &State<DB>,
) -> Json<SyncReport> {
    let create_backup = body.map(|b| b.create_backup).unwrap_or_default();
    Json(reconcile(db, create_backup).await)
}

pub fn stage() -> rocket::fairing::AdHoc {
    rocket::fairing::AdHoc::on_ignite("Installing review entrypoints", |rocket| async {
        rocket.mount(
            "/",
            rocket::routes![
                pending_prs,
                all_prs,
                rejected_prs,
                submit_pr,
                approve_pr,
                reject_pr,
                adjust_points,
                delete_pr,
                preview_pr,
                sync_pending_prs
            ],
        )
    })
}

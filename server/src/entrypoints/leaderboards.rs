use rocket::{serde::json::Json, State};

use crate::db::DB;
use crate::leaderboard::rank;

use super::types::{LeaderboardRowResponse, PaginatedResponse};

#[utoipa::path(responses(
    (status = 200, description = "Ranked projection of the ledgers", body = PaginatedLeaderboardResponse)
))]
#[get("/leaderboard?<page>&<limit>")]
async fn get_leaderboard(
    db: &State<DB>,
    page: Option<u64>,
    limit: Option<u64>,
) -> Json<PaginatedResponse<LeaderboardRowResponse>> {
    let page = page.unwrap_or(0);
    let limit = limit.unwrap_or(50).max(1);

    let ranked = rank(db.get_users().await);
    let total = ranked.len() as u64;
    // page and limit are caller-controlled; saturate instead of overflowing.
    let records = ranked
        .into_iter()
        .skip(page.saturating_mul(limit) as usize)
        .take(limit as usize)
        .map(Into::into)
        .collect();

    Json(PaginatedResponse::new(
        records,
        page.saturating_add(1),
        limit,
        total,
    ))
}

pub fn stage() -> rocket::fairing::AdHoc {
    rocket::fairing::AdHoc::on_ignite("Installing leaderboard entrypoints", |rocket| async {
        rocket.mount("/", rocket::routes![get_leaderboard])
    })
}

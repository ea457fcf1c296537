use rocket::{
    fairing::AdHoc,
    http::Status,
    request::{FromRequest, Outcome},
    serde::json::Json,
    Request,
};

use crate::error::{ApiError, ErrorBody};

pub mod contributions;
pub mod leaderboards;
pub mod types;

/// Shared administrator token, checked by the [`Admin`] guard. Identity and
/// session management live with an external collaborator; the server only
/// verifies this token.
pub struct AdminToken(pub String);

/// Request guard for the mutating entrypoints. The reviewer identity comes
/// from the `X-Admin-Login` header the session layer forwards.
pub struct Admin {
    pub login: String,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Admin {
    type Error = ApiError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let expected = req.rocket().state::<AdminToken>();
        let provided = req
            .headers()
            .get_one("Authorization")
            .and_then(|header| header.strip_prefix("Bearer "));
        match (expected, provided) {
            (Some(expected), Some(token)) if token == expected.0 => {
                let login = req
                    .headers()
                    .get_one("X-Admin-Login")
                    .unwrap_or("admin")
                    .to_string();
                Outcome::Success(Admin { login })
            }
            _ => Outcome::Error((Status::Forbidden, ApiError::Unauthorized)),
        }
    }
}

#[catch(403)]
fn forbidden() -> Json<ErrorBody> {
    Json(ErrorBody::new(
        "unauthorized",
        "administrator token missing or invalid",
    ))
}

#[catch(404)]
fn not_found(req: &Request) -> Json<ErrorBody> {
    Json(ErrorBody::new(
        "not_found",
        format!("no route or record at {}", req.uri()),
    ))
}

#[catch(422)]
fn unprocessable() -> Json<ErrorBody> {
    Json(ErrorBody::new(
        "validation",
        "request body is malformed for this entrypoint",
    ))
}

#[catch(500)]
fn internal() -> Json<ErrorBody> {
    Json(ErrorBody::new("internal", "unexpected server failure"))
}

pub fn stage() -> AdHoc {
    AdHoc::on_ignite("Installing entrypoints", |rocket| async {
        rocket
            .register(
                "/",
                rocket::catchers![forbidden, not_found, unprocessable, internal],
            )
            .attach(contributions::stage())
            .attach(leaderboards::stage())
    })
}

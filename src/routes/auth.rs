/// Token Routes

use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::auth::{IdentityClaim, TokenIssuer, ACCESS_TOKEN_TTL};
use crate::error::AppError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

/// GET /auth/refresh
///
/// Exchanges a valid token (checked by `JwtMiddleware`) for a new access
/// token carrying the same identity. The account is not looked up again.
pub async fn refresh(
    claim: web::ReqData<IdentityClaim>,
    issuer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, AppError> {
    let access_token = issuer.sign(&claim, ACCESS_TOKEN_TTL)?;

    tracing::info!(user_id = %claim.subject_id, "Access token refreshed");

    Ok(HttpResponse::Ok().json(RefreshResponse { access_token }))
}

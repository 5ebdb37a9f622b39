/// Account Routes
///
/// Registration and login (public) plus list, search, edit and delete
/// (token required, see `JwtMiddleware`).

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{
    hash_password, verify_password, IdentityClaim, TokenIssuer, ACCESS_TOKEN_TTL,
    REFRESH_TOKEN_TTL,
};
use crate::error::{AppError, ErrorContext, ValidationError};
use crate::models::{NewUser, PublicUser, User, UserChanges, UserFilter};
use crate::store::UserStore;
use crate::validators::{
    is_valid_email, is_valid_name, is_valid_password, parse_user_id,
};

/// POST /users/register body
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
    pub name: Option<String>,
}

/// POST /users/login body
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// GET /users/search query
#[derive(Deserialize)]
pub struct SearchQuery {
    pub id: Option<String>,
    pub email: Option<String>,
}

/// Account plus a fresh token pair
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

impl AuthResponse {
    fn new(user: User, (access_token, refresh_token): (String, String)) -> Self {
        Self {
            user,
            access_token,
            refresh_token,
        }
    }
}

/// Sign an access and a refresh token for the same identity
fn sign_token_pair(
    identity: &IdentityClaim,
    issuer: &TokenIssuer,
) -> Result<(String, String), AppError> {
    Ok((
        issuer.sign(identity, ACCESS_TOKEN_TTL)?,
        issuer.sign(identity, REFRESH_TOKEN_TTL)?,
    ))
}

/// Treat absent and blank values the same
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// POST /users/register
///
/// Validates the body, hashes the password, stores the account and returns it
/// with an access token (15 min) and a refresh token (12 h).
///
/// # Errors
/// - 400: missing field, bad email/name, password and confirmation differ
/// - 409: email already registered
/// - 500: hashing or storage failure
pub async fn register(
    body: web::Json<RegisterRequest>,
    store: web::Data<dyn UserStore>,
    issuer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");
    let body = body.into_inner();

    let email = non_blank(body.email)
        .ok_or_else(|| ValidationError::EmptyField("email".to_string()))?;
    let password = body.password.unwrap_or_default();
    is_valid_password(&password)?;
    if body.confirm_password.as_deref() != Some(password.as_str()) {
        return Err(ValidationError::PasswordConfirmation.into());
    }
    let email = is_valid_email(&email)?;
    let name = is_valid_name(body.name.as_deref().unwrap_or_default())?;

    // Hash before anything is persisted; a failure here aborts the request.
    let password_hash = web::block(move || hash_password(&password)).await??;

    let new_user = NewUser::new(email, name, password_hash);
    let tokens = sign_token_pair(&new_user.identity(), issuer.get_ref())?;
    let user = store.create(new_user).await?;

    tracing::info!(
        request_id = %context.request_id,
        operation = context.operation,
        user_id = %user.id,
        "User registered successfully"
    );

    Ok(HttpResponse::Ok().json(AuthResponse::new(user, tokens)))
}

/// POST /users/login
///
/// # Errors
/// - 400: email or password missing
/// - 404: no account with that email
/// - 403: wrong password
pub async fn login(
    body: web::Json<LoginRequest>,
    store: web::Data<dyn UserStore>,
    issuer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");
    let body = body.into_inner();

    let (email, password) = match (non_blank(body.email), body.password) {
        (Some(email), Some(password)) if !password.is_empty() => (email, password),
        _ => {
            return Err(ValidationError::EmptyField("Email and password".to_string()).into())
        }
    };

    let user = store
        .find_one(&UserFilter::by_email(email.trim()))
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let credential = user.password.clone();
    web::block(move || verify_password(&password, &credential)).await??;
    let tokens = sign_token_pair(&user.identity(), issuer.get_ref())?;

    tracing::info!(
        request_id = %context.request_id,
        operation = context.operation,
        user_id = %user.id,
        "User logged in successfully"
    );

    Ok(HttpResponse::Ok().json(AuthResponse::new(user, tokens)))
}

/// GET /users
pub async fn list_users(store: web::Data<dyn UserStore>) -> Result<HttpResponse, AppError> {
    let users = store.find(&UserFilter::default()).await?;

    Ok(HttpResponse::Ok().json(users.iter().map(PublicUser::from).collect::<Vec<_>>()))
}

/// GET /users/search?id=..&email=..
///
/// Both parameters are optional and combine with AND. No match is an empty
/// list, not an error.
pub async fn search_users(
    query: web::Query<SearchQuery>,
    store: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();

    let filter = UserFilter {
        id: non_blank(query.id)
            .map(|id| parse_user_id(&id))
            .transpose()?,
        email: non_blank(query.email).map(|email| email.trim().to_string()),
    };

    let users = store.find(&filter).await?;

    Ok(HttpResponse::Ok().json(users.iter().map(PublicUser::from).collect::<Vec<_>>()))
}

/// PUT /users/{id}/edit
///
/// Only `email` and `name` can change; the password is not editable here.
pub async fn edit_user(
    path: web::Path<String>,
    body: web::Json<UserChanges>,
    store: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    let id = parse_user_id(&path)?;
    let context = ErrorContext::new("user_edit");
    let body = body.into_inner();

    let changes = UserChanges {
        email: body.email.as_deref().map(is_valid_email).transpose()?,
        name: body.name.as_deref().map(is_valid_name).transpose()?,
    };

    let user = store
        .update_one(&UserFilter::by_id(id), changes)
        .await?
        .ok_or_else(|| AppError::NotFound("User was not found!".to_string()))?;

    tracing::info!(
        request_id = %context.request_id,
        operation = context.operation,
        user_id = %user.id,
        "User updated"
    );

    Ok(HttpResponse::Ok().json(PublicUser::from(&user)))
}

/// DELETE /users/{id}
pub async fn delete_user(
    path: web::Path<String>,
    store: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    let id = parse_user_id(&path)?;
    let context = ErrorContext::new("user_delete");

    match store.destroy_one(&UserFilter::by_id(id)).await? {
        Some(_) => {
            tracing::info!(
                request_id = %context.request_id,
                operation = context.operation,
                user_id = %id,
                "User deleted"
            );
            Ok(HttpResponse::Ok().body(format!("Deleted user with {}", id)))
        }
        None => Err(AppError::NotFound(format!(
            "The database does not have a user with {}",
            id
        ))),
    }
}

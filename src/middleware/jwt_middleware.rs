/// JWT Authentication Middleware
///
/// Verifies the token presented with the request and injects the
/// `IdentityClaim` into request extensions for the route handlers.
///
/// The token is read from `Authorization: Bearer <token>`, or from a bare
/// `token` header for older clients.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::TokenIssuer;
use crate::error::{AppError, AuthError};

pub struct JwtMiddleware {
    issuer: TokenIssuer,
}

impl JwtMiddleware {
    pub fn new(issuer: TokenIssuer) -> Self {
        Self { issuer }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            issuer: self.issuer.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    issuer: TokenIssuer,
}

/// Pull the raw token out of the request headers
fn extract_token(req: &ServiceRequest) -> Option<String> {
    let headers = req.headers();

    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .or_else(|| headers.get("token").and_then(|h| h.to_str().ok()))
        .map(|token| token.trim().to_string())
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = match extract_token(&req) {
            Some(token) if !token.is_empty() => token,
            _ => {
                tracing::warn!(path = %req.path(), "Missing or invalid authentication header");
                let err: Error = AppError::Auth(AuthError::MissingToken).into();
                return Box::pin(async move { Err::<ServiceResponse<B>, Error>(err) });
            }
        };

        match self.issuer.verify(&token) {
            Ok(claim) => {
                tracing::debug!(user_id = %claim.subject_id, "JWT validated successfully");
                req.extensions_mut().insert(claim);

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(failure) => {
                tracing::warn!(reason = failure.reason(), "JWT validation failed");
                let err: Error = AppError::from(failure).into();
                Box::pin(async move { Err::<ServiceResponse<B>, Error>(err) })
            }
        }
    }
}

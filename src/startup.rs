use actix_web::dev::Server;
use actix_web::{error::JsonPayloadError, web, App, HttpRequest, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::error::{AppError, ValidationError};
use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::routes::{
    delete_user, edit_user, health_check, list_users, login, refresh, register, search_users,
};
use crate::store::UserStore;

/// Malformed JSON bodies get the same error shape as every other failure.
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    tracing::debug!(error = %err, "Rejected request body");
    AppError::Validation(ValidationError::InvalidFormat("request body".to_string())).into()
}

pub fn run(
    listener: TcpListener,
    store: Arc<dyn UserStore>,
    issuer: TokenIssuer,
) -> Result<Server, std::io::Error> {
    let store = web::Data::from(store);
    let issuer_data = web::Data::new(issuer.clone());

    let server = HttpServer::new(move || {
        let auth = || JwtMiddleware::new(issuer.clone());

        App::new()
            .wrap(LoggerMiddleware)
            .app_data(store.clone())
            .app_data(issuer_data.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/users")
                    // Public
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login))
                    // Token required
                    .service(web::resource("").wrap(auth()).route(web::get().to(list_users)))
                    .service(
                        web::resource("/search")
                            .wrap(auth())
                            .route(web::get().to(search_users)),
                    )
                    .service(
                        web::resource("/{id}/edit")
                            .wrap(auth())
                            .route(web::put().to(edit_user)),
                    )
                    .service(
                        web::resource("/{id}")
                            .wrap(auth())
                            .route(web::delete().to(delete_user)),
                    ),
            )
            .service(
                web::resource("/auth/refresh")
                    .wrap(auth())
                    .route(web::get().to(refresh)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}

pub mod admin;
pub mod interaction;
pub mod provider;

use actix_web::web;

/// Register every route except the catch-all, which belongs on the `App`
/// as its default service.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/interaction/{uid}")
            .route("", web::get().to(interaction::show))
            .route("/confirm", web::post().to(interaction::confirm))
            .route("/login", web::post().to(interaction::login)),
    )
    .route("/jwks", web::get().to(provider::jwks))
    .route("/health", web::get().to(admin::health))
    .route("/ready", web::get().to(admin::readiness))
    .route("/metrics", web::get().to(admin::system_metrics));
}

use crate::presentation::{auth, handlers};
use actix_web::web;

/// Registers every route. `/restaurants/new` precedes `/restaurants/{id}`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::list_restaurants))
        .route("/health", web::get().to(handlers::health_check))
        .service(
            web::resource("/restaurants")
                .route(web::get().to(handlers::list_restaurants))
                .route(web::post().to(handlers::create_restaurant)),
        )
        .route("/restaurants/new", web::get().to(handlers::new_restaurant))
        .service(
            web::resource("/restaurants/{id}")
                .route(web::get().to(handlers::show_restaurant))
                .route(web::patch().to(handlers::update_restaurant))
                .route(web::put().to(handlers::update_restaurant))
                .route(web::delete().to(handlers::delete_restaurant))
                .route(web::post().to(handlers::submit_restaurant)),
        )
        .route(
            "/restaurants/{id}/edit",
            web::get().to(handlers::edit_restaurant),
        )
        .service(
            web::resource("/users/sign_in")
                .route(web::get().to(auth::sign_in_form))
                .route(web::post().to(auth::sign_in)),
        )
        .route("/users/sign_up", web::get().to(auth::sign_up_form))
        .route("/users", web::post().to(auth::sign_up))
        .service(
            web::resource("/users/sign_out")
                .route(web::post().to(auth::sign_out))
                .route(web::delete().to(auth::sign_out)),
        );
}

//! Centralized route configuration for the Agora manager API.
//!
//! This module provides a shared function to configure all application
//! routes, allowing both the main server and test servers to use the same
//! routing setup.

use crate::{handlers, websocket};
use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health_check))
            .route("/questions", web::get().to(handlers::get_questions))
            .route("/questions", web::post().to(handlers::create_question))
            .route(
                "/questions/{id}/answers",
                web::get().to(handlers::get_answers),
            )
            .route(
                "/questions/{id}/answers",
                web::post().to(handlers::create_answer),
            ),
    )
    // WebSocket endpoint for the live board view
    .route("/ws", web::get().to(websocket::websocket_handler));
}

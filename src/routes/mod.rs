pub mod chat;
pub mod documents;
pub mod frontend;
pub mod index;
pub mod session;

use actix_web::web;

pub fn create_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/session").configure(session::create_routes))
        .service(web::scope("/documents").configure(documents::create_routes))
        .service(web::scope("/index").configure(index::create_routes))
        .service(web::scope("/chat").configure(chat::create_routes));
}

use actix_web::{web, HttpResponse};

use crate::error::AppResult;
use crate::AppState;

// GET /session - Current state, transcript size and index summary
async fn get_session(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let session = state.session.lock().await;
    Ok(HttpResponse::Ok().json(session.status()))
}

pub fn create_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("").route(web::get().to(get_session)));
}

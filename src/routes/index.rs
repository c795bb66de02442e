use actix_web::{web, HttpResponse};

use crate::error::AppResult;
use crate::AppState;

// POST /index/rebuild - Re-embed every document and replace the persisted index
async fn rebuild_index(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let mut session = state.session.lock().await;
    let report = session.rebuild().await?;
    Ok(HttpResponse::Ok().json(report))
}

pub fn create_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/rebuild").route(web::post().to(rebuild_index)));
}

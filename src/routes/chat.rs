use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::models::ChatMessage;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AskForm {
    pub question: String,
}

#[derive(Debug, Serialize)]
struct HistoryResponse<'a> {
    messages: &'a [ChatMessage],
}

// POST /chat - Answer a question from the indexed documents
async fn ask(state: web::Data<AppState>, form: web::Json<AskForm>) -> AppResult<HttpResponse> {
    let mut session = state.session.lock().await;
    let answer = session.ask(&form.question).await?;
    Ok(HttpResponse::Ok().json(answer))
}

// GET /chat/history - Transcript of this session, oldest first
async fn get_history(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let session = state.session.lock().await;
    Ok(HttpResponse::Ok().json(HistoryResponse {
        messages: session.history(),
    }))
}

pub fn create_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("").route(web::post().to(ask)))
        .service(web::resource("/history").route(web::get().to(get_history)));
}

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures::StreamExt;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::services::session::{stored_documents, StoredDocument, UploadedFile, UPLOAD_SAVED};
use crate::AppState;

#[derive(Debug, Serialize)]
struct UploadResponse {
    files: Vec<String>,
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct DocumentListResponse {
    data: Vec<StoredDocument>,
}

// GET /documents - Supported files in the documents directory
async fn list_documents(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let data = stored_documents(&state.config.data_dir)?;
    Ok(HttpResponse::Ok().json(DocumentListResponse { data }))
}

// POST /documents - Save uploaded PDF/TXT files; does not rebuild the index
async fn upload_documents(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> AppResult<HttpResponse> {
    let mut files = Vec::new();

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?;
        let content_disposition = field.content_disposition();
        let field_name = content_disposition
            .as_ref()
            .and_then(|cd| cd.get_name())
            .unwrap_or("");
        if field_name != "files" {
            continue;
        }

        let file_name = content_disposition
            .as_ref()
            .and_then(|cd| cd.get_filename())
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::BadRequest("File part without a filename".to_string()))?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| AppError::BadRequest(format!("Chunk error: {}", e)))?;
            bytes.extend_from_slice(&chunk);
        }

        files.push(UploadedFile { file_name, bytes });
    }

    let session = state.session.lock().await;
    let saved = session.save_uploads(files).await?;

    Ok(HttpResponse::Ok().json(UploadResponse {
        files: saved,
        message: UPLOAD_SAVED,
    }))
}

pub fn create_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("")
            .route(web::get().to(list_documents))
            .route(web::post().to(upload_documents)),
    );
}

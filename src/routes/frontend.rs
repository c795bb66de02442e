use actix_web::{http::header, web, HttpResponse};
use rust_embed::RustEmbed;

use crate::error::{AppError, AppResult};

/// Page assets compiled into the binary
#[derive(RustEmbed)]
#[folder = "static/"]
#[include = "*.html"]
#[include = "*.js"]
#[include = "*.css"]
struct Assets;

fn serve(path: &str) -> AppResult<HttpResponse> {
    let file = Assets::get(path).ok_or_else(|| AppError::NotFound(format!("Asset {}", path)))?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();

    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, mime.as_ref()))
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .body(file.data.into_owned()))
}

// GET / - Chat page
async fn index() -> AppResult<HttpResponse> {
    serve("index.html")
}

// GET /assets/{file} - Script and stylesheet for the page
async fn asset(path: web::Path<String>) -> AppResult<HttpResponse> {
    serve(&path.into_inner())
}

pub fn create_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/assets/{file}", web::get().to(asset));
}

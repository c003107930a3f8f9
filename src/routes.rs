use actix_files::NamedFile;
use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, get, post, web};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::{
    AppState,
    error::AppError,
    mailer::contact_email,
    models::contact::ContactSubmission,
    models::media::{MediaListResponse, MediaTreeResponse},
    optimize::{self, OptimizeQuery},
};

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(media_list)
        .service(media_tree)
        .service(database_all)
        .service(database_stats)
        .service(database_refresh)
        .service(database_image)
        .service(database_category)
        .service(contact)
        .service(serve_media)
        .default_service(web::route().to(not_found));
}

#[get("/api/health")]
async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "timestamp": Utc::now(),
        "environment": state.environment.as_str()
    }))
}

#[derive(Deserialize)]
struct ListQuery {
    #[serde(default)]
    path: String,
}

#[get("/api/media/list")]
async fn media_list(
    query: web::Query<ListQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let items = state.catalog.list_by_category(&query.path)?;
    Ok(HttpResponse::Ok().json(MediaListResponse {
        success: true,
        items,
    }))
}

#[get("/api/media/tree")]
async fn media_tree(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let tree = state.catalog.tree()?;
    Ok(HttpResponse::Ok().json(MediaTreeResponse {
        success: true,
        tree,
    }))
}

#[get("/api/database/all")]
async fn database_all(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let snapshot = state.snapshot.all()?;
    let stats = state.snapshot.stats()?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": { "images": snapshot.images, "stats": stats }
    })))
}

#[get("/api/database/category/{category:.*}")]
async fn database_category(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let category = path.into_inner();
    let images = state.snapshot.by_category(&category)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": { "category": category, "count": images.len(), "images": images }
    })))
}

#[get("/api/database/stats")]
async fn database_stats(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let stats = state.snapshot.stats()?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": stats })))
}

#[post("/api/database/refresh")]
async fn database_refresh(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let snapshot = state.snapshot.refresh()?;
    let total_files: usize = snapshot.images.values().map(Vec::len).sum();
    let categories: Vec<&String> = snapshot.images.keys().collect();
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Database refreshed successfully",
        "data": { "categories": categories, "totalFiles": total_files }
    })))
}

#[get("/api/database/image/{path:.*}")]
async fn database_image(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let rel = path.into_inner();
    let entry = state
        .snapshot
        .by_path(&rel)?
        .ok_or_else(|| AppError::NotFound(format!("image {rel}")))?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": entry })))
}

#[post("/api/contact")]
async fn contact(
    state: web::Data<AppState>,
    body: web::Json<ContactSubmission>,
) -> Result<HttpResponse, AppError> {
    let submission = body.into_inner();
    let errors = submission.validate();
    if !errors.is_empty() {
        warn!(count = errors.len(), "contact form validation failed");
        return Ok(HttpResponse::BadRequest().json(json!({
            "success": false,
            "message": "Validation failed",
            "errors": errors
        })));
    }

    info!(name = submission.name(), "new contact form submission");
    let mail = contact_email(&submission);
    let mailer = state.mailer.clone();
    web::block(move || mailer.send(&mail))
        .await
        .map_err(|err| AppError::Mail(err.to_string()))??;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Your message has been sent successfully!"
    })))
}

#[get("/media/{path:.*}")]
async fn serve_media(
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<OptimizeQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let rel = path.into_inner();
    let (_, absolute) = state.catalog.resolve(&rel)?;
    if !absolute.is_file() {
        return Err(AppError::NotFound(format!("media {rel}")));
    }

    if query.is_requested() && optimize::is_optimizable(&absolute) {
        let options = query.into_inner();
        let target = absolute.clone();
        match web::block(move || optimize::process(&target, &options)).await {
            Ok(Ok(optimized)) => {
                return Ok(HttpResponse::Ok()
                    .content_type(optimized.content_type)
                    .insert_header((header::CACHE_CONTROL, "public, max-age=31536000"))
                    .body(optimized.bytes));
            }
            // Optimization failure falls back to the untouched file.
            Ok(Err(err)) => warn!(error = %err, path = %rel, "image optimization failed"),
            Err(err) => warn!(error = %err, "optimizer worker failed"),
        }
    }

    let named = NamedFile::open_async(&absolute)
        .await?
        .use_last_modified(true)
        .prefer_utf8(true);
    let mut response = named.into_response(&req);
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("public, max-age=3600"),
    );
    Ok(response)
}

async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({
        "success": false,
        "message": "Route not found"
    }))
}

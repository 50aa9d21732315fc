// src/web/handlers.rs
use rocket::http::Status;
use rocket::serde::json::{Json, Value};
use rocket::State;
use tracing::{error, info, warn};

use crate::error::GenerateError;
use crate::generator::CvGenerator;
use crate::template_system::TemplateInfo;
use crate::types::NormalizationReport;
use crate::web::types::*;

pub type ApiError = (Status, Json<StandardErrorResponse>);

pub fn error_response(err: GenerateError) -> ApiError {
    let status = if err.is_client_error() {
        warn!("Rejected request: {}", err);
        Status::BadRequest
    } else {
        error!("Generation failed: {}", err);
        Status::InternalServerError
    };

    (
        status,
        Json(StandardErrorResponse::new(
            err.to_string(),
            err.code().to_string(),
            err.suggestions(),
        )),
    )
}

pub async fn generate_pdf_handler(
    body: Json<Value>,
    generator: &State<CvGenerator>,
) -> Result<PdfResponse, ApiError> {
    let document = generator
        .generate(&body.into_inner())
        .await
        .map_err(error_response)?;

    info!(
        "Serving {} ({} bytes, template {})",
        document.filename,
        document.pdf.len(),
        document.template_id
    );
    Ok(PdfResponse::with_filename(document.pdf, document.filename))
}

pub async fn normalize_handler(
    body: Json<Value>,
    profile: Option<String>,
    generator: &State<CvGenerator>,
) -> Result<Json<NormalizationReport>, ApiError> {
    let output = generator
        .normalize(&body.into_inner(), profile.as_deref())
        .await
        .map_err(error_response)?;

    let photo_key = generator
        .profiles()
        .get(profile.as_deref())
        .map(|p| p.photo.key.clone())
        .unwrap_or_else(|_| "photo".to_string());

    Ok(Json(NormalizationReport::from_output(&output, &photo_key)))
}

pub async fn templates_handler(
    generator: &State<CvGenerator>,
) -> Json<DataResponse<Vec<TemplateInfo>>> {
    let templates = generator.catalog().list();
    Json(DataResponse::success(
        format!("{} templates configured", templates.len()),
        templates,
    ))
}

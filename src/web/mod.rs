// src/web/mod.rs

pub mod handlers;
pub mod types;

pub use handlers::*;
pub use types::*;

use anyhow::Result;
use rocket::data::{Limits, ToByteUnit};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{Header, Status};
use rocket::serde::json::{Json, Value};
use rocket::{catchers, get, options, post, routes, Build, Request, Response, Rocket, State};
use tracing::info;

use crate::core::config_manager::{AppConfig, ServerConfig};
use crate::generator::CvGenerator;
use crate::template_system::TemplateInfo;
use crate::types::NormalizationReport;

// CORS Fairing
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new("Access-Control-Allow-Methods", "POST, GET, OPTIONS"));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
    }
}

#[get("/health")]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

#[post("/generate-pdf", data = "<body>")]
pub async fn generate_pdf(
    body: Json<Value>,
    generator: &State<CvGenerator>,
) -> Result<PdfResponse, ApiError> {
    handlers::generate_pdf_handler(body, generator).await
}

#[post("/normalize?<profile>", data = "<body>")]
pub async fn normalize(
    body: Json<Value>,
    profile: Option<String>,
    generator: &State<CvGenerator>,
) -> Result<Json<NormalizationReport>, ApiError> {
    handlers::normalize_handler(body, profile, generator).await
}

#[get("/templates")]
pub async fn templates(generator: &State<CvGenerator>) -> Json<DataResponse<Vec<TemplateInfo>>> {
    handlers::templates_handler(generator).await
}

#[options("/<_..>")]
pub async fn options() -> Status {
    Status::Ok
}

// Error catchers
#[rocket::catch(400)]
pub fn bad_request() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Invalid request format".to_string(),
        "BAD_REQUEST".to_string(),
        vec!["Send a JSON object as the request body".to_string()],
    ))
}

#[rocket::catch(413)]
pub fn payload_too_large() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Request body too large".to_string(),
        "PAYLOAD_TOO_LARGE".to_string(),
        vec!["Send the photo as a URL or compress it before encoding".to_string()],
    ))
}

#[rocket::catch(422)]
pub fn unprocessable() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Request body is not valid JSON".to_string(),
        "INVALID_JSON".to_string(),
        vec!["Check your request JSON format".to_string()],
    ))
}

#[rocket::catch(500)]
pub fn internal_error() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Internal server error".to_string(),
        "INTERNAL_ERROR".to_string(),
        vec!["Try again in a few moments".to_string()],
    ))
}

pub fn build_rocket(generator: CvGenerator, server: &ServerConfig) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("port", server.port))
        .merge(("address", server.address.clone()))
        .merge(("log_level", "off"))
        .merge((
            "limits",
            Limits::default().limit("json", server.json_limit_mib.mebibytes()),
        ));

    rocket::custom(figment)
        .attach(Cors)
        .manage(generator)
        .register(
            "/",
            catchers![bad_request, payload_too_large, unprocessable, internal_error],
        )
        .mount(
            "/",
            routes![health, generate_pdf, normalize, templates, options],
        )
}

pub async fn start_web_server(config: AppConfig) -> Result<()> {
    let generator = CvGenerator::from_config(&config)?;

    info!("Starting CV generator API on {}:{}", config.server.address, config.server.port);
    info!("Templates: {}", config.environment.templates_path.display());
    info!("Converter: {}", config.environment.soffice_path.display());
    info!("Known template ids: {:?}", generator.catalog().ids());

    let _rocket = build_rocket(generator, &config.server).launch().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::SofficeConverter;
    use crate::core::config_manager::ProfileSet;
    use crate::image_acquisition::{FetchConfig, ImageFetcher};
    use crate::template_processor::PptxRenderer;
    use crate::template_system::TemplateCatalog;
    use rocket::http::ContentType;
    use rocket::local::asynchronous::Client;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn client(dir: &TempDir) -> Client {
        let generator = CvGenerator::new(
            TemplateCatalog::load(dir.path()).unwrap(),
            ProfileSet::default(),
            ImageFetcher::new(&FetchConfig::default()).unwrap(),
            Arc::new(PptxRenderer::default()),
            Arc::new(SofficeConverter::new("/nonexistent/soffice", Duration::from_secs(5))),
        );
        Client::tracked(build_rocket(generator, &ServerConfig::default()))
            .await
            .unwrap()
    }

    #[rocket::async_test]
    async fn test_health() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir).await;
        let response = client.get("/health").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(
            response.headers().get_one("Access-Control-Allow-Origin"),
            Some("*")
        );
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body, rocket::serde::json::json!({"ok": true}));
    }

    #[rocket::async_test]
    async fn test_normalize_returns_complete_field_map() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir).await;
        let response = client
            .post("/normalize")
            .header(ContentType::JSON)
            .body(r#"{"data": {"name": "Ana", "skills_raw": "Rust, SQL"}}"#)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["shape"]["shape"], "enveloped");
        assert_eq!(body["fields"]["name"], "Ana");
        assert_eq!(body["fields"]["skill_2"], "SQL");
        assert_eq!(body["fields"]["exp_2_b3"], "");
        assert!(body["fields"]["photo"].is_null());
        assert_eq!(body["photo"]["source"], "absent");
    }

    #[rocket::async_test]
    async fn test_unknown_profile_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir).await;
        let response = client
            .post("/normalize?profile=wide")
            .header(ContentType::JSON)
            .body("{}")
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);
    }

    #[rocket::async_test]
    async fn test_unmapped_template_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir).await;
        let response = client
            .post("/generate-pdf")
            .header(ContentType::JSON)
            .body(r#"{"template_id": "99", "name": "Ana"}"#)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);

        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["error_code"], "TEMPLATE_CONFIG_ERROR");
        assert_eq!(body["success"], false);
    }

    #[rocket::async_test]
    async fn test_converter_failure_is_server_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("Plantilla_oficial_1_verde.pptx"),
            crate::template_processor::tests::build_pptx(
                &crate::template_processor::tests::slide_xml(""),
            ),
        )
        .unwrap();
        let client = client(&dir).await;
        let response = client
            .post("/generate-pdf")
            .header(ContentType::JSON)
            .body(r#"{"template_id": 1}"#)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::InternalServerError);

        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["error_code"], "CONVERSION_ERROR");
    }

    #[rocket::async_test]
    async fn test_templates_listing() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir).await;
        let body: Value = client
            .get("/templates")
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(body["data"].as_array().unwrap().len(), 4);
        assert_eq!(body["data"][0]["available"], false);
    }
}

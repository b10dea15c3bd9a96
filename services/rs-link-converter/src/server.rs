//!
//! src/server.rs  Andrew Belles  Oct 19th, 2026
//!
//! Thin http surface over the converter. POST /convert takes a link and
//! answers with the conversion result or an error object.
//!

use actix_web::{
    App, HttpRequest, HttpResponse, HttpServer, ResponseError,
    error::JsonPayloadError, http::StatusCode, route, web
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::converter::Converter;
use crate::errors::{ConvertError, ServiceError};

/// A missing or null `link` is classified as an empty one
#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub resolve: bool
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: String
}

impl From<&ConvertError> for ErrorBody {
    fn from(e: &ConvertError) -> Self {
        Self { error: e.to_string(), kind: e.kind().to_string() }
    }
}

impl ResponseError for ConvertError {
    fn status_code(&self) -> StatusCode {
        match self {
            ConvertError::InvalidLink(_)            => StatusCode::BAD_REQUEST,
            ConvertError::MetadataFetch { .. }      => StatusCode::BAD_GATEWAY,
            ConvertError::MetadataIncomplete { .. } => StatusCode::BAD_GATEWAY,
            ConvertError::QueryExtraction(_)        => StatusCode::UNPROCESSABLE_ENTITY,
            ConvertError::CandidateNotFound { .. }  => StatusCode::NOT_FOUND
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody::from(self))
    }
}

#[route("/convert", method = "POST")]
async fn convert(
    converter: web::Data<Converter>,
    body: web::Json<ConvertRequest>
) -> Result<HttpResponse, ConvertError> {
    let link = body.link.as_deref().unwrap_or_default();
    let result = if body.resolve {
        converter.convert_scored(link).await?
    } else {
        converter.convert(link).await?
    };
    Ok( HttpResponse::Ok().json(result) )
}

#[route("/health", method = "GET")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "healthy": true }))
}

/// Bodies that do not deserialize answer like any other invalid link
fn payload_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    warn!(error = %err, "http.payload");
    ConvertError::InvalidLink(format!("unreadable request body: {err}")).into()
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(payload_error))
        .service(convert)
        .service(health);
}

pub async fn serve(converter: Converter, cfg: ServerConfig) -> Result<(), ServiceError> {
    info!(bind = %cfg.bind_addr, "server.start");

    let data = web::Data::new(converter);
    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .configure(routes)
    })
    .bind(cfg.bind_addr)?
    .run()
    .await?;

    info!("server.stop");
    Ok(())
}

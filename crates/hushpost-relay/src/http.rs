//! Relay HTTP surface
//!
//! Two mail routes plus a banner/probe on the root. Every response is HTTP
//! 200 with a `{result, return}` body; the return code is the protocol
//! verdict. Oversized and malformed bodies are rejected while the payload is
//! read, before any handler runs.

use actix_web::error::JsonPayloadError;
use actix_web::{web, HttpResponse};
use std::sync::Arc;
use tracing::debug;

use hushpost_proto::{ApiResponse, ProbeRequest, RecvRequest, ReturnCode, SendRequest};

use crate::service::{AcceptOutcome, RelayService};

/// Shared application state
pub struct AppState {
    /// The relay core behind every route
    pub service: Arc<RelayService>,
}

/// Register the relay's routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/", web::post().to(probe))
        .route("/email/send", web::post().to(send_email))
        .route("/email/recv", web::post().to(recv_email))
        .route("/email/send", web::to(bad_method))
        .route("/email/recv", web::to(bad_method));
}

/// JSON extractor config: size bound plus protocol-shaped rejections
pub fn json_config(max_request_bytes: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(max_request_bytes)
        .error_handler(|err, _req| {
            let code = match &err {
                JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
                    ReturnCode::Oversized
                }
                _ => ReturnCode::MalformedRequest,
            };
            let body = ApiResponse::error(code, err.to_string());
            actix_web::error::InternalError::from_response(err, HttpResponse::Ok().json(body))
                .into()
        })
}

/// Service banner
async fn index() -> HttpResponse {
    HttpResponse::Ok().body("hushpost relay\n")
}

/// Connection probe against the relay's inbound secret
async fn probe(state: web::Data<AppState>, req: web::Json<ProbeRequest>) -> HttpResponse {
    if state.service.probe(&req.mac) {
        HttpResponse::Ok().json(ApiResponse::ok("ok"))
    } else {
        HttpResponse::Ok().json(ApiResponse::error(ReturnCode::FailedMac, "failed MAC"))
    }
}

/// Accept an envelope for a recipient
async fn send_email(state: web::Data<AppState>, req: web::Json<SendRequest>) -> HttpResponse {
    debug!("send for {}", req.recipient);

    match state
        .service
        .accept(&req.recipient, &req.envelope, req.mac.as_deref())
    {
        Ok(AcceptOutcome::Stored) => HttpResponse::Ok().json(ApiResponse::ok("ok")),
        Ok(AcceptOutcome::Duplicate) => {
            HttpResponse::Ok().json(ApiResponse::ok("already delivered"))
        }
        Err(err) => {
            debug!("send rejected: {}", err);
            HttpResponse::Ok().json(ApiResponse::error(err.return_code(), err.to_string()))
        }
    }
}

/// Mailbox size (ordinal 0) or one envelope (ordinal >= 1)
async fn recv_email(state: web::Data<AppState>, req: web::Json<RecvRequest>) -> HttpResponse {
    debug!("recv ordinal {} for {}", req.ordinal, req.recipient);

    if req.ordinal == 0 {
        return match state.service.size(&req.recipient) {
            Ok(size) => HttpResponse::Ok().json(ApiResponse::ok(size.to_string())),
            Err(err) => {
                HttpResponse::Ok().json(ApiResponse::error(err.return_code(), err.to_string()))
            }
        };
    }

    match state.service.fetch(&req.recipient, req.ordinal) {
        Ok(Some(envelope)) => HttpResponse::Ok().json(ApiResponse::ok(envelope)),
        Ok(None) => HttpResponse::Ok().json(ApiResponse::error(ReturnCode::NoData, "no data")),
        Err(err) => HttpResponse::Ok().json(ApiResponse::error(err.return_code(), err.to_string())),
    }
}

/// Known route, unsupported method
async fn bad_method() -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::error(ReturnCode::BadMethod, "bad method"))
}

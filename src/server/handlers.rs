//! Control API handlers
//!
//! Every route takes its parameters from the query string. Failures are
//! returned as [`ControlError`], which renders as
//! `{"error": <code>, "message": <text>}` with the matching status.

use crate::control::{ControlError, Controller};
use crate::fetch::MAX_RECORD_SIZE_PER_PAGE;
use crate::state::ProcessKind;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;

impl ResponseError for ControlError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(ControlError::status_code(self)).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(ResponseError::status_code(self)).json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }))
    }
}

#[derive(Debug, Deserialize)]
pub struct StartParams {
    #[serde(rename = "type")]
    kind: Option<String>,
    read_dir: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProcessParams {
    pid: Option<String>,
    show_records: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AppParams {
    app_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionParams {
    coln: Option<String>,
    catg: Option<String>,
    page: Option<String>,
    results: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    token: Option<String>,
    page: Option<String>,
    results: Option<String>,
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ControlError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ControlError::MissingParam(name))
}

fn number(value: Option<String>, name: &'static str, default: usize) -> Result<usize, ControlError> {
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ControlError::InvalidParam {
            param: name,
            value: raw,
        }),
    }
}

fn show_records(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// Serializes `body` and tags it with a `message` field
fn with_message(message: &str, body: &impl Serialize) -> Value {
    let mut value = serde_json::to_value(body).unwrap_or_else(|_| json!({}));
    if let Value::Object(map) = &mut value {
        map.insert("message".to_string(), Value::String(message.to_string()));
    }
    value
}

pub async fn start(
    controller: web::Data<Controller>,
    params: web::Query<StartParams>,
) -> Result<HttpResponse, ControlError> {
    let params = params.into_inner();
    let raw = required(params.kind, "type")?;
    let kind = ProcessKind::from_param(&raw).ok_or(ControlError::InvalidParam {
        param: "type",
        value: raw,
    })?;
    let read_dir = params.read_dir.filter(|d| !d.is_empty()).map(PathBuf::from);

    let started = controller.start(kind, read_dir)?;
    Ok(HttpResponse::Ok().json(with_message("process_started", &started)))
}

pub async fn stop(
    controller: web::Data<Controller>,
    params: web::Query<ProcessParams>,
) -> Result<HttpResponse, ControlError> {
    let params = params.into_inner();
    let show = show_records(params.show_records.as_deref());
    let pid = required(params.pid, "pid")?;

    let snapshot = controller.stop(&pid, show).await?;
    Ok(HttpResponse::Ok().json(with_message("process_stopped", &snapshot)))
}

pub async fn peek(
    controller: web::Data<Controller>,
    params: web::Query<ProcessParams>,
) -> Result<HttpResponse, ControlError> {
    let params = params.into_inner();
    let show = show_records(params.show_records.as_deref());
    let pid = required(params.pid, "pid")?;

    let snapshot = controller.peek(&pid, show).await?;
    Ok(HttpResponse::Ok().json(with_message("process_peeked", &snapshot)))
}

pub async fn flush(
    controller: web::Data<Controller>,
    params: web::Query<ProcessParams>,
) -> Result<HttpResponse, ControlError> {
    let pid = required(params.into_inner().pid, "pid")?;
    controller.flush(&pid).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "process_flushed" })))
}

pub async fn view(controller: web::Data<Controller>) -> Result<HttpResponse, ControlError> {
    let processes = controller.view().await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "processes_viewed",
        "processes": processes,
    })))
}

pub async fn detail(
    controller: web::Data<Controller>,
    params: web::Query<AppParams>,
) -> Result<HttpResponse, ControlError> {
    let app_id = required(params.into_inner().app_id, "app_id")?;
    let record = controller.fetcher().details(&app_id).await?;
    Ok(HttpResponse::Ok().json(record))
}

pub async fn collection(
    controller: web::Data<Controller>,
    params: web::Query<CollectionParams>,
) -> Result<HttpResponse, ControlError> {
    let params = params.into_inner();
    let coln = required(params.coln, "coln")?;
    let catg = params.catg.unwrap_or_default();
    let page = number(params.page, "page", 0)?;
    let results = number(params.results, "results", MAX_RECORD_SIZE_PER_PAGE)?;

    let records = controller
        .fetcher()
        .collection(&coln, &catg, page, results)
        .await?;
    Ok(HttpResponse::Ok().json(records))
}

pub async fn similar(
    controller: web::Data<Controller>,
    params: web::Query<AppParams>,
) -> Result<HttpResponse, ControlError> {
    let app_id = required(params.into_inner().app_id, "app_id")?;
    let records = controller.fetcher().similar(&app_id).await?;
    Ok(HttpResponse::Ok().json(records))
}

pub async fn search(
    controller: web::Data<Controller>,
    params: web::Query<SearchParams>,
) -> Result<HttpResponse, ControlError> {
    let params = params.into_inner();
    let token = required(params.token, "token")?;
    let page = number(params.page, "page", 0)?;
    let results = number(params.results, "results", MAX_RECORD_SIZE_PER_PAGE)?;

    let records = controller.fetcher().search(&token, page, results).await?;
    Ok(HttpResponse::Ok().json(records))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_records_flag() {
        assert!(show_records(Some("true")));
        assert!(show_records(Some("TRUE")));
        assert!(!show_records(Some("1")));
        assert!(!show_records(None));
    }

    #[test]
    fn test_required_rejects_blank() {
        assert!(matches!(
            required(Some("  ".into()), "pid"),
            Err(ControlError::MissingParam("pid"))
        ));
        assert_eq!(required(Some("abc".into()), "pid").unwrap(), "abc");
    }

    #[test]
    fn test_number_parsing() {
        assert_eq!(number(None, "page", 3).unwrap(), 3);
        assert_eq!(number(Some("7".into()), "page", 0).unwrap(), 7);
        assert!(matches!(
            number(Some("x".into()), "page", 0),
            Err(ControlError::InvalidParam { param: "page", .. })
        ));
    }

    #[test]
    fn test_with_message_merges_fields() {
        let value = with_message("process_started", &json!({"process_id": "abc"}));
        assert_eq!(value["message"], "process_started");
        assert_eq!(value["process_id"], "abc");
    }

    #[test]
    fn test_error_body() {
        let response = ControlError::NotFound("abc".into()).error_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

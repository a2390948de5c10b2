use crate::{
    cost,
    error::{Constraint, RelayError, Result, ValidationError},
    models::{EditResponse, GenerateBody, GenerateResponse},
    producer::with_deadline,
    server::{bridge, multipart::read_edit_form, AppState, MAX_JSON_BODY},
    validation::{validate_edit, validate_generate},
};
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, ResponseError};
use bytes::BytesMut;
use futures::StreamExt;
use serde_json::json;
use std::time::Instant;
use uuid::Uuid;

/// `POST /api/generate`
pub async fn generate(state: web::Data<AppState>, payload: web::Payload) -> Result<HttpResponse> {
    state.config.check_credentials().map_err(log_config_error)?;

    let body = read_body(payload, MAX_JSON_BODY).await?;
    let body: GenerateBody = serde_json::from_slice(&body).map_err(|e| {
        RelayError::from(
            ValidationError::new(Constraint::Body, "Invalid request body")
                .with_detail(e.to_string()),
        )
    })?;
    let request = validate_generate(body).map_err(|e| {
        log::warn!("Generate request rejected: {}", e);
        e
    })?;

    let request_id = Uuid::new_v4();
    log::info!(
        "[{}] generate model={} quality={} size={} format={} stream={} prompt='{}'",
        request_id,
        request.model,
        request.quality,
        request.size,
        request.output_format,
        request.stream,
        request.prompt_preview()
    );

    if request.stream {
        return Ok(bridge::stream_response(
            state.producer.clone(),
            request,
            state.upstream_deadline(),
        ));
    }

    let output = with_deadline(state.upstream_deadline(), state.producer.generate(&request))
        .await
        .map_err(|e| {
            log::error!("[{}] generate failed: {}", request_id, e);
            e
        })?;

    let estimated_cost = cost::estimate(request.model, &request.quality);
    log::info!(
        "[{}] generate done, estimated cost {}",
        request_id,
        cost::format_cost(estimated_cost)
    );

    Ok(HttpResponse::Ok().json(GenerateResponse {
        image_data: output.image_data,
        estimated_cost,
        model: request.model,
        transparent: request.params.transparent(),
        quality: request.quality,
        size: request.size,
        output_format: request.output_format,
    }))
}

/// `POST /api/edit`
pub async fn edit(state: web::Data<AppState>, payload: Multipart) -> Result<HttpResponse> {
    state.config.check_credentials().map_err(log_config_error)?;

    let limits = &state.config.limits;
    let form = read_edit_form(payload, limits).await?;
    let request = validate_edit(form, limits).map_err(|e| {
        log::warn!("Edit request rejected: {}", e);
        e
    })?;

    let request_id = Uuid::new_v4();
    log::info!(
        "[{}] edit images={} main={} ({}) mask={} quality={} size={} prompt='{}'",
        request_id,
        request.image_count(),
        request.main_image.declared_type(),
        request.main_image.size_mb(),
        request.mask.is_some(),
        request.base.quality,
        request.base.size,
        request.base.prompt_preview()
    );

    let output = with_deadline(state.upstream_deadline(), state.producer.edit(&request))
        .await
        .map_err(|e| {
            log::error!("[{}] edit failed: {}", request_id, e);
            e
        })?;

    let estimated_cost = cost::estimate_edit(&request.base.quality);
    log::info!(
        "[{}] edit done, estimated cost {}",
        request_id,
        cost::format_cost(estimated_cost)
    );

    Ok(HttpResponse::Ok().json(EditResponse {
        image_data: output.image_data,
        estimated_cost,
        usage: output.usage,
    }))
}

/// `GET /api/health-check` and `GET /api/test-openai`
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    if let Err(e) = state.config.check_credentials() {
        return log_config_error(e).error_response();
    }

    let started = Instant::now();
    match with_deadline(state.upstream_deadline(), state.producer.health_check()).await {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => {
            log::error!("Upstream health check failed: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "success": false,
                "error": "OpenAI API test failed",
                "message": e.to_string(),
                "kind": e.kind(),
                "responseTime": format!("{}ms", started.elapsed().as_millis()),
            }))
        }
    }
}

/// Buffer the request body, refusing anything past `limit` bytes.
async fn read_body(mut payload: web::Payload, limit: usize) -> Result<BytesMut> {
    let mut body = BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| {
            RelayError::from(
                ValidationError::new(Constraint::Body, "Invalid request body")
                    .with_detail(e.to_string()),
            )
        })?;
        if body.len() + chunk.len() > limit {
            return Err(ValidationError::new(Constraint::Body, "Request body too large")
                .with_detail(format!("Bodies are limited to {}", crate::config::format_size(limit)))
                .into());
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

fn log_config_error(e: RelayError) -> RelayError {
    log::error!("Rejecting request: {}", e);
    e
}

//! Turns one batch producer call into the staged NDJSON event stream:
//! `starting`, `generating`, then either `progress` + `complete` or a
//! single terminal `error`.

use crate::{
    cost,
    error::RelayError,
    models::{GenerationRequest, ImageOutput, StreamEvent, UNKNOWN_STREAM_ERROR},
    producer::{with_deadline, ImageProducer},
};
use actix_web::{http::header, HttpResponse};
use futures::{FutureExt, Stream, StreamExt};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Events are handed over one at a time; a slow reader holds back the stages.
const EVENT_BUFFER: usize = 1;

/// Spawn the staged generation and return its events in emission order.
pub fn event_stream(
    producer: Arc<dyn ImageProducer>,
    request: GenerationRequest,
    deadline: Duration,
) -> impl Stream<Item = StreamEvent> {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    tokio::spawn(async move {
        run_stages(producer, request, deadline, tx).await;
    });
    ReceiverStream::new(rx)
}

pub fn stream_response(
    producer: Arc<dyn ImageProducer>,
    request: GenerationRequest,
    deadline: Duration,
) -> HttpResponse {
    let body = event_stream(producer, request, deadline)
        .map(|event| Ok::<_, actix_web::Error>(event.to_line()));

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(body)
}

async fn run_stages(
    producer: Arc<dyn ImageProducer>,
    request: GenerationRequest,
    deadline: Duration,
    tx: mpsc::Sender<StreamEvent>,
) {
    for stage in [StreamEvent::Starting, StreamEvent::Generating] {
        if tx.send(stage).await.is_err() {
            log::debug!("Stream reader went away before the upstream call");
            return;
        }
    }

    let call = with_deadline(deadline, producer.generate(&request));
    let outcome = match AssertUnwindSafe(call).catch_unwind().await {
        Ok(result) => result,
        Err(_) => Err(RelayError::Internal(UNKNOWN_STREAM_ERROR.to_string())),
    };

    let events = match outcome {
        Ok(output) => {
            log::info!("Streamed image ready ({} base64 chars)", output.image_data.len());
            vec![progress_event(&request, output), StreamEvent::Complete]
        }
        Err(e) => {
            log::error!("Streamed generation failed: {}", e);
            vec![StreamEvent::error(e.user_message())]
        }
    };

    for event in events {
        if tx.send(event).await.is_err() {
            log::debug!("Stream reader went away before the final event");
            return;
        }
    }
}

pub fn progress_event(request: &GenerationRequest, output: ImageOutput) -> StreamEvent {
    StreamEvent::Progress {
        image_data: output.image_data,
        estimated_cost: cost::estimate(request.model, &request.quality),
        model: Some(request.model.to_string()),
        quality: Some(request.quality.to_string()),
        size: Some(request.size.to_string()),
        output_format: Some(request.output_format.to_string()),
        transparent: Some(request.params.transparent()),
    }
}

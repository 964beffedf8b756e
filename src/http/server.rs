//! HTTP server setup and the run handler.
//!
//! # Responsibilities
//! - Build the Axum router: `POST /run` plus a 404 fallback for everything
//!   else (including other methods on `/run`)
//! - Stream the request body chunk by chunk into a `StreamingSession`
//! - Serialize device access: one request holds the pair from its first
//!   body chunk until its response is built
//! - Run the blocking hardware handshake without stalling the executor
//!
//! # Design Decisions
//! - The session writes straight into the input device buffer, so the pair
//!   mutex is held for the whole request, not just the run
//! - `DevicePair::run` blocks its thread; `block_in_place` keeps the rest
//!   of the worker pool servicing other connections meanwhile
//! - Responses are fully buffered; the response module owns their shape

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::response::Response;
use axum::routing::post;
use axum::Router;
use futures_util::StreamExt;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use crate::device::DevicePair;
use crate::protocol::frame::{frame_response, ResponseHeader};
use crate::protocol::session::{DeviceLimits, SessionEnd, StreamingSession};

use super::request::RequestId;
use super::response;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// The single device pair, serialized across all requests.
    pair: Arc<Mutex<DevicePair>>,
}

/// HTTP server for the sampler/player bridge.
pub struct BridgeServer {
    router: Router,
}

impl BridgeServer {
    /// Build the router around the device pair.
    pub fn new(pair: DevicePair) -> Self {
        let state = AppState {
            pair: Arc::new(Mutex::new(pair)),
        };

        let router = Router::new()
            .route("/run", post(run_handler).fallback(fallback_handler))
            .fallback(fallback_handler)
            .with_state(state)
            .layer(TraceLayer::new_for_http());

        Self { router }
    }

    /// Serve until the shutdown future resolves.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Everything that is not `POST /run` gets the fixed 404 page.
async fn fallback_handler() -> Response {
    response::not_found()
}

/// The one RPC: stream the body into the input buffer, run the pair,
/// return the framed capture.
async fn run_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = RequestId::new();

    // Exclusive device access for the whole session: body chunks land
    // directly in the input device buffer.
    let mut pair = state.pair.lock().await;
    let pair = &mut *pair;

    let mut session = StreamingSession::new(DeviceLimits::from(pair.input().metadata()));
    let mut body = request.into_body().into_data_stream();

    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(chunk) => session.feed(&chunk, pair.inputs_mut()),
            Err(err) => {
                tracing::warn!(request_id = %request_id, error = %err, "body stream aborted");
                return response::bad_request();
            }
        }
    }

    match session.finish(pair.inputs_mut()) {
        SessionEnd::BadRequest => {
            tracing::debug!(request_id = %request_id, "malformed request body");
            response::bad_request()
        }
        SessionEnd::RunReady => {
            tracing::debug!(
                request_id = %request_id,
                input_bytes = session.cursor(),
                "input staged, running device pair"
            );

            match tokio::task::block_in_place(|| pair.run()) {
                Ok(()) => {
                    let meta = pair.output().metadata();
                    let header = ResponseHeader {
                        time_length: meta.time_length,
                        sample_width: meta.sample_width,
                    };
                    tracing::debug!(
                        request_id = %request_id,
                        output_bytes = pair.outputs().len(),
                        "run complete"
                    );
                    response::capture(frame_response(header, pair.outputs()))
                }
                Err(err) => {
                    tracing::error!(request_id = %request_id, error = %err, "hardware run failed");
                    response::internal_error()
                }
            }
        }
    }
}

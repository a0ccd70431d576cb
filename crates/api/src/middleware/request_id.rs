use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use nanoid::nanoid;
use tracing::{info_span, Instrument};

use crate::state::RequestId;

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Stamps each request with an id, available to handlers as an
/// `Extension<RequestId>` and echoed back in `X-Request-Id`. Log lines
/// emitted while handling the request carry it too.
pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
    let request_id = format!("req_{}", nanoid!(16));
    req.extensions_mut().insert(RequestId(request_id.clone()));

    let span = info_span!("request", request_id = %request_id, path = %req.uri().path());
    let mut resp = next.run(req).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        resp.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    resp
}

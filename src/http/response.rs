//! Response construction.
//!
//! The bridge's responses are deliberately rigid: fixed `text/html` pages
//! for every error class, and a single buffered `application/octet-stream`
//! body for a successful capture. Nothing is streamed.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

fn error_page(status: StatusCode, title: &str) -> Response {
    let body = format!("<html><body><h1>{title}</h1></body></html>\n");
    (status, [(header::CONTENT_TYPE, "text/html")], body).into_response()
}

/// 400 for malformed request bodies.
pub fn bad_request() -> Response {
    error_page(StatusCode::BAD_REQUEST, "Bad Request")
}

/// 404 for any route or method other than `POST /run`.
pub fn not_found() -> Response {
    error_page(StatusCode::NOT_FOUND, "Not Found")
}

/// 500 for failed hardware transactions.
pub fn internal_error() -> Response {
    error_page(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}

/// 200 with the framed capture buffer.
pub fn capture(body: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/octet-stream")],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_pages() {
        let resp = bad_request();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/html");

        assert_eq!(not_found().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            internal_error().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_capture_content_type() {
        let resp = capture(vec![1, 2, 3]);
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            "application/octet-stream"
        );
    }
}

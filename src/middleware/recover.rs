//! Recovery and failure logging — the outermost pipeline stage.
//!
//! Two failure paths converge here:
//! - a panic anywhere in the chain is caught, logged, and turned into a
//!   generic 500
//! - a server-side `AppError` arrives as a 500 response carrying its detail
//!   in an [`ErrorDetail`] extension, which is logged and stripped here
//!
//! Either way the client sees nothing but the generic body, the log gets
//! exactly one structured entry with the request method and URI, and the
//! connection is marked non-reusable so a corrupted keep-alive stream is
//! never served again. A request that exceeds its deadline is answered by
//! the timeout layer beneath this one and follows the same rules.

use axum::extract::Request;
use axum::http::header::{HeaderValue, CONNECTION};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;

use crate::error::ErrorDetail;

fn panic_detail(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

fn close_connection(response: &mut Response) {
    response
        .headers_mut()
        .insert(CONNECTION, HeaderValue::from_static("close"));
}

pub async fn recover(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let mut response = match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            let detail = panic_detail(panic);
            tracing::error!(method = %method, uri = %uri, error = %detail, "request failed");

            let mut response =
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
            close_connection(&mut response);
            return response;
        }
    };

    if let Some(ErrorDetail(detail)) = response.extensions_mut().remove::<ErrorDetail>() {
        tracing::error!(method = %method, uri = %uri, error = %detail, "request failed");
        close_connection(&mut response);
    }

    response
}

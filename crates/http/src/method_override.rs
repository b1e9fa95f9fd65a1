//! `POST /path?_method=PUT` dispatch for HTML forms, which can only GET and POST.
//!
//! Applied around the whole router so the rewritten method takes part in routing.

use axum::{extract::Request, http::Method};

pub const OVERRIDE_PARAM: &str = "_method";

/// Rewrite a POST to the method named by its `_method` query parameter
pub async fn rewrite_method(mut request: Request) -> Request {
    if request.method() == Method::POST {
        if let Some(method) = override_from_query(request.uri().query()) {
            tracing::debug!(%method, uri = %request.uri(), "method override");
            *request.method_mut() = method;
        }
    }
    request
}

fn override_from_query(query: Option<&str>) -> Option<Method> {
    let value = query?.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == OVERRIDE_PARAM).then_some(value)
    })?;

    match value.to_ascii_uppercase().as_str() {
        "PUT" => Some(Method::PUT),
        "PATCH" => Some(Method::PATCH),
        "DELETE" => Some(Method::DELETE),
        _ => None,
    }
}

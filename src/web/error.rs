use actix_web::dev::ServiceResponse;
use actix_web::http::header;
use actix_web::middleware::ErrorHandlerResponse;
use actix_web::{HttpResponse, Result};
use serde_json::json;

/// Whether a handler already rendered its own JSON error body.
fn has_json_body<B>(res: &ServiceResponse<B>) -> bool {
    res.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |ct| ct.starts_with("application/json"))
}

fn render_json<B>(
    res: ServiceResponse<B>,
    message: &str,
    detailed: bool,
) -> Result<ErrorHandlerResponse<B>> {
    if has_json_body(&res) {
        return Ok(ErrorHandlerResponse::Response(res.map_into_left_body()));
    }

    let status = res.status();
    // Extractor failures carry a more useful message than the generic one.
    let message = res
        .response()
        .error()
        .filter(|_| detailed)
        .map(|e| e.to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| message.to_owned());
    let (req, _) = res.into_parts();
    let response = HttpResponse::build(status).json(json!({ "error": message }));
    Ok(ErrorHandlerResponse::Response(
        ServiceResponse::new(req, response).map_into_right_body(),
    ))
}

pub fn render_400<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    render_json(res, "Bad request", true)
}

pub fn render_404<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    render_json(res, "Not found", true)
}

pub fn render_500<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    render_json(res, "Internal server error", false)
}

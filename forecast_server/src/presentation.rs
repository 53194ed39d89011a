//! Turns the current readiness state into pages and API responses.
//!
//! Nothing here waits for, or starts, a forecast computation: every function
//! renders whatever state snapshot it is given.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use demand_forecast::{ForecastResult, ReadinessState, ReadinessStatus};
use serde::Serialize;
use tracing::warn;

/// Page-global variable the dashboard script reads its data from
pub const FORECAST_GLOBAL: &str = "window.__FORECAST_DATA__";

/// Seconds a client should wait before asking again after a failure
pub const RETRY_AFTER_SECS: u64 = 30;

/// Body of `GET /forecast/status`
#[derive(Debug, Serialize)]
pub struct StatusBody<'a> {
    pub status: ReadinessStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
}

/// Body returned while the forecast is not available
#[derive(Debug, Serialize)]
pub struct PendingBody<'a> {
    pub status: ReadinessStatus,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
}

/// Response envelope of the legacy prediction endpoint
#[derive(Debug, Serialize)]
pub struct PredictSalesBody<'a> {
    pub status: &'static str,
    pub message: &'static str,
    pub data: &'a ForecastResult,
}

/// Status summary for polling
pub fn status_body(state: &ReadinessState) -> StatusBody<'_> {
    StatusBody {
        status: state.status(),
        error: state.error(),
    }
}

/// The forecast as JSON: `200` when ready, `202` while computing, `503` on failure
pub fn forecast_response(state: &ReadinessState) -> Response {
    match state {
        ReadinessState::Ready(result) => (StatusCode::OK, Json(result)).into_response(),
        _ => pending_response(state),
    }
}

/// The forecast in the legacy `{status, message, data}` envelope
pub fn predict_sales_response(state: &ReadinessState) -> Response {
    match state {
        ReadinessState::Ready(result) => Json(PredictSalesBody {
            status: "successfull",
            message: "Forecast generated successfully",
            data: result,
        })
        .into_response(),
        _ => pending_response(state),
    }
}

fn pending_response(state: &ReadinessState) -> Response {
    match state {
        ReadinessState::Error(message) => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::RETRY_AFTER, RETRY_AFTER_SECS.to_string())],
            Json(PendingBody {
                status: ReadinessStatus::Error,
                message: "Forecast is unavailable. Retry later.",
                error: Some(message),
            }),
        )
            .into_response(),
        _ => (
            StatusCode::ACCEPTED,
            Json(PendingBody {
                status: ReadinessStatus::Computing,
                message: "Forecast is being computed. Try again shortly.",
                error: None,
            }),
        )
            .into_response(),
    }
}

/// Inject the forecast (or `null`) into a page as [`FORECAST_GLOBAL`].
///
/// The assignment has to run before any page script reads it, so it goes
/// right before `</head>`. Without a head it goes before the first `<script`,
/// then before the last `</body>`, and finally at the end of the template.
pub fn render_page(template: &str, state: &ReadinessState) -> String {
    let data = state
        .forecast()
        .and_then(|result| match serde_json::to_string(result) {
            Ok(json) => Some(json),
            Err(e) => {
                warn!(error = %e, "Could not embed forecast in page");
                None
            }
        })
        // Keep the JSON from closing the script element
        .map(|json| json.replace("</", "<\\/"))
        .unwrap_or_else(|| "null".to_string());

    let script = format!("<script>{} = {};</script>\n", FORECAST_GLOBAL, data);

    let insert_at = template
        .find("</head>")
        .or_else(|| template.find("<script"))
        .or_else(|| template.rfind("</body>"));

    match insert_at {
        Some(index) => {
            let mut html = String::with_capacity(template.len() + script.len());
            html.push_str(&template[..index]);
            html.push_str(&script);
            html.push_str(&template[index..]);
            html
        }
        None => format!("{}{}", template, script),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use demand_forecast::forecast::dates_after;
    use pretty_assertions::assert_eq;

    fn ready() -> ReadinessState {
        let dates = dates_after("2016-04-24".parse().unwrap(), 2).unwrap();
        ReadinessState::Ready(ForecastResult::from_values(&dates, &[10.0, 20.0]).unwrap())
    }

    #[test]
    fn test_render_page_embeds_forecast() {
        let html = render_page("<html><body><h1>Dashboard</h1></body></html>", &ready());

        assert!(html.starts_with("<html><body><h1>Dashboard</h1><script>window.__FORECAST_DATA__ = {"));
        assert!(html.contains("\"predicted_sales\":10.0"));
        assert!(html.ends_with("</script>\n</body></html>"));
    }

    #[test]
    fn test_render_page_embeds_null_while_computing() {
        let html = render_page("<body></body>", &ReadinessState::Computing);
        assert_eq!(html, "<body><script>window.__FORECAST_DATA__ = null;</script>\n</body>");

        let html = render_page("<body></body>", &ReadinessState::Error("fit failed".to_string()));
        assert!(html.contains("window.__FORECAST_DATA__ = null;"));
        assert!(!html.contains("fit failed"));
    }

    #[test]
    fn test_render_page_without_body_tag() {
        let html = render_page("<p>bare</p>", &ReadinessState::Computing);
        assert_eq!(html, "<p>bare</p><script>window.__FORECAST_DATA__ = null;</script>\n");
    }

    #[test]
    fn test_render_page_uses_last_body_tag() {
        let template = "<body><pre>&lt;/body&gt; </body></pre></body>";
        let html = render_page(template, &ReadinessState::Computing);
        assert!(html.ends_with("</pre><script>window.__FORECAST_DATA__ = null;</script>\n</body>"));
    }

    #[test]
    fn test_render_page_prefers_head() {
        let template = "<html><head><title>t</title></head><body><script>read()</script></body></html>";
        let html = render_page(template, &ReadinessState::Computing);
        assert_eq!(
            html,
            "<html><head><title>t</title><script>window.__FORECAST_DATA__ = null;</script>\n</head>\
             <body><script>read()</script></body></html>"
        );
    }

    #[test]
    fn test_render_page_runs_before_page_scripts() {
        let template = "<body><p>x</p><script>read()</script></body>";
        let html = render_page(template, &ready());

        let assign = html.find("window.__FORECAST_DATA__ = {").unwrap();
        let read = html.find("read()").unwrap();
        assert!(assign < read);
        assert!(html.ends_with("<script>read()</script></body>"));
    }

    #[test]
    fn test_status_body_shape() {
        let computing = serde_json::to_value(status_body(&ReadinessState::Computing)).unwrap();
        assert_eq!(computing, serde_json::json!({"status": "computing"}));

        let failed = ReadinessState::Error("no artifact".to_string());
        let error = serde_json::to_value(status_body(&failed)).unwrap();
        assert_eq!(error, serde_json::json!({"status": "error", "error": "no artifact"}));
    }

    #[test]
    fn test_response_status_codes() {
        assert_eq!(forecast_response(&ready()).status(), StatusCode::OK);
        assert_eq!(
            forecast_response(&ReadinessState::Computing).status(),
            StatusCode::ACCEPTED
        );

        let failed = forecast_response(&ReadinessState::Error("boom".to_string()));
        assert_eq!(failed.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(failed.headers()[header::RETRY_AFTER], "30");
    }
}

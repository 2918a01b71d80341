use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use opentelemetry::trace::TraceContextExt;
use std::{sync::Arc, time::Instant};
use tracing::{error, info, instrument, warn, Instrument};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::Metrics;

/// Route label for requests no API route matched
const UNMATCHED_API_ROUTE: &str = "/api/unmatched";
/// Route label for pages and assets served from the static directory
const STATIC_ROUTE: &str = "/static";

/// Label a request by its route template. Paths that fell through to the
/// static directory or matched nothing are collapsed so raw URLs never
/// become metric labels.
fn route_label(request: &Request) -> String {
    match request.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_string(),
        None if request.uri().path().starts_with("/api/") => UNMATCHED_API_ROUTE.to_string(),
        None => STATIC_ROUTE.to_string(),
    }
}

/// Customer id from `/api/cart/:customer_id[/...]`, when numeric
fn cart_customer_id(path: &str) -> Option<i64> {
    path.strip_prefix("/api/cart/")?
        .split('/')
        .next()?
        .parse()
        .ok()
}

fn client_address(request: &Request) -> String {
    let headers = request.headers();
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|value| value.to_str().ok())
        })
        .map(str::trim)
        .unwrap_or("unknown")
        .to_string()
}

/// Request span, HTTP metrics and one completion log line per request.
/// Cart requests carry the customer id so a customer's traffic can be
/// followed across add and remove calls.
pub async fn observability_middleware(
    metrics: Arc<Metrics>,
    request: Request,
    next: Next,
) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();
    let route = route_label(&request);
    let customer_id = cart_customer_id(request.uri().path());
    let client_address = client_address(&request);
    let user_agent = request
        .headers()
        .get("user-agent")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let span_name = format!("{} {}", method, route);
    let span = tracing::info_span!(
        target: "storefront_rs::http",
        "{}", span_name,
        otel.name = %span_name,
        otel.kind = "server",
        http.request.method = %method,
        http.route = %route,
        url.path = %request.uri().path(),
        client.address = %client_address,
        user_agent.original = %user_agent,
        storefront.customer_id = tracing::field::Empty,
        http.response.status_code = tracing::field::Empty,
    );
    if let Some(customer_id) = customer_id {
        span.record("storefront.customer_id", customer_id);
    }

    async {
        metrics.increment_in_flight(&method, &route);

        let span = tracing::Span::current();
        let trace_id = span.context().span().span_context().trace_id().to_string();

        let response = next.run(request).await;

        let duration = start_time.elapsed();
        let status_code = response.status().as_u16();
        span.record("http.response.status_code", status_code);

        let otel_status = if status_code >= 500 {
            opentelemetry::trace::Status::error("server error")
        } else {
            opentelemetry::trace::Status::Ok
        };
        span.context().span().set_status(otel_status);

        metrics.record_http_request(&method, &route, status_code, duration.as_secs_f64());
        metrics.decrement_in_flight(&method, &route);

        let duration_ms = duration.as_millis();
        match status_code {
            500.. => error!(
                trace_id = %trace_id,
                customer_id = ?customer_id,
                status_code,
                duration_ms,
                "{} failed",
                span_name
            ),
            400..=499 => warn!(
                trace_id = %trace_id,
                customer_id = ?customer_id,
                status_code,
                duration_ms,
                "{} rejected",
                span_name
            ),
            _ => info!(
                trace_id = %trace_id,
                customer_id = ?customer_id,
                status_code,
                duration_ms,
                "{} completed",
                span_name
            ),
        }

        response
    }
    .instrument(span)
    .await
}

/// Wraps business operations with a log line and a Prometheus counter
#[derive(Clone)]
pub struct BusinessTracingMiddleware {
    metrics: Arc<Metrics>,
}

impl BusinessTracingMiddleware {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }

    /// Trace a cart operation
    #[instrument(skip_all, fields(
        operation = %operation,
        customer_id = customer_id,
    ))]
    pub async fn trace_cart_operation<F, T, E>(
        &self,
        operation: &str,
        customer_id: i64,
        future: F,
    ) -> Result<T, E>
    where
        F: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let start_time = Instant::now();

        info!("Starting cart operation");

        match future.await {
            Ok(result) => {
                self.metrics.record_cart_operation(operation, true);

                info!(
                    duration_ms = start_time.elapsed().as_millis(),
                    "Cart operation completed successfully"
                );

                Ok(result)
            }
            Err(error) => {
                self.metrics.record_cart_operation(operation, false);

                error!(
                    error = %error,
                    duration_ms = start_time.elapsed().as_millis(),
                    "Cart operation failed"
                );

                Err(error)
            }
        }
    }

    /// Trace a product listing
    #[instrument(skip_all, fields(filtered = filtered))]
    pub async fn trace_catalog_query<F, T, E>(&self, filtered: bool, future: F) -> Result<T, E>
    where
        F: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let start_time = Instant::now();

        match future.await {
            Ok(result) => {
                self.metrics.record_catalog_query(filtered, true);

                info!(
                    duration_ms = start_time.elapsed().as_millis(),
                    "Catalog query completed successfully"
                );

                Ok(result)
            }
            Err(error) => {
                self.metrics.record_catalog_query(filtered, false);

                error!(
                    error = %error,
                    duration_ms = start_time.elapsed().as_millis(),
                    "Catalog query failed"
                );

                Err(error)
            }
        }
    }

    /// Trace signup, login or session check. Rejected credentials count as
    /// failures here as well.
    #[instrument(skip_all, fields(operation = %operation))]
    pub async fn trace_auth_operation<F, T, E>(
        &self,
        operation: &str,
        future: F,
    ) -> Result<T, E>
    where
        F: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let start_time = Instant::now();

        match future.await {
            Ok(result) => {
                self.metrics.record_auth_operation(operation, true);

                info!(
                    duration_ms = start_time.elapsed().as_millis(),
                    "Auth operation completed successfully"
                );

                Ok(result)
            }
            Err(error) => {
                self.metrics.record_auth_operation(operation, false);

                // Bad credentials are expected traffic, not service errors
                warn!(
                    error = %error,
                    duration_ms = start_time.elapsed().as_millis(),
                    "Auth operation failed"
                );

                Err(error)
            }
        }
    }
}

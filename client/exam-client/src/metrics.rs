use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter, register_int_counter_vec,
    Encoder, Histogram, HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "exam_http_requests_total",
        "Total number of requests sent to the assessment backend",
        &["endpoint", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "exam_http_request_duration_seconds",
        "Backend request duration in seconds",
        &["endpoint"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0]
    )
    .unwrap();

    // Session Metrics
    pub static ref SESSIONS_FINISHED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "exam_sessions_finished_total",
        "Total number of finished assessment runs",
        &["reason"]
    )
    .unwrap();

    pub static ref FOCUS_VIOLATIONS_TOTAL: IntCounter = register_int_counter!(
        "exam_focus_violations_total",
        "Total number of focus-loss violations observed while running"
    )
    .unwrap();

    // Report Metrics
    pub static ref SUBMISSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "exam_submissions_total",
        "Total number of report submissions by outcome",
        &["status"]
    )
    .unwrap();

    pub static ref REPORT_PAGES: Histogram = register_histogram!(
        "exam_report_pages",
        "Number of pages per generated report",
        vec![1.0, 2.0, 3.0, 5.0, 8.0, 13.0]
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn gather_text() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

/// Helper: track a backend request with metrics
pub async fn track_http_request<F, T, E>(endpoint: &str, future: F) -> Result<T, E>
where
    F: std::future::Future<Output = Result<T, E>>,
{
    let start = std::time::Instant::now();
    let result = future.await;
    let duration = start.elapsed().as_secs_f64();

    let status = if result.is_ok() { "success" } else { "error" };

    HTTP_REQUESTS_TOTAL
        .with_label_values(&[endpoint, status])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[endpoint])
        .observe(duration);

    result
}

use chrono::Utc;
use serde::Serialize;
use std::error::Error as StdError;
use std::time::Duration;
use tracing::{error, warn};

const REPORT_TIMEOUT: Duration = Duration::from_secs(5);

/// External error-tracking collaborator.
pub trait ErrorReporter: Send + Sync {
    fn capture(&self, context: &str, err: &(dyn StdError + 'static));
}

/// Logs captured errors when no collector is configured.
#[derive(Debug, Default, Clone)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn capture(&self, context: &str, err: &(dyn StdError + 'static)) {
        error!(context, error = %err, "Captured error");
    }
}

#[derive(Debug, Serialize)]
struct ErrorEvent<'a> {
    service: &'a str,
    context: &'a str,
    message: String,
    timestamp: String,
}

/// Posts captured errors as JSON to an HTTP collector. Delivery is
/// fire-and-forget; failures are only logged.
#[derive(Debug, Clone)]
pub struct HttpErrorReporter {
    client: reqwest::Client,
    endpoint: String,
    service: String,
}

impl HttpErrorReporter {
    pub fn new(endpoint: impl Into<String>, service: impl Into<String>) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(REPORT_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            service: service.into(),
        })
    }
}

impl ErrorReporter for HttpErrorReporter {
    fn capture(&self, context: &str, err: &(dyn StdError + 'static)) {
        error!(context, error = %err, "Reporting error to collector");

        let body = match serde_json::to_vec(&ErrorEvent {
            service: &self.service,
            context,
            message: err.to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Failed to encode error event");
                return;
            }
        };

        let request = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);

        tokio::spawn(async move {
            match request.send().await {
                Ok(resp) if !resp.status().is_success() => {
                    warn!(status = %resp.status(), "Error collector rejected event");
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Failed to deliver error event"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_event_shape() {
        let event = ErrorEvent {
            service: "tracker-service",
            context: "persist_batch",
            message: "connection refused".to_string(),
            timestamp: "2024-01-01T00:00:00+00:00".to_string(),
        };

        let json = serde_json::to_value(&event).expect("serializes");
        assert_eq!(json["service"], "tracker-service");
        assert_eq!(json["context"], "persist_batch");
        assert_eq!(json["message"], "connection refused");
    }

    #[tokio::test]
    async fn test_http_reporter_tolerates_unreachable_collector() {
        let reporter =
            HttpErrorReporter::new("http://127.0.0.1:1/events", "tracker-service").expect("client");
        let err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        reporter.capture("test", &err);
    }
}

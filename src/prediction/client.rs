use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use super::types::{parse_classifier_response, ClassifierOutput, ImageUpload};
use super::PredictionError;
use crate::config::ClassifierConfig;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Anything that can score a chest X-ray.
#[async_trait]
pub trait ClassifierClient: Send + Sync {
    async fn classify(&self, image: &ImageUpload) -> Result<ClassifierOutput, PredictionError>;
}

/// Outcome of a single attempt, as seen by the retry loop.
#[derive(Debug)]
pub enum AttemptError {
    /// Connect/timeout/transport failure, 5xx, 408 or 429.
    Transient(String),
    /// Anything else; returned to the caller at once.
    Permanent(PredictionError),
}

/// Run `op` up to `max_retries + 1` times, sleeping `delay * (n + 1)` after
/// failed attempt `n`.
pub async fn with_retries<T, F, Fut>(
    max_retries: u32,
    delay: Duration,
    mut op: F,
) -> Result<T, PredictionError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    let attempts = max_retries + 1;
    let mut last_error = String::new();

    for attempt in 0..attempts {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(AttemptError::Permanent(e)) => return Err(e),
            Err(AttemptError::Transient(message)) => {
                last_error = message;
                if attempt < max_retries {
                    let wait = delay * (attempt + 1);
                    tracing::warn!(
                        attempt = attempt + 1,
                        wait_ms = wait.as_millis() as u64,
                        error = %last_error,
                        "Classifier call failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    Err(PredictionError::Unreachable {
        attempts,
        last_error,
    })
}

fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
}

/// Multipart HTTP client for the hosted classifier (`POST {base}/upload-image`).
pub struct HttpClassifier {
    base_url: Option<String>,
    client: reqwest::Client,
    max_retries: u32,
    retry_delay: Duration,
    timeout: Duration,
}

impl HttpClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self, PredictionError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| PredictionError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: config
                .base_url
                .as_deref()
                .map(|u| u.trim_end_matches('/').to_string()),
            client,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
            timeout: config.timeout,
        })
    }

    async fn attempt(&self, url: &str, image: &ImageUpload) -> Result<ClassifierOutput, AttemptError> {
        let part = reqwest::multipart::Part::bytes(image.bytes.clone())
            .file_name(image.filename.clone())
            .mime_str(&image.content_type)
            .map_err(|e| AttemptError::Permanent(PredictionError::HttpClient(e.to_string())))?;
        let form = reqwest::multipart::Form::new().part("image", part);

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                AttemptError::Transient(if e.is_connect() {
                    format!("Cannot connect to {url}")
                } else if e.is_timeout() {
                    format!("Request timed out after {}s", self.timeout.as_secs())
                } else {
                    e.to_string()
                })
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(if is_transient_status(status) {
                AttemptError::Transient(format!("status {}: {body}", status.as_u16()))
            } else {
                AttemptError::Permanent(PredictionError::Rejected {
                    status: status.as_u16(),
                    body,
                })
            });
        }

        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| AttemptError::Transient(e.to_string()))?;
        parse_classifier_response(&headers, &body).map_err(AttemptError::Permanent)
    }
}

#[async_trait]
impl ClassifierClient for HttpClassifier {
    async fn classify(&self, image: &ImageUpload) -> Result<ClassifierOutput, PredictionError> {
        let base = self
            .base_url
            .as_deref()
            .ok_or(PredictionError::NotConfigured)?;
        let url = format!("{base}/upload-image");

        let output = with_retries(self.max_retries, self.retry_delay, |_| {
            self.attempt(&url, image)
        })
        .await?;

        tracing::info!(
            label = %output.prediction.prediction,
            healthy = output.prediction.healthy,
            tuberculosis = output.prediction.tuberculosis,
            pneumonia = output.prediction.pneumonia,
            "Classifier prediction received"
        );
        Ok(output)
    }
}

/// Test double returning a fixed answer (or error) and counting calls.
#[cfg(test)]
pub struct MockClassifier {
    result: Result<ClassifierOutput, fn() -> PredictionError>,
    pub calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockClassifier {
    pub fn returning(output: ClassifierOutput) -> Self {
        Self {
            result: Ok(output),
            calls: Default::default(),
        }
    }

    pub fn failing(error: fn() -> PredictionError) -> Self {
        Self {
            result: Err(error),
            calls: Default::default(),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl ClassifierClient for MockClassifier {
    async fn classify(&self, _image: &ImageUpload) -> Result<ClassifierOutput, PredictionError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        match &self.result {
            Ok(output) => Ok(output.clone()),
            Err(make) => Err(make()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::extract::{Multipart, State};
    use axum::http::StatusCode as AxumStatus;
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::Router;

    use super::*;
    use crate::models::Prediction;

    fn image() -> ImageUpload {
        ImageUpload {
            bytes: b"fake-xray".to_vec(),
            filename: "chest.png".into(),
            content_type: "image/png".into(),
        }
    }

    fn config(base_url: &str) -> ClassifierConfig {
        ClassifierConfig {
            base_url: Some(base_url.to_string()),
            max_retries: 2,
            retry_delay: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
        }
    }

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// Fails with `status` for the first `failures` calls, then answers.
    fn flaky_classifier(failures: usize, status: AxumStatus, hits: Arc<AtomicUsize>) -> Router {
        Router::new()
            .route(
                "/upload-image",
                post(
                    move |State(hits): State<Arc<AtomicUsize>>, mut multipart: Multipart| async move {
                        let call = hits.fetch_add(1, Ordering::SeqCst);
                        let field = multipart.next_field().await.unwrap().unwrap();
                        assert_eq!(field.name(), Some("image"));
                        assert_eq!(field.bytes().await.unwrap().as_ref(), b"fake-xray");
                        if call < failures {
                            return (status, "busy").into_response();
                        }
                        (
                            [
                                ("word", "Pneumonia"),
                                ("healthy_score", "5"),
                                ("tb_score", "20"),
                                ("pneumonia_score", "75"),
                                ("content-type", "image/png"),
                            ],
                            b"annotated".to_vec(),
                        )
                            .into_response()
                    },
                ),
            )
            .with_state(hits)
    }

    #[tokio::test(start_paused = true)]
    async fn retry_delay_is_linear_and_bounded() {
        let calls = AtomicUsize::new(0);
        let started = tokio::time::Instant::now();

        let result: Result<(), _> = with_retries(2, Duration::from_secs(1), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AttemptError::Transient("down".into())) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1s after the first failure, 2s after the second, none after the last.
        assert_eq!(started.elapsed(), Duration::from_secs(3));
        match result {
            Err(PredictionError::Unreachable {
                attempts,
                last_error,
            }) => {
                assert_eq!(attempts, 3);
                assert_eq!(last_error, "down");
            }
            other => panic!("expected Unreachable, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_error_stops_retrying() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = with_retries(2, Duration::from_secs(1), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(AttemptError::Permanent(PredictionError::Rejected {
                    status: 400,
                    body: "bad image".into(),
                }))
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(PredictionError::Rejected { status: 400, .. })));
    }

    #[tokio::test]
    async fn recovers_after_transient_server_errors() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = spawn(flaky_classifier(2, AxumStatus::SERVICE_UNAVAILABLE, hits.clone())).await;

        let client = HttpClassifier::new(&config(&base)).unwrap();
        let output = client.classify(&image()).await.unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(output.prediction, Prediction::new(5.0, 20.0, 75.0, "Pneumonia"));
        assert_eq!(output.annotated_image.unwrap().content_type, "image/png");
    }

    #[tokio::test]
    async fn gives_up_after_three_attempts() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = spawn(flaky_classifier(10, AxumStatus::TOO_MANY_REQUESTS, hits.clone())).await;

        let client = HttpClassifier::new(&config(&base)).unwrap();
        let err = client.classify(&image()).await.unwrap_err();

        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert!(matches!(err, PredictionError::Unreachable { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn client_error_is_not_retried() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = spawn(flaky_classifier(10, AxumStatus::UNPROCESSABLE_ENTITY, hits.clone())).await;

        let client = HttpClassifier::new(&config(&base)).unwrap();
        let err = client.classify(&image()).await.unwrap_err();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(matches!(err, PredictionError::Rejected { status: 422, .. }));
    }

    #[tokio::test]
    async fn connection_refused_is_unreachable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpClassifier::new(&config(&format!("http://{addr}"))).unwrap();
        assert!(matches!(
            client.classify(&image()).await,
            Err(PredictionError::Unreachable { attempts: 3, .. })
        ));
    }

    #[tokio::test]
    async fn unconfigured_client_fails_fast() {
        let client = HttpClassifier::new(&ClassifierConfig::default()).unwrap();
        assert!(matches!(
            client.classify(&image()).await,
            Err(PredictionError::NotConfigured)
        ));
    }
}

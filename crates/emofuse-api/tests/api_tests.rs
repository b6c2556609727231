//! API integration tests.
//!
//! The engine is assembled from in-process fakes so no model files are needed.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use image::RgbImage;
use serde_json::Value;
use tower::ServiceExt;

use emofuse_api::{create_router, ApiConfig, AppState};
use emofuse_media::{
    AudioEmotionClassifier, EmotionBackbone, EmotionEngine, EngineConfig, FaceDetector,
    FaceLocalizer, FeatureExtractor, FusionEngine, ImageEmotionClassifier, MediaResult,
    ModelInput, OutputHead, OutputShape, RegionCropper, SelectionPolicy,
};
use emofuse_models::{BoundingBox, FaceCandidate, Modality};

const BOUNDARY: &str = "emofuse-test-boundary";

struct FixedDetector(Vec<FaceCandidate>);

impl FaceDetector for FixedDetector {
    fn detect(&self, _image: &RgbImage) -> MediaResult<Vec<FaceCandidate>> {
        Ok(self.0.clone())
    }

    fn selection(&self) -> SelectionPolicy {
        SelectionPolicy::ConfidenceThenArea
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

struct FixedBackbone {
    scores: Vec<f32>,
    delay: Duration,
}

impl EmotionBackbone for FixedBackbone {
    fn forward(&self, _input: &ModelInput) -> MediaResult<Vec<f32>> {
        std::thread::sleep(self.delay);
        Ok(self.scores.clone())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

struct TestEngine {
    detectors: Vec<Arc<dyn FaceDetector>>,
    image_scores: Vec<f32>,
    audio_scores: Vec<f32>,
    audio_delay: Duration,
}

impl Default for TestEngine {
    fn default() -> Self {
        Self {
            detectors: vec![Arc::new(FixedDetector(vec![FaceCandidate::scored(
                BoundingBox::new(100, 100, 50, 50),
                0.92,
            )]))],
            // image "sad"
            image_scores: one_hot(1),
            // audio "sadness"
            audio_scores: one_hot(5),
            audio_delay: Duration::ZERO,
        }
    }
}

impl TestEngine {
    fn build(self) -> EmotionEngine {
        let config = EngineConfig::default();
        EmotionEngine::new(
            FaceLocalizer::new(self.detectors),
            RegionCropper::default(),
            ImageEmotionClassifier::new(
                Arc::new(FixedBackbone {
                    scores: self.image_scores,
                    delay: Duration::ZERO,
                }),
                OutputHead::new(Modality::Image, config.image_labels.clone(), OutputShape::Rich),
                config.face_size,
            ),
            AudioEmotionClassifier::new(
                Arc::new(FixedBackbone {
                    scores: self.audio_scores,
                    delay: self.audio_delay,
                }),
                OutputHead::new(Modality::Audio, config.audio_labels.clone(), OutputShape::Rich),
                Arc::new(FeatureExtractor::default()),
            ),
            FusionEngine::default(),
        )
    }
}

fn one_hot(index: usize) -> Vec<f32> {
    let mut scores = vec![0.0; 7];
    scores[index] = 6.0;
    scores
}

fn create_test_router(engine: TestEngine) -> Router {
    create_test_router_with(engine, ApiConfig::default())
}

fn create_test_router_with(engine: TestEngine, config: ApiConfig) -> Router {
    create_router(AppState::new(config, engine.build()), None)
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, image::Rgb([120, 100, 80]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut buf), image::ImageOutputFormat::Png)
        .unwrap();
    buf
}

fn wav_bytes(seconds: f32, sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        let n = (seconds * sample_rate as f32) as usize;
        for i in 0..n {
            let t = i as f32 / sample_rate as f32;
            let s = (2.0 * std::f32::consts::PI * 220.0 * t).sin() * 8000.0;
            writer.write_sample(s as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

fn multipart_request(uri: &str, parts: &[(&str, &[u8])]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, data) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}.bin\"\r\n",
                name, name
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Test health endpoint.
#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_router(TestEngine::default());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_ready_reports_engine() {
    let app = create_test_router(TestEngine::default());

    let response = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["engine"]["detectors"][0], "fixed");
    assert_eq!(body["engine"]["audio_sample_rate"], 16_000);
}

#[tokio::test]
async fn test_ready_is_degraded_without_detectors() {
    let app = create_test_router(TestEngine {
        detectors: vec![],
        ..TestEngine::default()
    });

    let response = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["checks"]["face_detectors"]["status"], "error");
}

#[tokio::test]
async fn test_predict_image() {
    let app = create_test_router(TestEngine::default());
    let image = png_bytes(640, 480);

    let response = app
        .oneshot(multipart_request("/predict", &[("file", &image[..])]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["emotion"], "sad");
    assert_eq!(body["canonical_emotion"], "sadness");
    assert_eq!(body["face_coords"]["x"], 100);
    assert_eq!(body["face_coords"]["w"], 50);
    assert_eq!(body["detector"], "fixed");
    assert!(!body["face_image"].as_str().unwrap().is_empty());
    assert_eq!(body["distribution"].as_object().unwrap().len(), 7);
}

#[tokio::test]
async fn test_predict_image_no_face() {
    let app = create_test_router(TestEngine {
        detectors: vec![Arc::new(FixedDetector(vec![]))],
        ..TestEngine::default()
    });
    let image = png_bytes(320, 240);

    let response = app
        .oneshot(multipart_request("/predict", &[("file", &image[..])]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["code"], "no_face");
}

#[tokio::test]
async fn test_predict_invalid_image() {
    let app = create_test_router(TestEngine::default());

    let response = app
        .oneshot(multipart_request("/predict", &[("file", &b"definitely not a png"[..])]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "invalid_image");
}

#[tokio::test]
async fn test_predict_missing_field() {
    let app = create_test_router(TestEngine::default());
    let image = png_bytes(64, 64);

    let response = app
        .oneshot(multipart_request("/predict", &[("picture", &image[..])]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "bad_request");
}

#[tokio::test]
async fn test_predict_audio() {
    let app = create_test_router(TestEngine {
        // audio "happiness"
        audio_scores: one_hot(3),
        ..TestEngine::default()
    });
    let audio = wav_bytes(1.0, 22_050);

    let response = app
        .oneshot(multipart_request("/predict/audio", &[("file", &audio[..])]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["emotion"], "happiness");
    assert_eq!(body["canonical_emotion"], "happiness");
    assert!(body["confidence"].as_f64().unwrap() > 0.9);
}

#[tokio::test]
async fn test_predict_invalid_audio() {
    let app = create_test_router(TestEngine::default());

    let response = app
        .oneshot(multipart_request("/predict/audio", &[("file", &b"RIFF....WAVE"[..])]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "invalid_audio");
}

#[tokio::test]
async fn test_predict_multimodal_agreement() {
    let app = create_test_router(TestEngine::default());
    let image = png_bytes(640, 480);
    let audio = wav_bytes(1.0, 16_000);

    let response = app
        .oneshot(multipart_request(
            "/predict/multimodal",
            &[("image", &image[..]), ("audio", &audio[..])],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["final_emotion"], "sadness");
    assert_eq!(body["fusion_method"], "agreement");
    assert!(body["confidence"].as_f64().unwrap() <= 0.95);
    assert_eq!(body["image"]["emotion"], "sad");
    assert_eq!(body["audio"]["emotion"], "sadness");
    assert_eq!(body["face_coords"]["y"], 100);
    assert_eq!(body["weighted_distribution"].as_object().unwrap().len(), 7);
}

#[tokio::test]
async fn test_predict_multimodal_audio_priority() {
    let app = create_test_router(TestEngine {
        // image "happy", audio "fear"
        image_scores: one_hot(0),
        audio_scores: one_hot(2),
        ..TestEngine::default()
    });
    let image = png_bytes(640, 480);
    let audio = wav_bytes(1.0, 16_000);

    let response = app
        .oneshot(multipart_request(
            "/predict/multimodal",
            &[("image", &image[..]), ("audio", &audio[..])],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["final_emotion"], "fear");
    assert_eq!(body["image_emotion"], "happiness");
    assert_eq!(body["fusion_method"], "audio_priority");
}

#[tokio::test]
async fn test_predict_multimodal_classification_failure() {
    let app = create_test_router(TestEngine {
        audio_scores: vec![0.1, 0.2, 0.3],
        ..TestEngine::default()
    });
    let image = png_bytes(640, 480);
    let audio = wav_bytes(1.0, 16_000);

    let response = app
        .oneshot(multipart_request(
            "/predict/multimodal",
            &[("image", &image[..]), ("audio", &audio[..])],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["code"], "classification_failed");
}

#[tokio::test]
async fn test_internal_details_hidden_in_production() {
    let config = ApiConfig {
        environment: "Production".to_string(),
        ..ApiConfig::default()
    };
    let app = create_test_router_with(
        TestEngine {
            audio_scores: vec![0.1, 0.2, 0.3],
            ..TestEngine::default()
        },
        config,
    );
    let image = png_bytes(640, 480);
    let audio = wav_bytes(1.0, 16_000);

    let response = app
        .oneshot(multipart_request(
            "/predict/multimodal",
            &[("image", &image[..]), ("audio", &audio[..])],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().contains_key("x-request-id"));
    let body = json_body(response).await;
    assert_eq!(body["code"], "classification_failed");
    assert_eq!(body["detail"], "An internal error occurred");
}

#[tokio::test]
async fn test_client_errors_keep_detail_in_production() {
    let config = ApiConfig {
        environment: "production".to_string(),
        ..ApiConfig::default()
    };
    let app = create_test_router_with(TestEngine::default(), config);

    let response = app
        .oneshot(multipart_request("/predict", &[("file", &b"not an image"[..])]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_ne!(body["detail"], "An internal error occurred");
}

#[tokio::test]
async fn test_oversized_chunked_upload() {
    let config = ApiConfig {
        max_body_size: 256,
        ..ApiConfig::default()
    };
    let app = create_test_router_with(TestEngine::default(), config);
    let payload = vec![7u8; 4096];

    // No content-length header, so the limit trips while the body streams
    let response = app
        .oneshot(multipart_request("/predict", &[("file", &payload[..])]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = json_body(response).await;
    assert_eq!(body["code"], "payload_too_large");
}

#[tokio::test]
async fn test_predict_multimodal_timeout() {
    let config = ApiConfig {
        inference_deadline: Some(Duration::from_millis(50)),
        ..ApiConfig::default()
    };
    let app = create_test_router_with(
        TestEngine {
            audio_delay: Duration::from_millis(500),
            ..TestEngine::default()
        },
        config,
    );
    let image = png_bytes(640, 480);
    let audio = wav_bytes(1.0, 16_000);

    let response = app
        .oneshot(multipart_request(
            "/predict/multimodal",
            &[("image", &image[..]), ("audio", &audio[..])],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let body = json_body(response).await;
    assert_eq!(body["code"], "timeout");
}

#[tokio::test]
async fn test_predict_multimodal_requires_both_fields() {
    let app = create_test_router(TestEngine::default());
    let image = png_bytes(640, 480);

    let response = app
        .oneshot(multipart_request("/predict/multimodal", &[("image", &image[..])]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Metrics route only exists when a recorder handle is supplied.
#[tokio::test]
async fn test_metrics_endpoint_disabled() {
    let app = create_test_router(TestEngine::default());

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Test CORS headers.
#[tokio::test]
async fn test_cors_preflight() {
    let app = create_test_router(TestEngine::default());

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/predict")
                .header("Origin", "http://localhost:3000")
                .header("Access-Control-Request-Method", "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status() == StatusCode::OK || response.status() == StatusCode::NO_CONTENT);
    assert!(response
        .headers()
        .contains_key("access-control-allow-origin"));
}

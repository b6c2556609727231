//! Prediction handlers.
//!
//! Uploads arrive as multipart forms. Decoding, inference and fusion run in
//! the engine; these handlers only pick fields and shape responses.

use std::collections::HashMap;

use axum::extract::{Multipart, State};
use axum::Json;
use emofuse_media::{ImageAnalysis, ImageOutcome, LocatedRegion, MultimodalOutcome};
use emofuse_models::{BoundingBox, ClassifierResult, EmotionLabel, FusionResult, LabelDistribution};
use serde::Serialize;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Face box in source image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FaceCoords {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl From<BoundingBox> for FaceCoords {
    fn from(b: BoundingBox) -> Self {
        Self {
            x: b.x,
            y: b.y,
            w: b.width,
            h: b.height,
        }
    }
}

/// Face location details shared by image and multimodal responses.
#[derive(Debug, Serialize)]
pub struct FaceDetails {
    pub face_coords: FaceCoords,
    pub detector: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detector_confidence: Option<f64>,
    /// Base64 PNG of the classifier input crop
    pub face_image: String,
}

impl FaceDetails {
    fn from_located(located: &LocatedRegion) -> ApiResult<Self> {
        Ok(Self {
            face_coords: located.face.bbox.into(),
            detector: located.face.detector,
            detector_confidence: located.face.confidence,
            face_image: located.region.to_png_base64()?,
        })
    }
}

/// Single classifier prediction.
#[derive(Debug, Serialize)]
pub struct EmotionPrediction {
    /// Label in the classifier's own vocabulary
    pub emotion: String,
    pub canonical_emotion: EmotionLabel,
    pub confidence: f64,
    pub distribution: LabelDistribution,
}

impl From<ClassifierResult> for EmotionPrediction {
    fn from(result: ClassifierResult) -> Self {
        Self {
            canonical_emotion: result.canonical_label(),
            emotion: result.label,
            confidence: result.confidence,
            distribution: result.distribution,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImagePredictionResponse {
    #[serde(flatten)]
    pub prediction: EmotionPrediction,
    #[serde(flatten)]
    pub face: FaceDetails,
}

#[derive(Debug, Serialize)]
pub struct MultimodalPredictionResponse {
    #[serde(flatten)]
    pub fusion: FusionResult,
    pub image: EmotionPrediction,
    pub audio: EmotionPrediction,
    #[serde(flatten)]
    pub face: FaceDetails,
}

/// Named multipart fields, fully buffered.
struct Uploads(HashMap<String, Vec<u8>>);

impl Uploads {
    async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut fields = HashMap::new();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let data = field.bytes().await?;
            fields.insert(name, data.to_vec());
        }
        Ok(Self(fields))
    }

    /// Take the first present field among `names`.
    fn take(&mut self, names: &[&str]) -> ApiResult<Vec<u8>> {
        names
            .iter()
            .find_map(|name| self.0.remove(*name))
            .ok_or_else(|| {
                ApiError::bad_request(format!("Missing multipart field '{}'", names[0]))
            })
    }
}

/// `POST /predict`: classify the primary face of an image (`file`).
pub async fn predict_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ImagePredictionResponse>> {
    let image = Uploads::read(multipart).await?.take(&["file", "image"])?;

    let outcome = state
        .engine
        .analyze_image_async(image, state.config.inference_deadline)
        .await?;

    let ImageOutcome::Classified(ImageAnalysis { located, result }) = outcome else {
        return Err(ApiError::NoFace);
    };

    info!(
        emotion = %result.label,
        detector = located.face.detector,
        "Image prediction"
    );

    Ok(Json(ImagePredictionResponse {
        face: FaceDetails::from_located(&located)?,
        prediction: result.into(),
    }))
}

/// `POST /predict/audio`: classify a WAV clip (`file`).
pub async fn predict_audio(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<EmotionPrediction>> {
    let audio = Uploads::read(multipart).await?.take(&["file", "audio"])?;

    let result = state
        .engine
        .analyze_audio_async(audio, state.config.inference_deadline)
        .await?;

    info!(emotion = %result.label, "Audio prediction");
    Ok(Json(result.into()))
}

/// `POST /predict/multimodal`: fuse an image (`image`) with a WAV clip (`audio`).
pub async fn predict_multimodal(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<MultimodalPredictionResponse>> {
    let mut uploads = Uploads::read(multipart).await?;
    let image = uploads.take(&["image"])?;
    let audio = uploads.take(&["audio"])?;

    let outcome = state
        .engine
        .analyze_multimodal(image, audio, state.config.inference_deadline)
        .await?;

    let MultimodalOutcome::Fused(analysis) = outcome else {
        return Err(ApiError::NoFace);
    };

    info!(
        final_emotion = %analysis.fusion.final_emotion,
        method = %analysis.fusion.fusion_method,
        "Multimodal prediction"
    );

    let face = FaceDetails::from_located(&analysis.located)?;
    let analysis = *analysis;
    Ok(Json(MultimodalPredictionResponse {
        fusion: analysis.fusion,
        image: analysis.image.into(),
        audio: analysis.audio.into(),
        face,
    }))
}

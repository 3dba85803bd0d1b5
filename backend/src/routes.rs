use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use futures::{StreamExt, TryStreamExt};
use log::{error, info};
use serde::Deserialize;
use serde_json::json;
use std::io::Write;
use uuid::Uuid;

use crate::inference::classifier::Classifier;
use crate::inference::config::InferenceConfig;
use crate::inference::pipeline::{self, ExplainVariant, Prediction};
use shared::{ErrorResponse, PredictionResponse, ProbabilityDistribution};

#[derive(Debug, Deserialize)]
pub struct PredictQuery {
    /// `image` (default) for a rendered overlay, `heatmap` for the raw grid.
    explain: Option<String>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/health").route(web::get().to(health)))
        .service(web::resource("/predict").route(web::post().to(handle_predict)));
}

async fn index() -> HttpResponse {
    HttpResponse::Ok().json(json!({"message": "Welcome to the Brain Tumor Prediction"}))
}

async fn health(classifier: web::Data<Classifier>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "model": classifier.artifact(),
    }))
}

async fn handle_predict(
    classifier: web::Data<Classifier>,
    config: web::Data<InferenceConfig>,
    query: web::Query<PredictQuery>,
    mut payload: Multipart,
) -> Result<HttpResponse, Error> {
    let variant = match query.explain.as_deref() {
        None | Some("image") => ExplainVariant::Image,
        Some("heatmap") => ExplainVariant::Heatmap,
        Some(other) => {
            return Ok(HttpResponse::BadRequest().json(ErrorResponse::new(format!(
                "unknown explain variant `{other}`, expected `image` or `heatmap`"
            ))));
        }
    };

    // Single image upload: the first non-empty multipart field wins.
    let mut image_data = Vec::new();
    while let Ok(Some(mut field)) = payload.try_next().await {
        while let Some(chunk) = field.next().await {
            let data = chunk?;
            image_data.write_all(&data)?;
        }
        if !image_data.is_empty() {
            break;
        }
    }
    if image_data.is_empty() {
        return Ok(HttpResponse::BadRequest()
            .json(ErrorResponse::new("no image file found in the request")));
    }

    let request_id = Uuid::new_v4();
    info!("[{request_id}] received {} byte upload", image_data.len());

    let classifier = classifier.into_inner();
    let config = config.into_inner();
    let result =
        web::block(move || pipeline::run(&classifier, &config, &image_data, variant)).await?;

    match result {
        Ok(prediction) => {
            info!("[{request_id}] predicted {}", prediction.predicted_class);
            Ok(HttpResponse::Ok().json(to_response(prediction)))
        }
        Err(e) => {
            error!("[{request_id}] prediction failed: {e}");
            Ok(HttpResponse::BadRequest().json(ErrorResponse::new(e.to_string())))
        }
    }
}

fn to_response(prediction: Prediction) -> PredictionResponse {
    PredictionResponse {
        status: "success".to_string(),
        probability_distribution: ProbabilityDistribution {
            healthy: prediction.probabilities[0],
            pituitary_tumor: prediction.probabilities[1],
            glioma_tumor: prediction.probabilities[2],
            meningioma_tumor: prediction.probabilities[3],
        },
        predicted_class: prediction.predicted_class.to_string(),
        gradcam_image: prediction.gradcam_image,
        gradcam_heatmap: prediction.gradcam_heatmap,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::gradcam;

    #[test]
    fn response_mapping_keeps_label_order() {
        let prediction = Prediction {
            probabilities: [0.01, 0.02, 0.95, 0.02],
            predicted_class: "glioma_tumor",
            relevance: gradcam::zero_relevance(7),
            gradcam_image: Some("cGF5bG9hZA==".to_string()),
            gradcam_heatmap: None,
        };
        let response = to_response(prediction);
        assert_eq!(response.status, "success");
        assert_eq!(response.probability_distribution.glioma_tumor, 0.95);
        assert_eq!(response.predicted_class, "glioma_tumor");
        assert!(response.gradcam_image.is_some());
        assert!(response.gradcam_heatmap.is_none());
    }
}

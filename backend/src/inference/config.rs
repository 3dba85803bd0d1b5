use serde::{Deserialize, Serialize};

/// Inference configuration, loaded from `config/inference.yaml` at the
/// workspace root. Every field has a default so the file is optional;
/// model paths can additionally be overridden through the environment
/// (`MODEL_PATH` / `LEGACY_MODEL_PATH`) at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub relevance: RelevanceConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Side length the network expects; uploads are resized to size x size.
    #[serde(default = "default_image_size")]
    pub size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevanceConfig {
    /// Guard against division by zero when max-normalizing the relevance map.
    #[serde(default = "default_epsilon")]
    pub epsilon: f32,
    /// Spatial resolution of the target layer's activation (7x7 for Xception
    /// at 224x224 input). Used for the all-zero map of healthy predictions.
    #[serde(default = "default_spatial")]
    pub spatial: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Blend factor of the colorized heatmap over the original image.
    #[serde(default = "default_alpha")]
    pub alpha: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_primary_path")]
    pub primary_path: String,
    #[serde(default = "default_legacy_path")]
    pub legacy_path: String,
}

fn default_image_size() -> u32 {
    224
}

fn default_epsilon() -> f32 {
    1e-8
}

fn default_spatial() -> usize {
    7
}

fn default_alpha() -> f32 {
    0.4
}

fn default_primary_path() -> String {
    "model/brain_tumor_classifier_v2.pt".to_string()
}

fn default_legacy_path() -> String {
    "model/brain_tumor_classifier_v1.pt".to_string()
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            size: default_image_size(),
        }
    }
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            epsilon: default_epsilon(),
            spatial: default_spatial(),
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            primary_path: default_primary_path(),
            legacy_path: default_legacy_path(),
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            image: ImageConfig::default(),
            relevance: RelevanceConfig::default(),
            overlay: OverlayConfig::default(),
            model: ModelConfig::default(),
        }
    }
}

impl InferenceConfig {
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let manifest_dir =
            std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
        let config_path = format!("{}/../config/inference.yaml", manifest_dir);
        match std::fs::read_to_string(&config_path) {
            Ok(raw) => {
                let config: InferenceConfig = serde_yaml::from_str(&raw)?;
                Ok(config)
            }
            Err(_) => {
                log::info!("no config file at {config_path}, using built-in defaults");
                Ok(Self::default())
            }
        }
    }
}

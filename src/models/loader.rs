//! Model artifact persistence

use super::pipeline::{ModelArtifact, ARTIFACT_FORMAT_VERSION};
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Reads and writes [`ModelArtifact`] JSON files
pub struct ModelLoader;

impl ModelLoader {
    /// Load a fitted pipeline from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ModelArtifact> {
        let path = path.as_ref();
        if !path.exists() {
            bail!("Model not found at {}", path.display());
        }

        info!(path = %path.display(), "Loading model artifact");
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read model from {}", path.display()))?;
        let artifact: ModelArtifact = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse model artifact {}", path.display()))?;

        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            warn!(
                found = artifact.format_version,
                expected = ARTIFACT_FORMAT_VERSION,
                "Model artifact format version differs"
            );
        }

        info!(
            classifier = %artifact.classifier,
            features = artifact.feature_names.len(),
            cv_score = ?artifact.cv_score,
            created_at = %artifact.created_at,
            "Model loaded successfully"
        );
        Ok(artifact)
    }

    /// Write a fitted pipeline, creating parent directories
    pub fn save<P: AsRef<Path>>(artifact: &ModelArtifact, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string(artifact).context("Failed to serialize model artifact")?;
        fs::write(path, json).with_context(|| format!("Failed to write model to {}", path.display()))?;

        info!(path = %path.display(), classifier = %artifact.classifier, "Model saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeaturesConfig;
    use crate::models::params::ParamSet;
    use crate::models::pipeline::tests::applicants;
    use crate::models::{ClassifierKind, ScoringPipeline};

    #[test]
    fn test_missing_model_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModelLoader::load(dir.path().join("model.json")).unwrap_err();
        assert!(err.to_string().starts_with("Model not found at"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/model.json");

        let (table, y) = applicants(30);
        let features = FeaturesConfig::default();
        let clf = ClassifierKind::GradientBoosting.build(&ParamSet::new()).unwrap();
        let pipeline = ScoringPipeline::fit(
            &table,
            &y,
            &features.numeric_features,
            &features.categorical_features,
            clf,
        )
        .unwrap();
        let artifact = ModelArtifact::new(pipeline, ParamSet::new(), 0.8);

        ModelLoader::save(&artifact, &path).unwrap();
        let loaded = ModelLoader::load(&path).unwrap();

        assert_eq!(loaded.classifier, ClassifierKind::GradientBoosting);
        assert_eq!(loaded.cv_score, Some(0.8));
    }

    #[test]
    fn test_corrupt_model_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(ModelLoader::load(&path).is_err());
    }
}

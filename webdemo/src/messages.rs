//! User-facing text.

use std::fmt::Display;

pub const TITLE: &str = "Gastrointestinal Disease Classification";
pub const HEADER: &str = "Please upload an endoscopy image";
pub const LOADING: &str = "Loading the classifier...";
pub const NO_FILE: &str = "Please upload an image to enhance.";
pub const CLASSIFYING: &str = "Classifying...";
pub const ORIGINAL_CAPTION: &str = "Original Image";
pub const ENHANCED_CAPTION: &str = "Enhanced Image (CLAHE)";

pub const BAD_FORMAT: &str =
    "Error loading the image. Please make sure image in jpeg, jpg or png format";
pub const INVALID_IMAGE: &str =
    "Uploaded file is not a valid image. Please upload a JPEG or PNG image.";
pub const LABELS_NOT_FOUND: &str =
    "Labels file not found. Please make sure 'labels.txt' is in the correct location.";

pub fn model_error(e: impl Display) -> String {
    format!("Error loading the model: {e}")
}

pub fn labels_error(e: impl Display) -> String {
    format!("Error reading labels file: {e}")
}

pub fn classification_error(e: impl Display) -> String {
    format!("Error during classification: {e}")
}

pub fn score(prediction: &gidc::Prediction) -> String {
    format!("Score: {}%", prediction.confidence())
}

/// Message for a failed upload, telling bad files apart from pipeline failures.
pub fn upload_error(e: &anyhow::Error) -> String {
    match e.downcast_ref::<gidc::Error>() {
        Some(gidc::Error::UnsupportedFormat { .. }) => BAD_FORMAT.to_owned(),
        Some(gidc::Error::InvalidImage { .. }) => INVALID_IMAGE.to_owned(),
        _ => format!("Error processing the uploaded image: {e:#}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_errors() {
        let unsupported = gidc::decode_upload("scan.bmp", &[]).unwrap_err();
        assert_eq!(upload_error(&unsupported.into()), BAD_FORMAT);

        let corrupt = gidc::decode_upload("scan.png", b"nope").unwrap_err();
        assert_eq!(upload_error(&corrupt.into()), INVALID_IMAGE);

        let other = anyhow::anyhow!("out of memory");
        assert_eq!(
            upload_error(&other),
            "Error processing the uploaded image: out of memory"
        );
    }

    #[test]
    fn score_line() {
        let prediction = gidc::Prediction {
            index: 0,
            label: "Normal".into(),
            score: 0.87654,
        };
        assert_eq!(score(&prediction), "Score: 87.6%");
    }

    #[test]
    fn wrapped_messages() {
        assert_eq!(
            model_error("HTTP 404"),
            "Error loading the model: HTTP 404"
        );
        assert_eq!(
            classification_error("model is not loaded"),
            "Error during classification: model is not loaded"
        );
    }
}

use crate::{Error, Labels, Prediction, Result};
use std::{io, path::Path};

use image::{imageops, RgbImage};
use serde::{Deserialize, Serialize};
use tract_onnx::prelude::*;
use web_time::Instant;

type Model = RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

const CH: usize = 3;

#[derive(Debug, Clone)]
pub struct Classifier {
    model: Model,
    options: Options,
}

/// Input geometry and value mapping the network was trained with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Options {
    pub width: u32,
    pub height: u32,
    pub layout: Layout,
    pub normalization: Normalization,
    pub activation: Activation,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            width: 224,
            height: 224,
            layout: Layout::Nhwc,
            normalization: Normalization::SYMMETRIC,
            activation: Activation::Identity,
        }
    }
}

impl Options {
    fn input_shape(self) -> [usize; 4] {
        let (h, w) = (self.height as usize, self.width as usize);
        match self.layout {
            Layout::Nhwc => [1, h, w, CH],
            Layout::Nchw => [1, CH, h, w],
        }
    }

    fn validate(self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::invalid_options(format!(
                "input size must be non-empty, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Tensor layout of the model input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layout {
    /// `[batch, height, width, channels]`, as exported from Keras.
    Nhwc,
    /// `[batch, channels, height, width]`.
    Nchw,
}

/// Maps an 8-bit channel value `v` to `v * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normalization {
    pub scale: f32,
    pub offset: f32,
}

impl Normalization {
    /// `[0, 255] -> [-1, 1]`
    pub const SYMMETRIC: Self = Self {
        scale: 1.0 / 127.5,
        offset: -1.0,
    };
    /// `[0, 255] -> [0, 1]`
    pub const UNIT: Self = Self {
        scale: 1.0 / 255.0,
        offset: 0.0,
    };

    #[inline]
    fn apply(self, v: u8) -> f32 {
        f32::from(v) * self.scale + self.offset
    }
}

/// What to apply to the raw network output before picking the top class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    /// The network already ends in softmax.
    Identity,
    Softmax,
}

impl Classifier {
    pub fn from_model(model: Model, options: Options) -> Self {
        Self { model, options }
    }

    pub fn from_bytes(model_bytes: &[u8], options: Options) -> Result<Self> {
        options.validate()?;
        let clock = Instant::now();
        let model = tract_onnx::onnx()
            .model_for_read(&mut io::BufReader::new(model_bytes))
            .and_then(|model| model.with_input_fact(0, f32::fact(options.input_shape()).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(Error::model_load)?;
        tracing::debug!(elapsed = ?clock.elapsed(), "loaded classifier");
        Ok(Self::from_model(model, options))
    }

    pub fn from_path(path: impl AsRef<Path>, options: Options) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::ModelNotFound {
                path: path.to_owned(),
            },
            _ => Error::model_load(e),
        })?;
        Self::from_bytes(&bytes, options)
    }

    pub fn options(&self) -> Options {
        self.options
    }

    /// Input blob for `img`, cropped and resized to the model's input size.
    pub fn preprocess(&self, img: &RgbImage) -> tract_ndarray::Array4<f32> {
        blob_from_image(img, self.options)
    }

    /// Per-class scores for `img`, in model output order.
    pub fn scores(&self, img: &RgbImage) -> Result<Vec<f32>> {
        if img.is_empty() {
            return Err(Error::invalid_image("image is empty"));
        }
        let blob = self.preprocess(img);
        let clock = Instant::now();
        let outs = self
            .model
            .run(tvec!(Tensor::from(blob).into()))
            .map_err(|e| Error::classification(format!("forward pass: {e:#}")))?;
        tracing::debug!(elapsed = ?clock.elapsed(), "forward pass");

        let Some(out) = outs.first() else {
            return Err(Error::classification("model produced no outputs"));
        };
        let scores: Vec<f32> = out
            .to_array_view::<f32>()
            .map_err(|e| Error::classification(format!("model output: {e:#}")))?
            .iter()
            .copied()
            .collect();
        Ok(match self.options.activation {
            Activation::Identity => scores,
            Activation::Softmax => softmax(&scores),
        })
    }

    pub fn classify(&self, img: &RgbImage, labels: &Labels) -> Result<Prediction> {
        let scores = self.scores(img)?;
        predict(&scores, labels)
    }
}

/// Picks the highest scoring class. Ties go to the lower index and NaN never wins.
pub fn predict(scores: &[f32], labels: &Labels) -> Result<Prediction> {
    if scores.len() != labels.len() {
        return Err(Error::classification(format!(
            "model has {} outputs but there are {} labels",
            scores.len(),
            labels.len()
        )));
    }
    let (index, score) = scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, s)| !s.is_nan())
        .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)))
        .ok_or_else(|| Error::classification("model produced no usable scores"))?;
    let label = labels
        .get(index)
        .ok_or_else(|| Error::classification(format!("no label for class {index}")))?;
    Ok(Prediction {
        index,
        label: label.to_owned(),
        score,
    })
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Centre-crops `img` to the target aspect ratio, then resizes it.
fn fit(img: &RgbImage, width: u32, height: u32) -> RgbImage {
    let (iw, ih) = img.dimensions();
    if (iw, ih) == (width, height) {
        return img.clone();
    }
    let target = width as f64 / height as f64;
    let (cw, ch) = if iw as f64 / ih as f64 > target {
        (((ih as f64 * target).round() as u32).clamp(1, iw), ih)
    } else {
        (iw, ((iw as f64 / target).round() as u32).clamp(1, ih))
    };
    let cropped = imageops::crop_imm(img, (iw - cw) / 2, (ih - ch) / 2, cw, ch).to_image();
    imageops::resize(&cropped, width, height, imageops::FilterType::Lanczos3)
}

fn blob_from_image(img: &RgbImage, options: Options) -> tract_ndarray::Array4<f32> {
    let img = fit(img, options.width, options.height);
    let norm = options.normalization;
    let (h, w) = (options.height as usize, options.width as usize);
    match options.layout {
        Layout::Nhwc => tract_ndarray::Array4::from_shape_fn((1, h, w, CH), |(_, y, x, c)| {
            norm.apply(img[(x as _, y as _)][c])
        }),
        Layout::Nchw => tract_ndarray::Array4::from_shape_fn((1, CH, h, w), |(_, c, y, x)| {
            norm.apply(img[(x as _, y as _)][c])
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn labels() -> Labels {
        Labels::parse("0 Normal\n1 Ulcerative Colitis\n2 Polyps\n3 Esophagitis").unwrap()
    }

    /// Takes a 2x2 NHWC image and sums its channels, so there is one score per
    /// pixel in row-major order.
    fn pixel_sum_classifier(activation: Activation) -> Classifier {
        use tract_onnx::tract_core::ops::nn::{Reduce, Reducer};

        let mut model = TypedModel::default();
        let input = model.add_source("input", f32::fact([1, 2, 2, 3])).unwrap();
        let reduce = Reduce {
            axes: tvec![3],
            reducer: Reducer::Sum,
        };
        let sum = model.wire_node("sum", reduce, &[input]).unwrap();
        model.set_output_outlets(&sum).unwrap();
        let options = Options {
            width: 2,
            height: 2,
            activation,
            ..Options::default()
        };
        Classifier::from_model(model.into_runnable().unwrap(), options)
    }

    fn bright_pixel(width: u32, height: u32, x0: u32, y0: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            if x >= x0 && y >= y0 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        })
    }

    #[test]
    fn nhwc_blob() {
        let img = RgbImage::from_fn(4, 2, |x, _| if x < 2 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) });
        let options = Options {
            width: 4,
            height: 2,
            ..Options::default()
        };
        let blob = blob_from_image(&img, options);
        assert_eq!(blob.shape(), [1, 2, 4, 3]);
        assert_eq!(blob[[0, 1, 0, 2]], -1.0);
        assert!((blob[[0, 0, 3, 0]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn nchw_blob_with_unit_normalization() {
        let img = RgbImage::from_pixel(3, 3, Rgb([255, 0, 51]));
        let options = Options {
            width: 3,
            height: 3,
            layout: Layout::Nchw,
            normalization: Normalization::UNIT,
            ..Options::default()
        };
        let blob = blob_from_image(&img, options);
        assert_eq!(blob.shape(), [1, 3, 3, 3]);
        assert!((blob[[0, 0, 1, 1]] - 1.0).abs() < 1e-6);
        assert_eq!(blob[[0, 1, 1, 1]], 0.0);
        assert!((blob[[0, 2, 2, 0]] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn fit_crops_to_aspect_before_resizing() {
        // left and right thirds are red, the centre square is green
        let img = RgbImage::from_fn(90, 30, |x, _| {
            if (30..60).contains(&x) {
                Rgb([0, 255, 0])
            } else {
                Rgb([255, 0, 0])
            }
        });
        let out = fit(&img, 10, 10);
        assert_eq!(out.dimensions(), (10, 10));
        assert!(out.pixels().all(|p| p.0 == [0, 255, 0]));
    }

    #[test]
    fn predict_picks_highest_score() {
        let prediction = predict(&[0.05, 0.1, 0.8, 0.05], &labels()).unwrap();
        assert_eq!(prediction.index, 2);
        assert_eq!(prediction.label, "Polyps");
        assert_eq!(prediction.score, 0.8);
    }

    #[test]
    fn predict_breaks_ties_towards_first_class() {
        let prediction = predict(&[0.4, 0.4, 0.1, 0.1], &labels()).unwrap();
        assert_eq!(prediction.index, 0);
    }

    #[test]
    fn predict_ignores_nan() {
        let prediction = predict(&[f32::NAN, 0.3, 0.2, 0.1], &labels()).unwrap();
        assert_eq!(prediction.index, 1);
        assert!(predict(&[f32::NAN; 4], &labels()).is_err());
    }

    #[test]
    fn predict_rejects_label_mismatch() {
        let err = predict(&[0.5, 0.5], &labels()).unwrap_err();
        assert!(matches!(err, Error::Classification { .. }));
        assert!(err.to_string().contains("2 outputs"));
    }

    #[test]
    fn softmax_normalizes() {
        let probs = softmax(&[1.0, 2.0, 3.0, 1000.0]);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!(probs[3] > 0.99);
        assert!(probs.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn forward_pass_yields_one_score_per_output() {
        let classifier = pixel_sum_classifier(Activation::Identity);
        let img = RgbImage::from_fn(2, 2, |x, y| {
            if (x, y) == (1, 0) {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        });
        let scores = classifier.scores(&img).unwrap();
        assert_eq!(scores.len(), 4);
        assert!((scores[1] - 3.0).abs() < 1e-5, "{scores:?}");
        for i in [0, 2, 3] {
            assert!((scores[i] + 3.0).abs() < 1e-5, "{scores:?}");
        }

        let prediction = classifier.classify(&img, &labels()).unwrap();
        assert_eq!(prediction.index, 1);
        assert_eq!(prediction.label, "Ulcerative Colitis");
        assert!((prediction.score - 3.0).abs() < 1e-5);
    }

    #[test]
    fn larger_images_are_fitted_to_the_input() {
        let classifier = pixel_sum_classifier(Activation::Identity);
        // bright bottom-right quadrant ends up in the bottom-right input pixel
        let prediction = classifier.classify(&bright_pixel(8, 8, 4, 4), &labels()).unwrap();
        assert_eq!(prediction.index, 3);
        assert_eq!(prediction.label, "Esophagitis");
    }

    #[test]
    fn softmax_activation_yields_probabilities() {
        let classifier = pixel_sum_classifier(Activation::Softmax);
        let scores = classifier.scores(&bright_pixel(2, 2, 1, 1)).unwrap();
        assert!((scores.iter().sum::<f32>() - 1.0).abs() < 1e-5);

        let prediction = classifier.classify(&bright_pixel(2, 2, 1, 1), &labels()).unwrap();
        assert_eq!(prediction.index, 3);
        assert!(prediction.score > 0.5 && prediction.score < 1.0);
    }

    #[test]
    fn classify_checks_output_count_against_labels() {
        let classifier = pixel_sum_classifier(Activation::Identity);
        let two = Labels::parse("0 Normal\n1 Polyps").unwrap();
        let err = classifier.classify(&bright_pixel(2, 2, 0, 0), &two).unwrap_err();
        assert_eq!(err.to_string(), "model has 4 outputs but there are 2 labels");
    }

    #[test]
    fn empty_image_is_not_classified() {
        let classifier = pixel_sum_classifier(Activation::Identity);
        let err = classifier.scores(&RgbImage::new(0, 0)).unwrap_err();
        assert!(matches!(err, Error::InvalidImage { .. }));
    }

    #[test]
    fn missing_model_file() {
        let err = Classifier::from_path("no/such/model.onnx", Options::default()).unwrap_err();
        assert!(matches!(err, Error::ModelNotFound { .. }));
    }

    #[test]
    fn garbage_model_bytes() {
        let err = Classifier::from_bytes(b"not an onnx graph", Options::default()).unwrap_err();
        assert!(matches!(err, Error::ModelLoad { .. }));
    }

    #[test]
    fn zero_sized_input_is_rejected() {
        let options = Options {
            width: 0,
            ..Options::default()
        };
        assert!(matches!(
            Classifier::from_bytes(&[], options),
            Err(Error::InvalidOptions { .. })
        ));
    }
}

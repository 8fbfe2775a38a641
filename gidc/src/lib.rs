mod clahe;
mod color;
mod error;
mod labels;
mod model;
mod schemas;
mod upload;

pub use clahe::{Clahe, TileGrid};
pub use color::Lab;
pub use error::{Error, Result};
pub use labels::Labels;
pub use model::{predict, Activation, Classifier, Layout, Normalization, Options};
pub use schemas::*;
pub use upload::{check_extension, decode_upload, is_supported_extension, SUPPORTED_EXTENSIONS};

pub use image;

pub use tract_onnx;

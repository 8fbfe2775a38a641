use gidc::{Clahe, Options};

/// Fixed locations of the demo's assets, relative to the served page.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub model_url: &'static str,
    pub labels_url: &'static str,
    pub worker_url: &'static str,
    pub clahe: Clahe,
    pub options: Options,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_url: "./models/classifier.onnx",
            labels_url: "./labels.txt",
            worker_url: "./worker.js",
            clahe: Clahe::default(),
            options: Options::default(),
        }
    }
}

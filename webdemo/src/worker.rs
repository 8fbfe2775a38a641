use crate::imagebuf::ImageBuf;

use anyhow::{anyhow, Result as AnyhowResult};
use futures::{sink::SinkExt, StreamExt};
use gidc::{Classifier, Labels, Options, Prediction};
use gloo_worker::reactor::{reactor, ReactorScope};
use leptos::logging::{error, log};
use serde::{Deserialize, Serialize};

type Scope = ReactorScope<Request, Response>;

/// Sent in order: `LoadModel`, `LoadLabels`, then any number of `Classify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Request {
    LoadModel { model: Vec<u8>, options: Options },
    LoadLabels(Vec<String>),
    Classify(ImageBuf),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    ModelLoaded,
    Loaded { classes: usize },
    Prediction(Prediction),
    Failed(String),
}

#[derive(Default)]
struct WorkerState {
    classifier: Option<Classifier>,
    labels: Option<Labels>,
}

#[reactor]
pub async fn ClassifierWorker(mut scope: Scope) {
    log!("entered classifier worker");
    let mut state = WorkerState::default();
    while let Some(request) = scope.next().await {
        let response = handle_request(&mut state, request);
        if let Err(e) = scope.send(response).await {
            error!("worker failed to reply: {:?}", e);
            return;
        }
    }
    log!("worker finished");
}

fn handle_request(state: &mut WorkerState, request: Request) -> Response {
    match request {
        Request::LoadModel { model, options } => match load_model(&model, options) {
            Ok(classifier) => {
                state.classifier = Some(classifier);
                Response::ModelLoaded
            }
            Err(e) => {
                error!("failed to load model: {:?}", e);
                Response::Failed(format!("{e:#}"))
            }
        },
        Request::LoadLabels(names) => match Labels::new(names) {
            Ok(labels) => {
                let classes = labels.len();
                state.labels = Some(labels);
                Response::Loaded { classes }
            }
            Err(e) => {
                error!("failed to load labels: {:?}", e);
                Response::Failed(format!("{e:#}"))
            }
        },
        Request::Classify(input) => match classify(state, &input) {
            Ok(prediction) => Response::Prediction(prediction),
            Err(e) => {
                error!("classification failed: {:?}", e);
                Response::Failed(format!("{e:#}"))
            }
        },
    }
}

fn load_model(bytes: &[u8], options: Options) -> AnyhowResult<Classifier> {
    let clock = web_time::Instant::now();
    let classifier = Classifier::from_bytes(bytes, options)?;
    log!("parsed model in {:?}", clock.elapsed());
    Ok(classifier)
}

fn classify(state: &WorkerState, input: &ImageBuf) -> AnyhowResult<Prediction> {
    let classifier = state
        .classifier
        .as_ref()
        .ok_or_else(|| anyhow!("model is not loaded"))?;
    let labels = state
        .labels
        .as_ref()
        .ok_or_else(|| anyhow!("labels are not loaded"))?;
    let img = input.to_rgb_image()?;
    let clock = web_time::Instant::now();
    let prediction = classifier.classify(&img, labels)?;
    log!("classification took: {:?}", clock.elapsed());
    Ok(prediction)
}

use crate::{
    bridge::WorkerHandle,
    config::Config,
    imagebuf::{bytes_data_url, png_data_url, ImageBuf},
    messages,
    state::{PageState, Phase},
    worker::{Request, Response},
};

use anyhow::{anyhow, bail, Result as AnyhowResult};
use gidc::{image::RgbImage, Labels, Prediction};
use gloo_net::http;
use leptos::{logging::*, prelude::*};
use wasm_bindgen_futures::JsFuture;

#[derive(Debug)]
enum StartupError {
    Model(anyhow::Error),
    LabelsNotFound,
    Labels(anyhow::Error),
}

impl StartupError {
    fn user_message(&self) -> String {
        match self {
            Self::Model(e) => messages::model_error(format!("{e:#}")),
            Self::LabelsNotFound => messages::LABELS_NOT_FOUND.to_owned(),
            Self::Labels(e) => messages::labels_error(format!("{e:#}")),
        }
    }
}

/// Fetches the model and labels and hands them to the worker. Any failure halts the page.
pub async fn startup(config: Config, page: PageState, worker: WorkerHandle) {
    match load_classifier(config, &worker).await {
        Ok(classes) => {
            log!("classifier ready with {} classes", classes);
            page.phase.set(Phase::Ready);
        }
        Err(e) => {
            error!("startup failed: {:?}", e);
            page.phase.set(Phase::Halted(e.user_message()));
        }
    }
}

async fn load_classifier(config: Config, worker: &WorkerHandle) -> Result<usize, StartupError> {
    let clock = web_time::Instant::now();
    let model = fetch_model(config.model_url)
        .await
        .map_err(StartupError::Model)?;
    log!("fetched {} model bytes in {:?}", model.len(), clock.elapsed());

    // the model is checked before the labels are fetched
    let request = Request::LoadModel {
        model,
        options: config.options,
    };
    match worker.call(request).await.map_err(StartupError::Model)? {
        Response::ModelLoaded => {}
        Response::Failed(message) => return Err(StartupError::Model(anyhow!(message))),
        other => {
            return Err(StartupError::Model(anyhow!(
                "unexpected worker response: {other:?}"
            )))
        }
    }

    let labels = fetch_labels(config.labels_url).await?;
    let request = Request::LoadLabels(labels.into_names());
    match worker.call(request).await.map_err(StartupError::Labels)? {
        Response::Loaded { classes } => Ok(classes),
        Response::Failed(message) => Err(StartupError::Labels(anyhow!(message))),
        other => Err(StartupError::Labels(anyhow!(
            "unexpected worker response: {other:?}"
        ))),
    }
}

async fn fetch_model(url: &str) -> AnyhowResult<Vec<u8>> {
    let response = http::Request::get(url)
        .send()
        .await
        .map_err(|e| anyhow!("GET {url}: {e}"))?;
    if !response.ok() {
        bail!("GET {url}: HTTP {}", response.status());
    }
    response
        .binary()
        .await
        .map_err(|e| anyhow!("read {url}: {e}"))
}

async fn fetch_labels(url: &str) -> Result<Labels, StartupError> {
    let response = http::Request::get(url)
        .send()
        .await
        .map_err(|e| StartupError::Labels(anyhow!("GET {url}: {e}")))?;
    if response.status() == 404 {
        return Err(StartupError::LabelsNotFound);
    }
    if !response.ok() {
        return Err(StartupError::Labels(anyhow!(
            "GET {url}: HTTP {}",
            response.status()
        )));
    }
    let text = response
        .text()
        .await
        .map_err(|e| StartupError::Labels(anyhow!("read {url}: {e}")))?;
    Labels::parse(&text).map_err(|e| StartupError::Labels(e.into()))
}

/// Runs one upload through decode, CLAHE and classification, publishing each
/// stage to the page as it completes.
pub async fn handle_upload(
    config: Config,
    page: PageState,
    worker: WorkerHandle,
    file: web_sys::File,
) {
    let ticket = page.begin_upload();
    let name = file.name();
    log!("processing upload {:?}", name);

    let enhanced = match enhance(config, page, ticket, &file).await {
        Ok(Some(enhanced)) => enhanced,
        Ok(None) => return,
        Err(e) => {
            error!("upload {:?} failed: {:?}", name, e);
            page.fail(ticket, messages::upload_error(&e));
            return;
        }
    };

    page.classifying.set(true);
    let clock = web_time::Instant::now();
    match classify(&worker, &enhanced).await {
        Ok(prediction) => {
            log!("prediction took: {:?}", clock.elapsed());
            if page.is_current(ticket) {
                page.classifying.set(false);
                page.prediction.set(Some(prediction));
            }
        }
        Err(e) => {
            error!("classification of {:?} failed: {:?}", name, e);
            page.fail(ticket, messages::classification_error(format!("{e:#}")));
        }
    }
}

/// Returns `None` when a newer upload superseded this one.
async fn enhance(
    config: Config,
    page: PageState,
    ticket: u64,
    file: &web_sys::File,
) -> AnyhowResult<Option<RgbImage>> {
    let name = file.name();
    // rejected before reading so large unsupported files cost nothing
    gidc::check_extension(&name)?;
    let bytes = read_file(file).await?;
    if !page.is_current(ticket) {
        return Ok(None);
    }

    let clock = web_time::Instant::now();
    let img = gidc::decode_upload(&name, &bytes)?;
    let enhanced = config.clahe.apply_rgb(&img)?;
    log!("CLAHE processing took: {:?}", clock.elapsed());

    page.show_images(ticket, bytes_data_url(&bytes)?, png_data_url(&enhanced)?);
    Ok(Some(enhanced))
}

async fn classify(worker: &WorkerHandle, img: &RgbImage) -> AnyhowResult<Prediction> {
    match worker.call(Request::Classify(ImageBuf::from_rgb(img))).await? {
        Response::Prediction(prediction) => Ok(prediction),
        Response::Failed(message) => Err(anyhow!(message)),
        other => bail!("unexpected worker response: {other:?}"),
    }
}

async fn read_file(file: &web_sys::File) -> AnyhowResult<Vec<u8>> {
    let buffer = JsFuture::from(file.array_buffer())
        .await
        .map_err(|e| anyhow!("read {}: {:?}", file.name(), e))?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

use crate::{
    bridge::WorkerHandle,
    config::Config,
    messages,
    pipeline::{handle_upload, startup},
    state::{PageState, Phase},
};
use leptos::{ev::Event, logging::*, prelude::*, task::spawn_local};
use wasm_bindgen::JsCast;
use web_sys::HtmlInputElement;

const ACCEPT: &str = ".jpeg,.jpg,.png,image/jpeg,image/png";

#[component]
pub fn App() -> impl IntoView {
    let config = Config::default();
    let page = PageState::new();
    let worker = WorkerHandle::spawn(config.worker_url);
    spawn_local(startup(config, page, worker.clone()));

    view! {
      <main>
        <h1>{messages::TITLE}</h1>
        {move || match page.phase.get() {
            Phase::Loading => view! { <p class="info">{messages::LOADING}</p> }.into_any(),
            Phase::Halted(message) => {
                view! {
                  <section>
                    <h2>{messages::HEADER}</h2>
                    <input type="file" accept=ACCEPT disabled=true />
                    <p class="error">{message}</p>
                  </section>
                }
                    .into_any()
            }
            Phase::Ready => {
                view! { <Classification config=config page=page worker=worker.clone() /> }
                    .into_any()
            }
        }}
      </main>
    }
}

#[component]
fn Classification(config: Config, page: PageState, worker: WorkerHandle) -> impl IntoView {
    let on_change = move |ev: Event| {
        let Some(file) = selected_file(&ev) else {
            log!("upload cleared");
            page.clear();
            return;
        };
        spawn_local(handle_upload(config, page, worker.clone(), file));
    };

    view! {
      <section>
        <h2>{messages::HEADER}</h2>
        <input type="file" accept=ACCEPT on:change=on_change />
        {move || page.error.get().map(|message| view! { <p class="error">{message}</p> })}
        {move || page.idle().then(|| view! { <p class="info">{messages::NO_FILE}</p> })}
        {move || {
            page.original
                .get()
                .map(|src| view! { <Figure src=src caption=messages::ORIGINAL_CAPTION /> })
        }}
        {move || {
            page.enhanced
                .get()
                .map(|src| view! { <Figure src=src caption=messages::ENHANCED_CAPTION /> })
        }}
        {move || {
            page.classifying.get().then(|| view! { <p class="info">{messages::CLASSIFYING}</p> })
        }}
        {move || {
            page.prediction
                .get()
                .map(|prediction| {
                    let score = messages::score(&prediction);
                    view! {
                      <h2 class="label">{prediction.label}</h2>
                      <h3 class="score">{score}</h3>
                    }
                })
        }}
      </section>
    }
}

#[component]
fn Figure(src: String, caption: &'static str) -> impl IntoView {
    view! {
      <figure>
        <img src=src alt=caption />
        <figcaption>{caption}</figcaption>
      </figure>
    }
}

fn selected_file(ev: &Event) -> Option<web_sys::File> {
    let input = ev.target()?.dyn_into::<HtmlInputElement>().ok()?;
    input.files()?.get(0)
}

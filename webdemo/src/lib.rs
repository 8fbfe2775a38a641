mod app;
mod bridge;
mod config;
mod imagebuf;
mod messages;
mod pipeline;
mod state;
mod worker;

pub use app::App;
pub use config::Config;
pub use worker::{ClassifierWorker, Request, Response};

use crate::worker::{ClassifierWorker, Request, Response};

use anyhow::{anyhow, Result as AnyhowResult};
use futures::{
    channel::{mpsc, oneshot},
    StreamExt,
};
use gloo_worker::{reactor::ReactorBridge, Spawnable};
use leptos::{logging::*, task::spawn_local};

type Bridge = ReactorBridge<ClassifierWorker>;

struct Job {
    request: Request,
    reply: oneshot::Sender<Response>,
}

/// Cheap handle to the classifier worker. Requests are answered in the order
/// they were made, one at a time.
#[derive(Clone)]
pub struct WorkerHandle {
    jobs: mpsc::UnboundedSender<Job>,
}

impl WorkerHandle {
    pub fn spawn(worker_url: &str) -> Self {
        let bridge = ClassifierWorker::spawner().spawn(worker_url);
        let (jobs, queue) = mpsc::unbounded();
        spawn_local(drive(bridge, queue));
        Self { jobs }
    }

    pub async fn call(&self, request: Request) -> AnyhowResult<Response> {
        let (reply, response) = oneshot::channel();
        self.jobs
            .unbounded_send(Job { request, reply })
            .map_err(|_| anyhow!("classifier worker is gone"))?;
        response
            .await
            .map_err(|_| anyhow!("classifier worker dropped the request"))
    }
}

async fn drive(mut bridge: Bridge, mut queue: mpsc::UnboundedReceiver<Job>) {
    while let Some(Job { request, reply }) = queue.next().await {
        bridge.send_input(request);
        let Some(response) = bridge.next().await else {
            error!("classifier worker closed its output");
            return;
        };
        if reply.send(response).is_err() {
            log!("response arrived after the caller went away");
        }
    }
}

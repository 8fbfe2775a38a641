use gloo_worker::Registrable;
use webdemo::ClassifierWorker;

fn main() {
    ClassifierWorker::registrar().register();
}

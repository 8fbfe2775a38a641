use gidc::Prediction;
use leptos::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Loading,
    Ready,
    /// Startup failed; the uploader is disabled and the message shown below it.
    Halted(String),
}

#[derive(Debug, Clone, Copy)]
pub struct PageState {
    pub phase: RwSignal<Phase>,
    pub original: RwSignal<Option<String>>,
    pub enhanced: RwSignal<Option<String>>,
    pub prediction: RwSignal<Option<Prediction>>,
    pub error: RwSignal<Option<String>>,
    /// A file was picked and is still being read or enhanced.
    pub reading: RwSignal<bool>,
    pub classifying: RwSignal<bool>,
    upload: RwSignal<u64>,
}

impl PageState {
    pub fn new() -> Self {
        Self {
            phase: RwSignal::new(Phase::Loading),
            original: RwSignal::new(None),
            enhanced: RwSignal::new(None),
            prediction: RwSignal::new(None),
            error: RwSignal::new(None),
            reading: RwSignal::new(false),
            classifying: RwSignal::new(false),
            upload: RwSignal::new(0),
        }
    }

    /// Clears previous results and returns a ticket for the new upload.
    pub fn begin_upload(&self) -> u64 {
        let ticket = self.clear();
        self.reading.set(true);
        ticket
    }

    /// Drops all results, including those of an upload still in flight.
    pub fn clear(&self) -> u64 {
        self.original.set(None);
        self.enhanced.set(None);
        self.prediction.set(None);
        self.error.set(None);
        self.reading.set(false);
        self.classifying.set(false);
        self.upload.update(|n| *n += 1);
        self.upload.get_untracked()
    }

    /// False once a newer upload has started.
    pub fn is_current(&self, ticket: u64) -> bool {
        self.upload.get_untracked() == ticket
    }

    pub fn show_images(&self, ticket: u64, original: String, enhanced: String) {
        if self.is_current(ticket) {
            self.reading.set(false);
            self.original.set(Some(original));
            self.enhanced.set(Some(enhanced));
        }
    }

    pub fn fail(&self, ticket: u64, message: String) {
        if self.is_current(ticket) {
            self.reading.set(false);
            self.classifying.set(false);
            self.error.set(Some(message));
        }
    }

    /// Nothing uploaded, nothing in progress and no error to show.
    pub fn idle(&self) -> bool {
        !self.reading.get()
            && self.original.with(Option::is_none)
            && self.error.with(Option::is_none)
    }
}

impl Default for PageState {
    fn default() -> Self {
        Self::new()
    }
}

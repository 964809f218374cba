//! Scripted collaborators
//!
//! `ScriptedModel` answers structured calls from per-request-name queues and
//! records every call; an unscripted call fails like a network error, which
//! exercises the fallback paths.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use dreamly_roots::services::{
    LanguageModel, MapIngestEvent, MapIngestSink, ModelError, StructuredRequest, TextRequest,
};

pub struct ScriptedModel {
    name: String,
    json: Mutex<HashMap<String, VecDeque<Result<Value, ModelError>>>>,
    text: Mutex<VecDeque<Result<String, ModelError>>>,
    calls: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            json: Mutex::new(HashMap::new()),
            text: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue a JSON answer for requests named `request` ("root_words", "roots_translation", "emoji_pick")
    pub fn push_json(&self, request: &str, payload: Value) {
        self.json
            .lock()
            .unwrap()
            .entry(request.to_string())
            .or_default()
            .push_back(Ok(payload));
    }

    pub fn push_json_error(&self, request: &str, error: ModelError) {
        self.json
            .lock()
            .unwrap()
            .entry(request.to_string())
            .or_default()
            .push_back(Err(error));
    }

    pub fn push_text(&self, text: &str) {
        self.text.lock().unwrap().push_back(Ok(text.to_string()));
    }

    /// Request names in call order (`"text"` for free-text calls)
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_named(&self, request: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == request).count()
    }

    /// User prompts in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model_name(&self) -> &str {
        &self.name
    }

    async fn complete_json(&self, request: StructuredRequest) -> Result<Value, ModelError> {
        self.calls.lock().unwrap().push(request.name.clone());
        self.prompts.lock().unwrap().push(request.user.clone());

        self.json
            .lock()
            .unwrap()
            .get_mut(&request.name)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(ModelError::Network(format!("unscripted {}", request.name))))
    }

    async fn complete_text(&self, request: TextRequest) -> Result<String, ModelError> {
        self.calls.lock().unwrap().push("text".to_string());
        self.prompts.lock().unwrap().push(request.user.clone());

        self.text
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::Network("unscripted text".to_string())))
    }
}

/// Map ingest sink that keeps every published event
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<MapIngestEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<MapIngestEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl MapIngestSink for RecordingSink {
    fn publish(&self, event: MapIngestEvent) {
        self.events.lock().unwrap().push(event);
    }
}

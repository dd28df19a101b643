//! Contract with the external text generation service.
//!
//! The service itself lives elsewhere. This module builds the requests, decodes the
//! responses, and makes sure nothing arriving after a cancellation is applied.

use std::cell::{Cell, RefCell};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::rc::Rc;

use crate::error::{ConfigurationError, ExternalServiceError, TrainingError};
use crate::task::{Task, decode_task_batch};

pub const DESCRIPTOR_TEMPLATE_FILE: &str = "descriptorgenerator.txt";
pub const TASK_TEMPLATE_FILE: &str = "taskgenerator.txt";
pub const CHAT_TEMPLATE_FILE: &str = "patient_chat.txt";

const CHAT_FALLBACK_TEMPLATE: &str = "You are a patient simulation.";

/// System prompts for each kind of generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplates {
    descriptor: String,
    task: String,
    chat: String,
}

impl PromptTemplates {
    /// A missing chat template falls back to a generic patient persona; the other two
    /// are required.
    pub fn new(
        descriptor: impl Into<String>,
        task: impl Into<String>,
        chat: Option<String>,
    ) -> Result<Self, ConfigurationError> {
        let descriptor = require_template(DESCRIPTOR_TEMPLATE_FILE, descriptor.into())?;
        let task = require_template(TASK_TEMPLATE_FILE, task.into())?;
        let chat = chat
            .filter(|template| !template.trim().is_empty())
            .unwrap_or_else(|| CHAT_FALLBACK_TEMPLATE.to_string());

        Ok(Self {
            descriptor,
            task,
            chat,
        })
    }

    pub fn from_directory(root: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let root = root.as_ref();
        let descriptor = read_template(root, DESCRIPTOR_TEMPLATE_FILE)?.ok_or_else(|| {
            ConfigurationError::MissingPromptTemplate {
                name: DESCRIPTOR_TEMPLATE_FILE.to_string(),
            }
        })?;
        let task = read_template(root, TASK_TEMPLATE_FILE)?.ok_or_else(|| {
            ConfigurationError::MissingPromptTemplate {
                name: TASK_TEMPLATE_FILE.to_string(),
            }
        })?;
        let chat = read_template(root, CHAT_TEMPLATE_FILE)?;
        if chat.is_none() {
            log::warn!(
                "{} not found in {}, using the generic patient persona",
                CHAT_TEMPLATE_FILE,
                root.display()
            );
        }

        Self::new(descriptor, task, chat)
    }

    pub fn descriptor_request(&self, emotion: &str) -> GenerationRequest {
        GenerationRequest {
            system_prompt: self.descriptor.clone(),
            user_content: format!("List descriptors for: {}", emotion),
        }
    }

    pub fn task_request(&self, emotion: &str, descriptors: Option<&str>) -> GenerationRequest {
        let descriptors = descriptors
            .filter(|text| !text.trim().is_empty())
            .unwrap_or("N/A");

        GenerationRequest {
            system_prompt: self.task.clone(),
            user_content: format!(
                "Emotion: {}\nDescriptors: {}\n\nGenerate training tasks based on this.",
                emotion, descriptors
            ),
        }
    }

    pub fn chat_request(
        &self,
        emotion: Option<&str>,
        descriptors: Option<&str>,
        history: &[ChatMessage],
    ) -> ChatRequest {
        let system_prompt = self
            .chat
            .replacen("{{EMOTION}}", emotion.unwrap_or("Unknown"), 1)
            .replacen("{{DESCRIPTORS}}", descriptors.unwrap_or("None"), 1);

        ChatRequest {
            system_prompt,
            messages: history.to_vec(),
        }
    }
}

fn require_template(name: &str, template: String) -> Result<String, ConfigurationError> {
    if template.trim().is_empty() {
        Err(ConfigurationError::MissingPromptTemplate {
            name: name.to_string(),
        })
    } else {
        Ok(template)
    }
}

fn read_template(root: &Path, name: &str) -> Result<Option<String>, ConfigurationError> {
    let path = root.join(name);
    match fs::read_to_string(&path) {
        Ok(template) => Ok(Some(template)),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigurationError::ReadError {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// One-shot generation input.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    /// The simulated patient.
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub system_prompt: String,
    pub messages: Vec<ChatMessage>,
}

/// Which one-shot generation a request is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationKind {
    Descriptors,
    Tasks,
}

#[derive(Debug, Default, serde::Deserialize)]
struct ResponseEnvelope {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Reads a `{"result": ...}` / `{"error": ...}` body.
pub fn decode_response(status: u16, body: &str) -> Result<String, ExternalServiceError> {
    let success = (200..300).contains(&status);
    let envelope = match serde_json::from_str::<ResponseEnvelope>(body) {
        Ok(envelope) => envelope,
        Err(_) if !success => ResponseEnvelope::default(),
        Err(error) => {
            return Err(ExternalServiceError::MalformedResponse {
                message: error.to_string(),
            });
        }
    };

    match (success, envelope.result, envelope.error) {
        (false, _, error) => Err(ExternalServiceError::Status {
            status,
            message: error.unwrap_or_else(|| body.chars().take(200).collect()),
        }),
        (true, _, Some(message)) => Err(ExternalServiceError::Reported { message }),
        (true, Some(result), None) => Ok(result),
        (true, None, None) => Err(ExternalServiceError::MalformedResponse {
            message: "response has neither result nor error".to_string(),
        }),
    }
}

/// Shared flag that tells in-flight work its result is no longer wanted.
///
/// Clones observe the same flag. Not `Send`; it lives on the UI thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Rc<Cell<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }

    pub fn check(&self) -> Result<(), ExternalServiceError> {
        if self.is_cancelled() {
            Err(ExternalServiceError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Holds the token of the latest request of one kind.
///
/// Starting a new request cancels whatever the slot held before, so at most one result
/// per slot is ever applied.
#[derive(Debug, Clone, Default)]
pub struct RequestSlot {
    current: Rc<RefCell<CancelToken>>,
}

impl RequestSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> CancelToken {
        let fresh = CancelToken::new();
        self.current.replace(fresh.clone()).cancel();
        fresh
    }

    pub fn cancel(&self) {
        self.current.borrow().cancel();
    }
}

/// Accumulates a streamed chat reply as chunks arrive.
#[derive(Debug, Clone)]
pub struct ChatStream {
    text: String,
    // Tail of a multi-byte character split across network chunks.
    pending: Vec<u8>,
    cancel: CancelToken,
    finished: bool,
}

impl ChatStream {
    pub fn new(cancel: CancelToken) -> Self {
        Self {
            text: String::new(),
            pending: Vec::new(),
            cancel,
            finished: false,
        }
    }

    /// Appends a chunk. Returns `false`, dropping the chunk, once cancelled or finished.
    pub fn push(&mut self, chunk: &str) -> bool {
        if self.finished || self.cancel.is_cancelled() {
            return false;
        }

        self.text.push_str(chunk);
        true
    }

    /// Appends raw UTF-8 bytes from the network.
    ///
    /// A character cut at the end of `chunk` waits for the next one; invalid sequences
    /// become U+FFFD. Same return contract as [`ChatStream::push`].
    pub fn push_bytes(&mut self, chunk: &[u8]) -> bool {
        if self.finished || self.cancel.is_cancelled() {
            return false;
        }

        self.pending.extend_from_slice(chunk);
        let mut start = 0;
        while start < self.pending.len() {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(valid) => {
                    self.text.push_str(valid);
                    start = self.pending.len();
                }
                Err(error) => {
                    let valid_end = start + error.valid_up_to();
                    self.text
                        .push_str(&String::from_utf8_lossy(&self.pending[start..valid_end]));
                    match error.error_len() {
                        Some(len) => {
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + len;
                        }
                        None => {
                            start = valid_end;
                            break;
                        }
                    }
                }
            }
        }
        self.pending.drain(..start);
        true
    }

    pub fn finish(&mut self) {
        if !self.pending.is_empty() && !self.cancel.is_cancelled() {
            self.text.push_str(&String::from_utf8_lossy(&self.pending));
        }
        self.pending.clear();
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The completed reply as a chat message, if the stream ended without cancellation.
    pub fn into_message(self) -> Option<ChatMessage> {
        if self.finished && !self.cancel.is_cancelled() {
            Some(ChatMessage::model(self.text))
        } else {
            None
        }
    }
}

/// The generation service as seen by the training views.
#[allow(async_fn_in_trait)]
pub trait TextGenerator {
    async fn generate(
        &self,
        kind: GenerationKind,
        request: &GenerationRequest,
    ) -> Result<String, ExternalServiceError>;

    /// Streams the reply into `stream`, calling [`ChatStream::finish`] at the end.
    async fn chat(
        &self,
        request: &ChatRequest,
        stream: &mut ChatStream,
    ) -> Result<(), ExternalServiceError>;
}

/// Asks for descriptors of `emotion`. Results arriving after `cancel` fires are dropped.
pub async fn generate_descriptors<G: TextGenerator>(
    generator: &G,
    templates: &PromptTemplates,
    emotion: &str,
    cancel: &CancelToken,
) -> Result<String, TrainingError> {
    cancel.check()?;
    let request = templates.descriptor_request(emotion);
    let text = generator
        .generate(GenerationKind::Descriptors, &request)
        .await
        .inspect_err(|error| log::warn!("descriptor generation failed: {}", error))?;
    cancel.check()?;

    Ok(text.trim().to_string())
}

/// Asks for a task batch and validates it before anything reaches the session.
pub async fn generate_tasks<G: TextGenerator>(
    generator: &G,
    templates: &PromptTemplates,
    emotion: &str,
    descriptors: Option<&str>,
    cancel: &CancelToken,
) -> Result<Vec<Task>, TrainingError> {
    cancel.check()?;
    let request = templates.task_request(emotion, descriptors);
    let text = generator
        .generate(GenerationKind::Tasks, &request)
        .await
        .inspect_err(|error| log::warn!("task generation failed: {}", error))?;
    cancel.check()?;

    let tasks = decode_task_batch(&text)?;
    log::info!("generated {} tasks for {}", tasks.len(), emotion);
    Ok(tasks)
}

/// Streams the simulated patient's next reply.
pub async fn chat_reply<G: TextGenerator>(
    generator: &G,
    templates: &PromptTemplates,
    emotion: Option<&str>,
    descriptors: Option<&str>,
    history: &[ChatMessage],
    cancel: &CancelToken,
) -> Result<ChatMessage, TrainingError> {
    cancel.check()?;
    let request = templates.chat_request(emotion, descriptors, history);
    let mut stream = ChatStream::new(cancel.clone());

    generator
        .chat(&request, &mut stream)
        .await
        .inspect_err(|error| log::warn!("chat stream failed: {}", error))?;

    stream
        .into_message()
        .ok_or(TrainingError::ExternalService(ExternalServiceError::Cancelled))
}

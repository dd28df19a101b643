#![cfg(target_arch = "wasm32")]

//! Browser bindings: HTTP access to the generation service and local storage.

use gloo_net::http::{Request, Response};
use js_sys::{Array, Function, Promise, Reflect, Uint8Array};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use crate::error::ExternalServiceError;
use crate::generation::{
    ChatRequest, ChatStream, GenerationKind, GenerationRequest, TextGenerator, decode_response,
};
use crate::settings::SettingsStore;

/// Service routes, relative to the page origin.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub descriptors: String,
    pub tasks: String,
    pub chat: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            descriptors: "/api/generate-descriptors".to_string(),
            tasks: "/api/generate-tasks".to_string(),
            chat: "/api/chat".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HttpGenerator {
    endpoints: Endpoints,
}

impl HttpGenerator {
    pub fn new(endpoints: Endpoints) -> Self {
        Self { endpoints }
    }
}

fn unreachable(error: gloo_net::Error) -> ExternalServiceError {
    ExternalServiceError::Unreachable {
        message: error.to_string(),
    }
}

fn malformed(message: impl Into<String>) -> ExternalServiceError {
    ExternalServiceError::MalformedResponse {
        message: message.into(),
    }
}

async fn send_json<T: serde::Serialize>(
    url: &str,
    body: &T,
) -> Result<Response, ExternalServiceError> {
    Request::post(url)
        .json(body)
        .map_err(unreachable)?
        .send()
        .await
        .map_err(unreachable)
}

async fn read_text(response: &Response) -> Result<String, ExternalServiceError> {
    response
        .text()
        .await
        .map_err(|error| malformed(error.to_string()))
}

fn method(target: &JsValue, name: &str) -> Result<Function, ExternalServiceError> {
    Reflect::get(target, &JsValue::from_str(name))
        .ok()
        .and_then(|value| value.dyn_into::<Function>().ok())
        .ok_or_else(|| malformed(format!("response body has no {}()", name)))
}

/// Feeds a fetch body into `stream` one network chunk at a time.
async fn stream_body(body: JsValue, stream: &mut ChatStream) -> Result<(), ExternalServiceError> {
    let reader = method(&body, "getReader")?
        .call0(&body)
        .map_err(|error| malformed(format!("{:?}", error)))?;
    let read = method(&reader, "read")?;

    loop {
        let promise = read
            .call0(&reader)
            .and_then(|value| value.dyn_into::<Promise>())
            .map_err(|error| malformed(format!("{:?}", error)))?;
        let chunk = JsFuture::from(promise)
            .await
            .map_err(|error| ExternalServiceError::Unreachable {
                message: format!("{:?}", error),
            })?;

        let done = Reflect::get(&chunk, &JsValue::from_str("done"))
            .ok()
            .and_then(|done| done.as_bool())
            .unwrap_or(true);
        if done {
            break;
        }

        let value = Reflect::get(&chunk, &JsValue::from_str("value"))
            .map_err(|error| malformed(format!("{:?}", error)))?;
        if !stream.push_bytes(&Uint8Array::new(&value).to_vec()) {
            if let Ok(cancel) = method(&reader, "cancel") {
                let _ = cancel.call0(&reader);
            }
            log::debug!("chat stream abandoned after cancellation");
            break;
        }
    }

    stream.finish();
    Ok(())
}

impl TextGenerator for HttpGenerator {
    async fn generate(
        &self,
        kind: GenerationKind,
        request: &GenerationRequest,
    ) -> Result<String, ExternalServiceError> {
        let url = match kind {
            GenerationKind::Descriptors => &self.endpoints.descriptors,
            GenerationKind::Tasks => &self.endpoints.tasks,
        };

        let response = send_json(url, request).await?;
        let body = read_text(&response).await?;
        decode_response(response.status(), &body)
    }

    async fn chat(
        &self,
        request: &ChatRequest,
        stream: &mut ChatStream,
    ) -> Result<(), ExternalServiceError> {
        let response = send_json(&self.endpoints.chat, request).await?;
        if !response.ok() {
            let body = read_text(&response).await?;
            return decode_response(response.status(), &body).map(|_| ());
        }

        match response.body() {
            Some(body) => stream_body(JsValue::from(body), stream).await,
            None => {
                stream.push(&read_text(&response).await?);
                stream.finish();
                Ok(())
            }
        }
    }
}

/// [`SettingsStore`] over `window.localStorage`. Storage failures are logged and ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorageStore;

fn local_storage() -> Option<JsValue> {
    Reflect::get(&js_sys::global(), &JsValue::from_str("localStorage"))
        .ok()
        .filter(|storage| !storage.is_undefined() && !storage.is_null())
}

fn call_storage(method: &str, args: &Array) -> Option<JsValue> {
    let storage = local_storage()?;
    let function = Reflect::get(&storage, &JsValue::from_str(method))
        .ok()?
        .dyn_into::<Function>()
        .ok()?;

    match function.apply(&storage, args) {
        Ok(value) => Some(value),
        Err(error) => {
            log::warn!("localStorage.{} failed: {:?}", method, error);
            None
        }
    }
}

impl SettingsStore for LocalStorageStore {
    fn load(&self, key: &str) -> Option<String> {
        call_storage("getItem", &Array::of1(&JsValue::from_str(key)))?.as_string()
    }

    fn save(&mut self, key: &str, value: &str) {
        call_storage(
            "setItem",
            &Array::of2(&JsValue::from_str(key), &JsValue::from_str(value)),
        );
    }
}

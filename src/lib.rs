pub mod demo;
pub mod emotion;
pub mod engine;
pub mod error;
pub mod generation;
pub mod palette;
pub mod progress;
pub mod settings;
pub mod task;
pub mod world;

#[cfg(target_arch = "wasm32")]
pub mod client;

pub use demo::{DEMO_SWATCHES, demo_tasks};
pub use emotion::{ColorSample, EmotionConfig, HueWrap, RankedEmotions, emotion_index};
pub use engine::{
    Answer, CardState, Column, EngineError, Evaluation, MatchBoard, PickOutcome, SessionTiming,
    TaskCompletion, TaskRunner, TaskSession, TaskSessionState, TaskState,
};
pub use error::{ConfigurationError, ExternalServiceError, TrainingError, ValidationError};
pub use generation::{
    CancelToken, ChatMessage, ChatRole, ChatStream, GenerationKind, GenerationRequest,
    PromptTemplates, RequestSlot, TextGenerator, chat_reply, decode_response,
    generate_descriptors, generate_tasks,
};
pub use palette::{LevelColor, Rgb, level_color, level_emotion, level_hue};
pub use progress::{MemoryProgress, ProgressStore, apply_progress, complete_level};
pub use settings::{MemoryStore, Preferences, SettingsStore, UserInfo, UserInfoUpdate};
pub use task::{Task, decode_task_batch, strip_code_fences};
pub use world::{
    BiomeConfig, BiomeKind, Level, LevelStatus, UnlockPolicy, WorldConfig, frontier,
    generate_world,
};

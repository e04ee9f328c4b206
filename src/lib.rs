pub mod action;
pub mod backend;
pub mod config;
pub mod context;
pub mod dictation;
pub mod dispatch;
pub mod element;
pub mod engine;
pub mod environment;
pub mod error;
pub mod history;
pub mod keys;
pub mod maps;
pub mod pattern;
pub mod rule;
mod template;
pub mod vocabulary;

pub use action::{Action, BoundAction};
pub use backend::{Backend, InputEvent, JsonLinesBackend, RecordingBackend};
pub use config::CommanderConfig;
pub use context::{Context, WindowInfo};
pub use dispatch::{DispatchSettings, Recognition, RepeatRule, Utterance};
pub use element::{Element, ElementDef, ElementMap, Extras, Value};
pub use engine::Engine;
pub use environment::{Environment, EnvironmentSpec};
pub use error::{ActionError, BackendError, ConfigError, EngineError, RecognitionError};
pub use rule::{ActionMap, MappingRule};
pub use vocabulary::VocabularyConfig;

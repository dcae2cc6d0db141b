//! AI Runtime — диспетчер ответов чата.
//!
//! Pipeline: ChatTurn → выбор провайдера по суффиксу модели → generate (streaming) → растущий текст.

mod dispatcher;
mod error;
mod history;

pub use dispatcher::{ChatDispatcher, ResponseStream};
pub use error::{AiRuntimeError, EMPTY_RESPONSE, ERROR_MARKER, MISSING_TOKEN_WARNING};
pub use history::{build_messages, preview};

//! Запрос чата от UI и его валидация.
//!
//! Backend не генерирует текст — только проверяет запрос и передаёт в AI Runtime.

use std::ops::RangeInclusive;

use ai_providers::{ChatMessage, GenerateOptions};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_TOKENS_RANGE: RangeInclusive<usize> = 1..=2048;
pub const TEMPERATURE_RANGE: RangeInclusive<f32> = 0.1..=2.0;
pub const TOP_P_RANGE: RangeInclusive<f32> = 0.1..=1.0;

/// Один ход чата: новое сообщение, история и настройки генерации.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    pub system_message: String,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
}

impl ChatTurn {
    pub fn options(&self) -> GenerateOptions {
        GenerateOptions {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum RouterError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Unknown model: {0}")]
    UnknownModel(String),
}

/// Маршрутизатор: валидирует ход против списка известных моделей.
pub struct CommandRouter {
    models: Vec<String>,
}

impl CommandRouter {
    pub fn new(models: Vec<String>) -> Self {
        Self { models }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn validate(&self, turn: &ChatTurn) -> Result<(), RouterError> {
        if turn.message.trim().is_empty() {
            return Err(RouterError::Validation("Message cannot be empty".into()));
        }
        if !self.models.iter().any(|m| m == &turn.model) {
            return Err(RouterError::UnknownModel(turn.model.clone()));
        }
        if !MAX_TOKENS_RANGE.contains(&turn.max_tokens) {
            return Err(RouterError::Validation(format!(
                "max_tokens must be in {}..={}",
                MAX_TOKENS_RANGE.start(),
                MAX_TOKENS_RANGE.end()
            )));
        }
        if !TEMPERATURE_RANGE.contains(&turn.temperature) {
            return Err(RouterError::Validation(format!(
                "temperature must be in {}..={}",
                TEMPERATURE_RANGE.start(),
                TEMPERATURE_RANGE.end()
            )));
        }
        if !TOP_P_RANGE.contains(&turn.top_p) {
            return Err(RouterError::Validation(format!(
                "top_p must be in {}..={}",
                TOP_P_RANGE.start(),
                TOP_P_RANGE.end()
            )));
        }
        Ok(())
    }
}

//! Сборка сообщений запроса: system → история → новое сообщение пользователя.

use ai_providers::{ChatMessage, Role};

/// Системное сообщение задаётся настройками, поэтому system-сообщения из истории отбрасываются.
/// Пустые сообщения тоже.
pub fn build_messages(system: &str, history: &[ChatMessage], message: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    if !system.trim().is_empty() {
        messages.push(ChatMessage::system(system));
    }
    messages.extend(
        history
            .iter()
            .filter(|m| m.role != Role::System && !m.content.trim().is_empty())
            .cloned(),
    );
    messages.push(ChatMessage::user(message));
    messages
}

/// Первые `max` символов для строки лога.
pub fn preview(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

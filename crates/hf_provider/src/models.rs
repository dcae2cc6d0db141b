//! Модели, доступные через HF inference router.

/// Модели по умолчанию.
pub const API_MODELS: &[&str] = &["meta-llama/Llama-3.2-3B-Instruct"];

pub const DEFAULT_BASE_URL: &str = "https://router.huggingface.co";

/// URL chat-completions для базового адреса (без завершающего `/`).
pub fn chat_completions_url(base_url: &str) -> String {
    format!("{}/v1/chat/completions", base_url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_completions_url() {
        assert_eq!(
            chat_completions_url("https://router.huggingface.co/"),
            "https://router.huggingface.co/v1/chat/completions"
        );
        assert_eq!(
            chat_completions_url("http://127.0.0.1:9000"),
            "http://127.0.0.1:9000/v1/chat/completions"
        );
    }
}

//! Сборка промпта для локальной модели: ChatML.

use ai_providers::ChatMessage;

/// `<|im_start|>role\ncontent<|im_end|>` на каждое сообщение + открытый ход ассистента.
/// ChatML понимают SmolLM2 и Qwen2.5 из каталога.
pub fn render_chatml(messages: &[ChatMessage]) -> String {
    let mut prompt = String::new();
    for msg in messages {
        prompt.push_str("<|im_start|>");
        prompt.push_str(msg.role.as_str());
        prompt.push('\n');
        prompt.push_str(msg.content.trim());
        prompt.push_str("<|im_end|>\n");
    }
    prompt.push_str("<|im_start|>assistant\n");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_chatml() {
        let prompt = render_chatml(&[
            ChatMessage::system("You are Bob."),
            ChatMessage::user("What does trample do?"),
        ]);
        assert_eq!(
            prompt,
            "<|im_start|>system\nYou are Bob.<|im_end|>\n\
             <|im_start|>user\nWhat does trample do?<|im_end|>\n\
             <|im_start|>assistant\n"
        );
    }
}

//! Bearer-токен для HF inference router.

pub const TOKEN_ENV: &str = "HF_TOKEN";

/// Источник токена: явное значение из конфига или переменная окружения `HF_TOKEN`.
/// Пустая строка считается отсутствием токена.
#[derive(Debug, Clone, Default)]
pub struct TokenSource {
    explicit: Option<String>,
}

impl TokenSource {
    pub fn new(token: Option<String>) -> Self {
        Self {
            explicit: token.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.explicit.as_deref()
    }

    pub fn is_set(&self) -> bool {
        self.explicit.is_some()
    }
}

//! Страница чата: статический HTML + CSS с плиточным фоном (data URL).

use std::path::Path;

use base64::Engine;

const PAGE_TEMPLATE: &str = include_str!("../static/index.html");

/// Фоновая картинка как `data:image/png;base64,...`.
pub fn background_data_url(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    ))
}

/// CSS: плиточный фон и заголовок по центру. Пустой data URL — без фона.
pub fn custom_css(background: &str) -> String {
    format!(
        r#"
body, .container {{
    background-image: url('{background}');
    background-repeat: repeat;
    background-attachment: fixed;
    background-color: #f3f8f1;
}}
h1 {{
    text-align: center;
}}
"#
    )
}

/// HTML страницы с подставленными заголовком и CSS.
pub fn render_page(title: &str, css: &str) -> String {
    PAGE_TEMPLATE
        .replace("{{TITLE}}", &html_escape(title))
        .replace("{{CSS}}", css)
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

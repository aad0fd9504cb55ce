use axum::{extract::State, response::Html};

use super::AppState;

// GET /
pub async fn status_page(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <title>BACH AI Backend</title>
  <style>
    body {{ font-family: sans-serif; background: #0f172a; color: white; display: flex; justify-content: center; align-items: center; height: 100vh; margin: 0; }}
    .box {{ text-align: center; padding: 40px; background: #1e293b; border-radius: 12px; }}
    .green {{ color: #22c55e; font-weight: bold; }}
  </style>
</head>
<body>
  <div class="box">
    <h1>Backend is Running!</h1>
    <p>Status: <span class="green">Online</span></p>
    <p>Port: {port}</p>
    <p>Version: {version}</p>
  </div>
</body>
</html>
"#,
        port = state.port,
        version = env!("CARGO_PKG_VERSION"),
    ))
}

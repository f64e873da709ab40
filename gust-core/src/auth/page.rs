//! HTML page shown in the browser once the login callback succeeded.

use chrono::{DateTime, SecondsFormat, Utc};

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Gust Authentication Success</title>
    <style>
        body {
            font-family: system-ui, sans-serif;
            max-width: 600px;
            margin: 0 auto;
            padding: 2rem;
            text-align: center;
            line-height: 1.6;
            background-color: #191724;
            color: #e0def4;
        }
        h1 { color: #ebbcba; }
        .welcome { color: #31748f; font-weight: bold; font-size: 1.2rem; }
        .api-key, pre {
            background: #1f1d2e;
            border: 1px solid #403d52;
            border-radius: 4px;
            padding: 1rem;
            font-family: monospace;
            overflow-wrap: break-word;
        }
        .api-key { color: #9ccfd8; }
        pre { text-align: left; white-space: pre-wrap; }
    </style>
</head>
<body>
    <h1>Authentication Successful!</h1>
    <p class="welcome">Welcome, @@LOGIN@@!</p>
    <p>Your Gust API key has been generated:</p>
    <div class="api-key">@@API_KEY@@</div>
    <p>You can now return to your terminal. The CLI should continue automatically.</p>
    <p>If it doesn't, close this window and save the following as ~/.config/gust/auth.json:</p>
    <pre>@@SNIPPET@@</pre>
</body>
</html>
"#;

/// Render the confirmation page for a freshly issued key.
pub fn render_success(login: &str, api_key: &str, server_url: &str, issued_at: DateTime<Utc>) -> String {
    let snippet = serde_json::json!({
        "api_key": api_key,
        "server_url": server_url,
        "github_user": login,
        "last_auth": issued_at.to_rfc3339_opts(SecondsFormat::Secs, true),
    });
    let snippet = serde_json::to_string_pretty(&snippet).unwrap_or_default();

    SUCCESS_PAGE
        .replace("@@LOGIN@@", &escape_html(login))
        .replace("@@API_KEY@@", &escape_html(api_key))
        .replace("@@SNIPPET@@", &escape_html(&snippet))
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

//! Built-in pages served in place of tenant documents.

use axum::http::StatusCode;

/// Page served instead of a tenant document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPage {
    /// The host names a reserved subdomain that cannot host a gallery
    TenantRestricted,
    /// No tenant matches the host
    TenantMissing,
}

impl FallbackPage {
    pub fn status(&self) -> StatusCode {
        match self {
            FallbackPage::TenantRestricted => StatusCode::FORBIDDEN,
            FallbackPage::TenantMissing => StatusCode::NOT_FOUND,
        }
    }

    /// File name a document root may ship to override the built-in page.
    pub fn file_name(&self) -> &'static str {
        match self {
            FallbackPage::TenantRestricted => "tenant-restricted.html",
            FallbackPage::TenantMissing => "tenant-missing.html",
        }
    }

    fn copy(&self) -> (&'static str, &'static str) {
        match self {
            FallbackPage::TenantRestricted => (
                "This address is reserved",
                "Galleries cannot be hosted on this subdomain. Check the address or sign in from your own gallery domain.",
            ),
            FallbackPage::TenantMissing => (
                "Gallery not found",
                "There is no gallery at this address. It may have been renamed or removed.",
            ),
        }
    }

    /// Render the built-in page for `host`.
    pub fn render(&self, host: Option<&str>) -> String {
        let (title, message) = self.copy();
        let host_line = host
            .map(|host| format!(r#"<p class="host">{}</p>"#, html_escape(host)))
            .unwrap_or_default();

        format!(
            r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
        body {{
            margin: 0;
            min-height: 100vh;
            display: flex;
            align-items: center;
            justify-content: center;
            background: #0f0f0f;
            color: #e5e5e5;
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
        }}
        main {{
            max-width: 28rem;
            padding: 2rem;
            text-align: center;
        }}
        h1 {{
            font-size: 1.5rem;
            margin-bottom: 0.75rem;
        }}
        p {{
            color: #a3a3a3;
            line-height: 1.5;
        }}
        .host {{
            font-family: ui-monospace, monospace;
            color: #737373;
        }}
    </style>
</head>
<body>
    <main>
        <h1>{title}</h1>
        <p>{message}</p>
        {host_line}
    </main>
</body>
</html>
"##
        )
    }
}

/// Escape HTML special characters.
pub(crate) fn html_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

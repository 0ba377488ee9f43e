//! Host application pages
//!
//! The upload widget lives on `/upload`; these handlers only read the
//! session the guard already validated.

use axum::{
    Router,
    response::{Html, IntoResponse},
    routing::get,
};

use crate::AppState;
use crate::auth::{CurrentUser, MaybeUser};

pub fn pages_router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/upload", get(upload_page))
}

/// GET /
async fn home(MaybeUser(session): MaybeUser) -> impl IntoResponse {
    let greeting = match session {
        Some(session) => format!(
            r#"<p>Signed in as {}. <a href="/upload">Upload a video</a></p>
    <form method="post" action="/api/auth/signout"><button type="submit">Sign out</button></form>"#,
            html_escape::encode_text(&session.email)
        ),
        None => r#"<p><a href="/login">Sign in</a> to upload.</p>"#.to_string(),
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>ReelGate</title></head>
<body>
    <h1>ReelGate</h1>
    {greeting}
</body>
</html>
"#
    ))
}

/// GET /upload
///
/// Protected by the route guard; the extractor only reads the session.
async fn upload_page(CurrentUser(session): CurrentUser) -> impl IntoResponse {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Upload - ReelGate</title></head>
<body>
    <h1>Upload</h1>
    <p>Signed in as {}</p>
    <div id="upload-widget" data-user-id="{}"></div>
</body>
</html>
"#,
        html_escape::encode_text(&session.email),
        html_escape::encode_double_quoted_attribute(&session.identifier)
    ))
}

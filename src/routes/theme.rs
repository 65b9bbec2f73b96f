use crate::theme::Theme;

use axum::{
    http::{header, HeaderValue, Uri},
    response::{IntoResponse, Redirect},
    Form,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ThemeForm {
    pub theme: String,
    #[serde(default)]
    pub redirect_to: String,
}

pub async fn post_theme(Form(form): Form<ThemeForm>) -> impl IntoResponse {
    let theme = Theme::parse(&form.theme).unwrap_or_default();

    log::debug!("Theme set to {}", theme.as_str());

    (
        [(header::SET_COOKIE, theme.set_cookie())],
        Redirect::to(redirect_target(&form.redirect_to)),
    )
}

/// A same-site path to send the browser back to, or `/`.
///
/// The value must be a bare path and query that is also a valid header
/// value. Browsers read `\` as `/`, so it is refused like `//`.
fn redirect_target(requested: &str) -> &str {
    if requested.contains("//") || requested.contains('\\') {
        return "/";
    }

    if HeaderValue::from_str(requested).is_err() {
        return "/";
    }

    match requested.parse::<Uri>() {
        Ok(uri)
            if uri.scheme().is_none()
                && uri.authority().is_none()
                && uri.path().starts_with('/') =>
        {
            requested
        }
        _ => "/",
    }
}

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

pub const THEME_COOKIE: &str = "theme";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    pub const ALL: [Theme; 3] = [Theme::Light, Theme::Dark, Theme::System];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Theme::Light => "Light",
            Theme::Dark => "Dark",
            Theme::System => "System",
        }
    }

    pub fn parse(value: &str) -> Option<Theme> {
        match value {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            "system" => Some(Theme::System),
            _ => None,
        }
    }

    /// A year-long cookie; the preference never leaves the browser otherwise.
    pub fn set_cookie(&self) -> String {
        format!(
            "{}={}; Path=/; Max-Age=31536000; SameSite=Lax",
            THEME_COOKIE,
            self.as_str()
        )
    }
}

/// Reads the theme preference from the request's cookies. Anything missing
/// or unrecognised means `System`.
#[async_trait]
impl<S> FromRequestParts<S> for Theme
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        let theme = parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|cookies| cookies.split(';'))
            .filter_map(|cookie| cookie.trim().split_once('='))
            .find(|(name, _)| *name == THEME_COOKIE)
            .and_then(|(_, value)| Theme::parse(value))
            .unwrap_or_default();

        Ok(theme)
    }
}

#[derive(Debug, Serialize)]
pub struct ThemeChoice {
    pub value: &'static str,
    pub label: &'static str,
    pub active: bool,
}

pub fn theme_choices(current: Theme) -> Vec<ThemeChoice> {
    Theme::ALL
        .into_iter()
        .map(|theme| ThemeChoice {
            value: theme.as_str(),
            label: theme.label(),
            active: theme == current,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn theme_from_cookie(cookie: Option<&str>) -> Theme {
        let mut builder = Request::builder().uri("/");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();

        Theme::from_request_parts(&mut parts, &()).await.unwrap()
    }

    #[tokio::test]
    async fn reads_theme_cookie() {
        assert_eq!(theme_from_cookie(None).await, Theme::System);
        assert_eq!(theme_from_cookie(Some("theme=dark")).await, Theme::Dark);
        assert_eq!(
            theme_from_cookie(Some("session=abc; theme=light; other=1")).await,
            Theme::Light
        );
        assert_eq!(
            theme_from_cookie(Some("theme=sepia")).await,
            Theme::System
        );
    }

    #[test]
    fn cookie_and_choices() {
        assert_eq!(
            Theme::Dark.set_cookie(),
            "theme=dark; Path=/; Max-Age=31536000; SameSite=Lax"
        );

        let choices = theme_choices(Theme::Light);
        assert_eq!(choices.len(), 3);
        assert!(choices[0].active);
        assert!(!choices[1].active);
    }
}

use crate::{
    models::{ListParams, StatusFilter},
    theme::Theme,
    views::{
        dashboard_href, filter_tabs, DashboardView, LayoutView, Notice, ReminderListView,
        StatsView,
    },
    AppState,
};

use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use axum_template::{RenderHtml, TemplateEngine};
use chrono::Utc;
use serde::Deserialize;
use serde_with::{serde_as, NoneAsEmptyString};

#[serde_as]
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub status: Option<String>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub search: Option<String>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub notice: Option<String>,
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    theme: Theme,
    Query(query): Query<DashboardQuery>,
) -> impl IntoResponse {
    let filter = StatusFilter::parse(query.status.as_deref());
    let search = query.search.unwrap_or_default();

    let (list, stats) = tokio::join!(
        reminder_list_view(&state, filter, &search),
        stats_view(&state)
    );

    let href = dashboard_href(filter, &search);
    let live_url = format!("/live{}", href.trim_start_matches('/'));

    RenderHtml(
        "dashboard",
        state.engine,
        DashboardView {
            layout: LayoutView::new("Dashboard", theme, href),
            notice: query
                .notice
                .as_deref()
                .and_then(Notice::parse)
                .map(|notice| notice.message()),
            stats,
            list,
            tabs: filter_tabs(filter, &search),
            status: filter.as_str(),
            search: search.trim().to_string(),
            live_url,
        },
    )
}

pub(crate) async fn reminder_list_view(
    state: &AppState,
    filter: StatusFilter,
    search: &str,
) -> ReminderListView {
    let params = ListParams::for_dashboard(filter, search);
    let result = state.cache.reminders(&params).await;

    if let Err(err) = &result {
        log::error!("Failed to load reminders for {:?}: {}", params, err);
    }

    ReminderListView::new(&result, filter, search, Utc::now())
}

/// A stats failure only hides the cards; the list stays usable.
pub(crate) async fn stats_view(state: &AppState) -> Option<StatsView> {
    match state.cache.stats().await {
        Ok(stats) => Some(StatsView::new(&stats)),
        Err(err) => {
            log::error!("Failed to load stats: {}", err);
            None
        }
    }
}

/// Renders one partial on its own, for pushing over the live socket.
pub(crate) fn render_fragment<S: serde::Serialize>(
    state: &AppState,
    key: &str,
    data: S,
) -> Option<String> {
    match state.engine.render(key, data) {
        Ok(html) => Some(html),
        Err(err) => {
            log::error!("Failed to render {}: {}", key, err);
            None
        }
    }
}

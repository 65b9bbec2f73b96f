use crate::{
    debounce::{Debouncer, SEARCH_DEBOUNCE},
    models::StatusFilter,
    query_cache::QueryKind,
    routes::dashboard::{reminder_list_view, render_fragment, stats_view, DashboardQuery},
    AppState,
};

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::{
    sync::broadcast::error::RecvError,
    time::{interval_at, Instant, Interval, MissedTickBehavior},
};

pub const LIST_REFRESH: Duration = Duration::from_secs(10);
pub const STATS_REFRESH: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Search { value: String },
    Filter { status: String },
}

#[derive(Debug, Serialize)]
struct Fragment<'a> {
    target: &'a str,
    html: String,
}

pub async fn get_live(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Response {
    let session = LiveSession {
        state,
        filter: StatusFilter::parse(query.status.as_deref()),
        search: query.search.unwrap_or_default(),
        debouncer: Debouncer::new(SEARCH_DEBOUNCE),
    };

    ws.on_upgrade(move |socket| session.run(socket))
}

/// One open dashboard tab. Everything it owns, timers included, is dropped
/// when the socket closes.
struct LiveSession {
    state: AppState,
    filter: StatusFilter,
    search: String,
    debouncer: Debouncer<String>,
}

impl LiveSession {
    async fn run(mut self, mut socket: WebSocket) {
        log::debug!(
            "Live session opened (status={}, search={:?})",
            self.filter.as_str(),
            self.search
        );

        let mut invalidations = self.state.cache.subscribe();
        let mut list_timer = refresh_timer(LIST_REFRESH);
        let mut stats_timer = refresh_timer(STATS_REFRESH);

        loop {
            let open = tokio::select! {
                frame = socket.recv() => match frame {
                    Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(ClientMessage::Search { value }) => {
                            self.debouncer.push(value);
                            true
                        }
                        Ok(ClientMessage::Filter { status }) => {
                            self.filter = StatusFilter::parse(Some(&status));
                            list_timer.reset();
                            self.push_reminders(&mut socket).await
                        }
                        Err(err) => {
                            log::warn!("Ignoring live message {:?}: {}", text, err);
                            true
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => false,
                    Some(Ok(_)) => true,
                    Some(Err(err)) => {
                        log::debug!("Live session read error: {}", err);
                        false
                    }
                },

                search = self.debouncer.ready(), if self.debouncer.is_pending() => {
                    self.search = search;
                    list_timer.reset();
                    self.push_reminders(&mut socket).await
                }

                _ = list_timer.tick() => self.push_reminders(&mut socket).await,

                _ = stats_timer.tick() => self.push_stats(&mut socket).await,

                kind = invalidations.recv() => match kind {
                    Ok(QueryKind::Reminders) => self.push_reminders(&mut socket).await,
                    Ok(QueryKind::Stats) => self.push_stats(&mut socket).await,
                    Err(RecvError::Lagged(skipped)) => {
                        log::debug!("Live session missed {} invalidations", skipped);
                        self.push_reminders(&mut socket).await && self.push_stats(&mut socket).await
                    }
                    Err(RecvError::Closed) => false,
                },
            };

            if !open {
                break;
            }
        }

        log::debug!("Live session closed");
    }

    async fn push_reminders(&self, socket: &mut WebSocket) -> bool {
        let view = reminder_list_view(&self.state, self.filter, &self.search).await;

        match render_fragment(&self.state, "reminder_list", view) {
            Some(html) => send_fragment(socket, "reminders", html).await,
            None => true,
        }
    }

    // Without stats the cards keep showing what they last had.
    async fn push_stats(&self, socket: &mut WebSocket) -> bool {
        let Some(view) = stats_view(&self.state).await else {
            return true;
        };

        match render_fragment(&self.state, "stats", view) {
            Some(html) => send_fragment(socket, "stats", html).await,
            None => true,
        }
    }
}

fn refresh_timer(period: Duration) -> Interval {
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

async fn send_fragment(socket: &mut WebSocket, target: &str, html: String) -> bool {
    let payload = match serde_json::to_string(&Fragment { target, html }) {
        Ok(payload) => payload,
        Err(err) => {
            log::error!("Unable to encode {} fragment: {}", target, err);
            return true;
        }
    };

    socket.send(Message::Text(payload)).await.is_ok()
}

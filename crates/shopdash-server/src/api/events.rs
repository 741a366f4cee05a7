//! Server-sent event stream of a tenant's sync progress.

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Extension,
};
use futures::stream::{self, Stream};
use shopdash_sync::SyncEvent;
use tokio::sync::broadcast::{error::RecvError, Receiver};
use uuid::Uuid;

use crate::middleware::{AuthUser, RequestId};

use super::{require_owned_tenant, ApiError, AppState};

/// Streams `sync-status` and `data-update` events for one tenant.
///
/// Delivery is best effort: a subscriber that falls behind skips the events
/// it missed.
pub(super) async fn tenant_events(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Path(tenant_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    require_owned_tenant(&state, &req_id, user, tenant_id).await?;

    let rx = state.sync.notifier().subscribe(tenant_id);
    tracing::debug!(%tenant_id, "event subscriber connected");

    Ok(Sse::new(event_stream(rx)).keep_alive(KeepAlive::default()))
}

fn event_stream(rx: Receiver<SyncEvent>) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => match Event::default().event(event.name()).json_data(&event) {
                    Ok(sse) => return Some((Ok::<_, Infallible>(sse), rx)),
                    Err(e) => tracing::warn!(error = %e, "dropping unserializable sync event"),
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event subscriber lagged; events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}

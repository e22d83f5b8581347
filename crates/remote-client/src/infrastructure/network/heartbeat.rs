//! Keepalive heartbeat for the event channel.
//!
//! While the channel is `Open`, a `{"type":"ping","data":{}}` frame is queued
//! once per interval.  The host does not answer pings and the device does
//! not wait for anything; the frame only keeps NAT mappings and idle
//! timeouts on the host side from dropping a quiet connection.
//!
//! The loop ends on its own as soon as the channel state leaves `Open`, and
//! [`WsEventChannel::close`](super::WsEventChannel) aborts it outright, so a
//! closed channel never keeps a timer alive.

use std::time::Duration;

use remote_core::{encode_action, ActionMessage, ChannelState};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error};

use super::Outbound;

/// Queues a ping into `outbound` every `period` while `state` is `Open`.
pub(crate) async fn heartbeat_loop(
    outbound: mpsc::UnboundedSender<Outbound>,
    period: Duration,
    mut state: watch::Receiver<ChannelState>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick resolves immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if *state.borrow() != ChannelState::Open {
                    break;
                }
                let text = match encode_action(&ActionMessage::ping()) {
                    Ok(text) => text,
                    Err(e) => {
                        error!("failed to encode keepalive ping: {e}");
                        break;
                    }
                };
                if outbound.send(Outbound::Frame(text)).is_err() {
                    break;
                }
                debug!("queued keepalive ping");
            }
            changed = state.changed() => {
                if changed.is_err() || *state.borrow_and_update() != ChannelState::Open {
                    break;
                }
            }
        }
    }
    debug!("heartbeat stopped");
}

// ── Tests ─────────────────────────────────────────────────────────────────────

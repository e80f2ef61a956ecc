//! MQTT subscription loop.
//!
//! Maintains the single per-process bus subscription. The broker connection
//! is re-established by the client; this loop re-subscribes to both topics
//! on every ConnAck and backs off exponentially (capped) after event-loop
//! errors, resetting once a connection succeeds.

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use tokio_util::sync::CancellationToken;

use crate::config::IngestConfig;
use crate::pipeline::TelemetryPipeline;

/// MQTT keep-alive interval.
const KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Event-loop channel capacity.
const CHANNEL_CAPACITY: usize = 64;

/// First reconnect delay after an event-loop error.
const BACKOFF_INITIAL: Duration = Duration::from_secs(1);

/// Reconnect delay ceiling.
const BACKOFF_MAX: Duration = Duration::from_secs(60);

/// Capped exponential backoff for reconnect attempts.
#[derive(Debug)]
struct Backoff {
    current: Duration,
    initial: Duration,
    max: Duration,
}

impl Backoff {
    fn new(initial: Duration, max: Duration) -> Self {
        Self {
            current: initial,
            initial,
            max,
        }
    }

    /// The delay to sleep now; doubles for next time, up to the cap.
    fn next(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Run the subscription loop until cancelled.
///
/// Messages arrive from one subscription and are processed sequentially,
/// so samples for a single engine are handled in arrival order.
pub async fn run(config: IngestConfig, pipeline: Arc<TelemetryPipeline>, cancel: CancellationToken) {
    let mut opts = MqttOptions::new(config.client_id.clone(), config.host.clone(), config.port);
    opts.set_keep_alive(KEEP_ALIVE);
    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        opts.set_credentials(username.clone(), password.clone());
    }

    tracing::info!(host = %config.host, port = config.port, "Connecting to MQTT broker");
    let (client, mut eventloop) = AsyncClient::new(opts, CHANNEL_CAPACITY);

    let mut backoff = Backoff::new(BACKOFF_INITIAL, BACKOFF_MAX);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Ingestion loop stopping");
                break;
            }
            event = eventloop.poll() => match event {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    tracing::info!("MQTT connected");
                    backoff.reset();
                    // Both topics must be live before processing resumes;
                    // this also covers re-subscription after a reconnect.
                    subscribe(&client, &config.telemetry_topic).await;
                    subscribe(&client, &config.events_topic).await;
                }
                Ok(Event::Incoming(Incoming::Publish(publish))) => {
                    if publish.topic == config.telemetry_topic {
                        pipeline.handle_telemetry(&publish.payload).await;
                    } else if publish.topic == config.events_topic {
                        pipeline.handle_event(&publish.payload).await;
                    } else {
                        tracing::debug!(topic = %publish.topic, "Message on unexpected topic");
                    }
                }
                Ok(other) => {
                    tracing::trace!(?other, "MQTT event");
                }
                Err(e) => {
                    let delay = backoff.next();
                    tracing::error!(error = %e, retry_in_secs = delay.as_secs(), "MQTT event loop error");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }
}

/// Subscribe at QoS 0 — the bus contract is at-most-once delivery and the
/// pipeline neither buffers nor replays.
async fn subscribe(client: &AsyncClient, topic: &str) {
    match client.subscribe(topic, QoS::AtMostOnce).await {
        Ok(()) => tracing::info!(topic, "Subscribed"),
        Err(e) => tracing::error!(topic, error = %e, "Subscribe failed"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(60));

        let delays: Vec<u64> = (0..8).map(|_| backoff.next().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 32, 60, 60]);
    }

    #[test]
    fn backoff_resets_after_success() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(60));
        backoff.next();
        backoff.next();
        backoff.reset();
        assert_eq!(backoff.next(), Duration::from_secs(1));
    }
}

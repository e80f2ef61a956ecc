//! Ingestion configuration loaded from environment variables.

use url::Url;

/// MQTT client id used for the single per-process subscription.
const CLIENT_ID: &str = "gridwatch-ingest";

/// Configuration for the bus subscription and alert lifecycle.
///
/// All fields have defaults suitable for local development.
///
/// | Env Var               | Default              |
/// |-----------------------|----------------------|
/// | `MQTT_URL`            | —                    |
/// | `MQTT_HOST`           | `localhost`          |
/// | `MQTT_PORT`           | `1883`               |
/// | `MQTT_USERNAME`       | —                    |
/// | `MQTT_PASSWORD`       | —                    |
/// | `MQTT_TELEMETRY_TOPIC`| `factory/telemetry`  |
/// | `MQTT_EVENTS_TOPIC`   | `factory/events`     |
/// | `ALERT_COOLDOWN_SECS` | `60`                 |
///
/// `MQTT_URL` takes precedence over `MQTT_HOST`/`MQTT_PORT` when set.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub client_id: String,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub telemetry_topic: String,
    pub events_topic: String,
    pub alert_cooldown: chrono::Duration,
}

impl IngestConfig {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        let default_host = std::env::var("MQTT_HOST").unwrap_or_else(|_| "localhost".into());
        let default_port: u16 = std::env::var("MQTT_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1883);

        let (host, port) = match std::env::var("MQTT_URL") {
            Ok(url) if !url.trim().is_empty() => {
                parse_broker(url.trim(), &default_host, default_port)
            }
            _ => (default_host, default_port),
        };

        let cooldown_secs: i64 = std::env::var("ALERT_COOLDOWN_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(gridwatch_core::thresholds::DEFAULT_ALERT_COOLDOWN_SECS);

        Self {
            client_id: CLIENT_ID.to_string(),
            host,
            port,
            username: non_empty_var("MQTT_USERNAME"),
            password: non_empty_var("MQTT_PASSWORD"),
            telemetry_topic: std::env::var("MQTT_TELEMETRY_TOPIC")
                .unwrap_or_else(|_| "factory/telemetry".into()),
            events_topic: std::env::var("MQTT_EVENTS_TOPIC")
                .unwrap_or_else(|_| "factory/events".into()),
            alert_cooldown: chrono::Duration::seconds(cooldown_secs),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Extract host and port from an `mqtt://host:port` style URL, falling back
/// to the given defaults on parse failure.
fn parse_broker(raw: &str, default_host: &str, default_port: u16) -> (String, u16) {
    match Url::parse(raw) {
        Ok(url) => {
            let host = url
                .host_str()
                .map(str::to_string)
                .unwrap_or_else(|| default_host.to_string());
            let port = url.port().unwrap_or(default_port);
            (host, port)
        }
        Err(e) => {
            tracing::warn!(error = %e, raw, "MQTT_URL parse error, using host/port defaults");
            (default_host.to_string(), default_port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_url_overrides_defaults() {
        assert_eq!(
            parse_broker("mqtt://broker.example:8883", "localhost", 1883),
            ("broker.example".to_string(), 8883)
        );
    }

    #[test]
    fn broker_url_without_port_keeps_default_port() {
        assert_eq!(
            parse_broker("mqtt://broker.example", "localhost", 1883),
            ("broker.example".to_string(), 1883)
        );
    }

    #[test]
    fn unparseable_url_falls_back_entirely() {
        assert_eq!(
            parse_broker("not a url", "localhost", 1883),
            ("localhost".to_string(), 1883)
        );
    }
}

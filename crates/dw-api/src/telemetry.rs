//! Structured logging initialisation for the API server. Reads
//! `RUST_LOG` for the filter and `LOG_FORMAT` to choose the output
//! format, same contract as `dw-engine::telemetry`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match std::env::var("LOG_FORMAT").unwrap_or_default().to_lowercase().as_str() {
        "json" => tracing_subscriber::registry().with(filter).with(fmt::layer().json()).init(),
        _ => tracing_subscriber::registry().with(filter).with(fmt::layer()).init(),
    }
}

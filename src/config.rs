use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub nats: NatsConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
    /// Per-connection outbound event queue bound
    pub send_queue: usize,
}

#[derive(Debug, Deserialize)]
pub struct NatsConfig {
    /// Whether to hand saved transcripts off to NATS
    pub enabled: bool,
    pub url: String,
}

impl Config {
    /// Load config from a file, falling back to defaults for anything the
    /// file omits (or if the file is absent entirely).
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "callscribe")?
            .set_default("service.http.bind", "0.0.0.0")?
            .set_default("service.http.port", 3000_i64)?
            .set_default("service.http.send_queue", 256_i64)?
            .set_default("nats.enabled", false)?
            .set_default("nats.url", "nats://localhost:4222")?
            .add_source(config::File::with_name(path).required(false))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

// =============================================================================
// Tunable config (figment-deserialized from defaults / config.toml / env vars)
// =============================================================================
//
// Two equivalent ways to configure:
//
//   config.toml:     [server]
//                    port = 9001
//
//   env var:         BOOKWIRE_SERVER__PORT=9001   (double underscore = nesting)

/// Top-level tunable configuration, deserialized by figment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerFileConfig,
    #[serde(default)]
    pub render: RenderFileConfig,
}

/// Where the construction server lives (under `[server]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerFileConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Use wss/https instead of ws/http.
    #[serde(default)]
    pub tls: bool,
}

impl Default for ServerFileConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            tls: false,
        }
    }
}

/// Typing behavior (under `[render]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RenderFileConfig {
    /// Pause between typed characters, in milliseconds.
    #[serde(default = "default_char_delay_ms")]
    pub char_delay_ms: u64,
}

impl Default for RenderFileConfig {
    fn default() -> Self {
        Self {
            char_delay_ms: default_char_delay_ms(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_char_delay_ms() -> u64 {
    teletype::DEFAULT_PACE.as_millis() as u64
}

/// Build a figment that layers: struct defaults → config.toml → BOOKWIRE_*
/// env vars.
///
/// Env vars use double-underscore for nesting into sections:
///   `BOOKWIRE_SERVER__PORT=9001`      →  `server.port = 9001`
///   `BOOKWIRE_RENDER__CHAR_DELAY_MS=0` →  `render.char_delay_ms = 0`
pub fn load_config(data_dir: &Path) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(data_dir.join("config.toml")))
        .merge(Env::prefixed("BOOKWIRE_").split("__"))
}

// =============================================================================
// Runtime config structs (derived from FileConfig)
// =============================================================================

/// Resolved server endpoint. The URL builders mirror the page-side scheme
/// switch: a TLS endpoint gets wss/https, otherwise ws/http.
#[derive(Clone, Debug)]
pub struct ServerEndpoint {
    pub host: String,
    pub port: u16,
    pub tls: bool,
}

impl ServerEndpoint {
    pub fn from_file(fc: &ServerFileConfig) -> Self {
        Self {
            host: fc.host.clone(),
            port: fc.port,
            tls: fc.tls,
        }
    }

    /// WebSocket endpoint for construction requests.
    pub fn ws_url(&self) -> String {
        let scheme = if self.tls { "wss" } else { "ws" };
        format!("{}://{}:{}/ws", scheme, self.host, self.port)
    }

    /// HTTP endpoint for the out-of-band cleanup notification.
    pub fn reset_url(&self) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        format!("{}://{}:{}/reset_words", scheme, self.host, self.port)
    }
}

/// Typing configuration (runtime view).
#[derive(Clone, Debug)]
pub struct RenderConfig {
    /// Pause between typed characters.
    pub pace: Duration,
}

impl RenderConfig {
    pub fn from_file(fc: &RenderFileConfig) -> Self {
        Self {
            pace: Duration::from_millis(fc.char_delay_ms),
        }
    }
}

// =============================================================================
// Directory layout config (not tunable via figment — derived from --data-dir)
// =============================================================================

#[derive(Clone, Debug)]
pub struct BookwireConfig {
    pub data_dir: PathBuf,
}

impl BookwireConfig {
    pub fn new(custom_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = match custom_dir {
            Some(dir) => dir,
            None => dirs::home_dir()
                .context("could not find home directory")?
                .join(".bookwire"),
        };

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

        let state_dir = data_dir.join("state");
        std::fs::create_dir_all(&state_dir)
            .with_context(|| format!("Failed to create state directory: {:?}", state_dir))?;

        info!("Data directory: {}", data_dir.display());

        Ok(Self { data_dir })
    }

    pub fn state_dir(&self) -> PathBuf {
        self.data_dir.join("state")
    }

    pub fn session_path(&self) -> PathBuf {
        self.state_dir().join("session.id")
    }

    pub fn config_toml_path(&self) -> PathBuf {
        self.data_dir.join("config.toml")
    }
}

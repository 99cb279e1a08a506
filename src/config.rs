//! Configuração do genboard carregada a partir de `genboard.toml`.
//!
//! A struct [`GenboardConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `GENBOARD_API_URL` tem precedência sobre o arquivo;
//! flags da linha de comando têm precedência sobre ambos.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::api::pagination::MAX_LIMIT;
use crate::api::{ApiVersion, RetryPolicy};
use crate::cache::StaleTimes;
use crate::error::{GenboardError, Result};
use crate::tracker::PollPolicy;

pub const DEFAULT_CONFIG_FILE: &str = "genboard.toml";
pub const API_URL_ENV: &str = "GENBOARD_API_URL";

/// Configuração de nível superior carregada de `genboard.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct GenboardConfig {
    /// URL base do backend, incluindo o prefixo `/api`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Revisão do contrato REST falada pelo backend.
    #[serde(default)]
    pub api_version: ApiVersion,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Itens por página nas listagens.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Intervalo entre consultas ao acompanhar um job.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Tempo máximo de espera por um job antes de desistir.
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,

    /// Falhas transitórias consecutivas toleradas durante o acompanhamento.
    #[serde(default = "default_poll_retries")]
    pub poll_retries: u32,

    /// Retentativas de leituras com falha transitória. Zero desativa.
    #[serde(default)]
    pub max_retries: u32,

    /// Atraso base em milissegundos para backoff exponencial.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Tempos de validade do cache por tipo de recurso.
    #[serde(default)]
    pub cache: StaleTimes,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_page_size() -> u32 {
    20
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_max_wait_secs() -> u64 {
    600
}

fn default_poll_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

impl Default for GenboardConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_version: ApiVersion::default(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            page_size: default_page_size(),
            poll_interval_ms: default_poll_interval_ms(),
            max_wait_secs: default_max_wait_secs(),
            poll_retries: default_poll_retries(),
            max_retries: 0,
            base_delay_ms: default_base_delay_ms(),
            cache: StaleTimes::default(),
        }
    }
}

impl GenboardConfig {
    /// Carrega a configuração de `path`, ou de `genboard.toml` no diretório
    /// atual, e aplica o ambiente. Um caminho explícito inexistente é erro; o
    /// arquivo padrão ausente resulta nos valores padrão. Não valida: chame
    /// [`validate`](Self::validate) depois de aplicar as flags da CLI.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if !path.exists() => {
                return Err(GenboardError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            Some(path) => Self::load_from(path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::load_from(path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str::<GenboardConfig>(&contents)?)
    }

    /// Aplica variáveis de ambiente obtidas por `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(API_URL_ENV).filter(|url| !url.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
    }

    /// Aplica as flags `--base-url` e `--api-version`, que vencem o arquivo
    /// e o ambiente.
    pub fn apply_overrides(
        &mut self,
        base_url: Option<String>,
        api_version: Option<ApiVersion>,
    ) {
        if let Some(url) = base_url {
            self.base_url = url;
        }
        if let Some(version) = api_version {
            self.api_version = version;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(GenboardError::Config(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.page_size == 0 || self.page_size > MAX_LIMIT {
            return Err(GenboardError::Config(format!(
                "page_size must be between 1 and {MAX_LIMIT}, got {}",
                self.page_size
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(GenboardError::Config(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay_ms: self.base_delay_ms,
        }
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_wait: Duration::from_secs(self.max_wait_secs),
            retry: RetryPolicy {
                max_retries: self.poll_retries,
                base_delay_ms: self.base_delay_ms,
            },
        }
    }
}

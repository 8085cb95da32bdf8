use std::time::Duration;
use thiserror::Error;

pub const RECEITAWS_URL: &str = "https://www.receitaws.com.br";
pub const TIMEOUT_PADRAO_SECS: u64 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("URL do serviço de consulta inválida (use http:// ou https://): {0}")]
    InvalidBaseUrl(String),

    #[error("timeout de {0} deve ser maior que zero")]
    ZeroTimeout(&'static str),
}

/// Configuração do cliente da ReceitaWS.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub user_agent: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: RECEITAWS_URL.to_string(),
            connect_timeout: Duration::from_secs(TIMEOUT_PADRAO_SECS),
            read_timeout: Duration::from_secs(TIMEOUT_PADRAO_SECS),
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }
}

impl RegistryConfig {
    pub fn new(base_url: &str, connect_timeout_secs: u64, read_timeout_secs: u64) -> Result<Self, ConfigError> {
        let config = Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            read_timeout: Duration::from_secs(read_timeout_secs),
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("conexão"));
        }
        if self.read_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("leitura"));
        }
        Ok(())
    }

    /// URL completa de consulta: `<base>/v1/cnpj/<14 dígitos>`
    pub fn lookup_url(&self, cnpj: &str) -> String {
        format!("{}/v1/cnpj/{}", self.base_url, cnpj)
    }
}

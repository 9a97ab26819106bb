//! Configuração carregada de `chatguru.toml` e do ambiente.
//!
//! A struct [`AppConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis. As variáveis de
//! ambiente (`SERVER`, `KEY`, `ACCOUNT_ID`, `PHONE_ID`, `CHATGURU_SHEET`)
//! têm precedência sobre o arquivo; um `.env` é carregado antes em `main`.

use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::chatguru::PollPolicy;
use crate::error::AppError;

const CONFIG_FILE: &str = "chatguru.toml";

/// Configuração de nível superior.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Host do servidor ChatGuru (ex.: `s10.chatguru.app`), com ou sem esquema.
    #[serde(default)]
    pub server: String,

    /// Chave da API da conta.
    #[serde(default)]
    pub api_key: String,

    /// Identificador da conta.
    #[serde(default)]
    pub account_id: String,

    /// Telefone usado quando a linha não traz `phoneId`.
    #[serde(default)]
    pub phone_id: String,

    /// Caminho da planilha (`.xlsx` ou CSV).
    #[serde(default = "default_sheet")]
    pub sheet: PathBuf,

    /// Nome enviado quando a coluna de nome está em branco.
    #[serde(default = "default_name")]
    pub default_name: String,

    /// Pausa entre linhas no cadastro, em segundos.
    #[serde(default = "default_row_delay_secs")]
    pub row_delay_secs: u64,

    /// Pausa entre linhas na verificação de status, em segundos.
    #[serde(default = "default_poll_row_delay_secs")]
    pub poll_row_delay_secs: u64,

    /// Máximo de consultas de status por cadastro.
    #[serde(default = "default_poll_max_attempts")]
    pub poll_max_attempts: u32,

    /// Intervalo entre consultas de status, em segundos.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default)]
    pub protocol: ProtocolConfig,
}

/// Nomes de ações e campos específicos da plataforma.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub endpoint_path: String,
    pub submit_action: String,
    pub status_action: String,
    /// Texto inicial enviado junto com o cadastro.
    pub message_text: String,
    /// Campo com o id do cadastro (na resposta do cadastro e na consulta).
    pub id_field: String,
    pub status_field: String,
    pub description_field: String,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            endpoint_path: "/api/v1".to_string(),
            submit_action: "chat_add".to_string(),
            status_action: "chat_add_status".to_string(),
            message_text: " ".to_string(),
            id_field: "chat_add_id".to_string(),
            status_field: "chat_add_status".to_string(),
            description_field: "chat_add_status_description".to_string(),
        }
    }
}

fn default_sheet() -> PathBuf {
    PathBuf::from("clients.xlsx")
}

fn default_name() -> String {
    "Sem nome".to_string()
}

fn default_row_delay_secs() -> u64 {
    5
}

fn default_poll_row_delay_secs() -> u64 {
    2
}

fn default_poll_max_attempts() -> u32 {
    10
}

fn default_poll_interval_secs() -> u64 {
    2
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            api_key: String::new(),
            account_id: String::new(),
            phone_id: String::new(),
            sheet: default_sheet(),
            default_name: default_name(),
            row_delay_secs: default_row_delay_secs(),
            poll_row_delay_secs: default_poll_row_delay_secs(),
            poll_max_attempts: default_poll_max_attempts(),
            poll_interval_secs: default_poll_interval_secs(),
            protocol: ProtocolConfig::default(),
        }
    }
}

impl AppConfig {
    /// Carrega `chatguru.toml` do diretório atual e aplica o ambiente por cima.
    pub fn load() -> Result<Self> {
        let mut config = Self::from_file(Path::new(CONFIG_FILE))?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Lê o arquivo TOML; usa valores padrão se ele não existir.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str::<AppConfig>(&contents)?)
    }

    /// Sobrescreve campos com variáveis de ambiente não vazias.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("SERVER") {
            self.server = v;
        }
        if let Some(v) = var("KEY") {
            self.api_key = v;
        }
        if let Some(v) = var("ACCOUNT_ID") {
            self.account_id = v;
        }
        if let Some(v) = var("PHONE_ID") {
            self.phone_id = v;
        }
        if let Some(v) = var("CHATGURU_SHEET") {
            self.sheet = PathBuf::from(v);
        }
    }

    /// Falha listando todas as chaves obrigatórias ausentes.
    pub fn validate(&self) -> Result<(), AppError> {
        let required = [
            ("SERVER", &self.server),
            ("KEY", &self.api_key),
            ("ACCOUNT_ID", &self.account_id),
        ];
        let missing: Vec<String> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(key, _)| key.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::MissingConfig(missing))
        }
    }

    /// URL completa do endpoint; `https://` é assumido quando não há esquema.
    pub fn endpoint_url(&self) -> String {
        let server = self.server.trim().trim_end_matches('/');
        let base = if server.starts_with("http://") || server.starts_with("https://") {
            server.to_string()
        } else {
            format!("https://{server}")
        };
        format!("{base}{}", self.protocol.endpoint_path)
    }

    pub fn row_delay(&self) -> Duration {
        Duration::from_secs(self.row_delay_secs)
    }

    pub fn poll_row_delay(&self) -> Duration {
        Duration::from_secs(self.poll_row_delay_secs)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            max_attempts: self.poll_max_attempts,
            interval: Duration::from_secs(self.poll_interval_secs),
        }
    }

    /// Cópia segura para log, com a chave mascarada.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.api_key.is_empty() {
            copy.api_key = "****".to_string();
        }
        copy
    }
}

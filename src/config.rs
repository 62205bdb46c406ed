//! Configuração do apontamento carregada a partir de `apontamento.toml`.
//!
//! A struct [`AppConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam os defaults da linha de molas.
//! As variáveis `SUPABASE_URL` e `SUPABASE_KEY` (do ambiente ou de um `.env`)
//! têm precedência sobre o arquivo.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::checklist::{
    ChecklistMode, DEFAULT_AGGREGATED_TABLE, DEFAULT_ITEMS_TABLE, DEFAULT_MANDATORY_OBSERVATIONS,
};
use crate::fetch::DEFAULT_PAGE_SIZE;
use crate::registration::{DEFAULT_TABLE, DEFAULT_UTC_OFFSET_HOURS, DuplicatePolicy};
use crate::store::DEFAULT_PAGE_ORDER_COLUMN;

/// Arquivo lido quando nenhum caminho é informado.
pub const DEFAULT_CONFIG_FILE: &str = "apontamento.toml";

/// Configuração de nível superior carregada de `apontamento.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// URL do projeto Supabase.
    pub supabase_url: String,

    /// Chave de API do Supabase.
    pub supabase_key: String,

    /// Operador gravado em cada apontamento.
    pub operator: String,

    pub duplicate_policy: DuplicatePolicy,

    /// Layout de gravação dos checklists.
    pub checklist_mode: ChecklistMode,

    /// Tamanho da janela nas leituras completas de tabela.
    pub page_size: usize,

    /// Coluna única que ordena as leituras por janela no Supabase.
    pub page_order_column: String,

    /// Validade, em segundos, do cache da lista de apontamentos recentes.
    pub recent_cache_ttl_secs: u64,

    /// Máximo de apontamentos recentes lidos de uma vez.
    pub recent_limit: usize,

    /// Fuso da planta em horas a leste de UTC.
    pub utc_offset_hours: i32,

    /// Perguntas (índice a partir de 1) com observação obrigatória.
    pub mandatory_observations: Vec<usize>,

    /// Tempo máximo de cada requisição ao Supabase.
    pub request_timeout_secs: u64,

    pub tables: TablesConfig,
}

/// Onde os apontamentos são gravados.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Supabase,
    /// Tabelas em memória, perdidas ao fim do processo.
    Memory,
}

/// Nomes das tabelas no Supabase.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TablesConfig {
    pub registrations: String,
    pub checklist_items: String,
    pub checklists: String,
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            registrations: DEFAULT_TABLE.to_string(),
            checklist_items: DEFAULT_ITEMS_TABLE.to_string(),
            checklists: DEFAULT_AGGREGATED_TABLE.to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_key: String::new(),
            operator: "Operador_Logado".to_string(),
            duplicate_policy: DuplicatePolicy::default(),
            checklist_mode: ChecklistMode::default(),
            page_size: DEFAULT_PAGE_SIZE,
            page_order_column: DEFAULT_PAGE_ORDER_COLUMN.to_string(),
            recent_cache_ttl_secs: 10,
            recent_limit: 1000,
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
            mandatory_observations: DEFAULT_MANDATORY_OBSERVATIONS.to_vec(),
            request_timeout_secs: 30,
            tables: TablesConfig::default(),
        }
    }
}

impl AppConfig {
    /// Carrega a configuração de `path`, ou de `apontamento.toml` no diretório
    /// atual. Um caminho explícito inexistente é erro; o arquivo padrão
    /// ausente resulta nos valores padrão.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)?
                } else {
                    Self::default()
                }
            }
        };

        // `.env` ausente não é erro.
        dotenvy::dotenv().ok();
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    /// Variáveis de ambiente não vazias sobrescrevem as credenciais do arquivo.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("SUPABASE_URL")
            && !url.is_empty()
        {
            self.supabase_url = url;
        }
        if let Some(key) = lookup("SUPABASE_KEY")
            && !key.is_empty()
        {
            self.supabase_key = key;
        }
    }

    /// Há credenciais suficientes para usar o Supabase.
    pub fn has_remote_store(&self) -> bool {
        !self.supabase_url.trim().is_empty() && !self.supabase_key.trim().is_empty()
    }

    /// Escolhe o armazenamento. Sem credenciais, só roda em memória com
    /// `offline` explícito; caso contrário é erro.
    pub fn backend(&self, offline: bool) -> Result<Backend> {
        if offline {
            return Ok(Backend::Memory);
        }
        if !self.has_remote_store() {
            bail!(
                "SUPABASE_URL e SUPABASE_KEY não configurados; use --offline para rodar \
                 em memória (os dados são perdidos ao sair)"
            );
        }
        Ok(Backend::Supabase)
    }

    pub fn recent_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.recent_cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn default_config_values() {
        let config = AppConfig::default();
        assert_eq!(config.operator, "Operador_Logado");
        assert_eq!(config.duplicate_policy, DuplicatePolicy::PerSerial);
        assert_eq!(config.checklist_mode, ChecklistMode::PerItem);
        assert_eq!(config.page_size, 1000);
        assert_eq!(config.page_order_column, "id");
        assert_eq!(config.recent_cache_ttl(), Duration::from_secs(10));
        assert_eq!(config.utc_offset_hours, -3);
        assert_eq!(config.mandatory_observations, vec![3, 4, 5, 6, 7, 8]);
        assert_eq!(config.tables.registrations, "apontamentos_mola");
        assert!(!config.has_remote_store());
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            operator = "joao"
            duplicate_policy = "per_serial_and_work_order"
            checklist_mode = "aggregated"

            [tables]
            checklists = "inspecoes"
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.operator, "joao");
        assert_eq!(config.duplicate_policy, DuplicatePolicy::PerSerialAndWorkOrder);
        assert_eq!(config.checklist_mode, ChecklistMode::Aggregated);
        assert_eq!(config.tables.checklists, "inspecoes");
        assert_eq!(config.tables.checklist_items, "checklists_mola_detalhes");
        assert_eq!(config.page_size, 1000);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let result = toml::from_str::<AppConfig>(r#"duplicate_policy = "whatever""#);
        assert!(result.is_err());
    }

    #[test]
    fn loads_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "page_size = 250\nrequest_timeout_secs = 5").unwrap();
        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.page_size, 250);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(Some(dir.path().join("nope.toml").as_path())).unwrap_err();
        assert!(err.to_string().contains("nope.toml"));
    }

    #[test]
    fn missing_credentials_require_explicit_offline() {
        let config = AppConfig::default();
        let err = config.backend(false).unwrap_err();
        assert!(err.to_string().contains("--offline"));
        assert_eq!(config.backend(true).unwrap(), Backend::Memory);
    }

    #[test]
    fn credentials_select_supabase_unless_offline() {
        let config = AppConfig {
            supabase_url: "https://xyz.supabase.co".into(),
            supabase_key: "anon".into(),
            ..AppConfig::default()
        };
        assert_eq!(config.backend(false).unwrap(), Backend::Supabase);
        assert_eq!(config.backend(true).unwrap(), Backend::Memory);
    }

    #[test]
    fn env_overrides_file_credentials() {
        let mut config: AppConfig = toml::from_str(
            r#"
            supabase_url = "https://file.supabase.co"
            supabase_key = "file-key"
        "#,
        )
        .unwrap();
        let env: HashMap<&str, &str> = [("SUPABASE_URL", "https://env.supabase.co"), ("SUPABASE_KEY", "")]
            .into_iter()
            .collect();
        config.apply_env(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.supabase_url, "https://env.supabase.co");
        assert_eq!(config.supabase_key, "file-key", "empty env value is ignored");
        assert!(config.has_remote_store());
    }
}

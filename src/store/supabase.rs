//! Cliente PostgREST (Supabase) para as tabelas do apontamento.
//!
//! Cada operação do [`Store`] vira uma única requisição HTTP; não há
//! retentativa. Timeouts são os do próprio `reqwest::Client`.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use super::{Query, Record, RecordId, Store, StoreError};

/// Código SQLSTATE do Postgres para violação de unicidade.
const UNIQUE_VIOLATION_CODE: &str = "23505";

/// Coluna usada para ordenar leituras por janela quando nenhuma é configurada.
pub const DEFAULT_PAGE_ORDER_COLUMN: &str = "id";

/// Corpo de erro devolvido pelo PostgREST.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub struct SupabaseStore {
    api_key: String,
    client: Client,
    base_url: String,
    page_order_column: String,
}

impl SupabaseStore {
    /// Cria um cliente apontando para o projeto em `url` (ex.: `https://xyz.supabase.co`).
    pub fn new(url: &str, api_key: String, request_timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            api_key,
            client,
            base_url: format!("{}/rest/v1", url.trim_end_matches('/')),
            page_order_column: DEFAULT_PAGE_ORDER_COLUMN.to_string(),
        })
    }

    /// Coluna única e estável que ordena as leituras por janela. Sem ordem
    /// explícita o Postgres pode repetir ou pular linhas entre janelas.
    pub fn with_page_order(mut self, column: impl Into<String>) -> Self {
        self.page_order_column = column.into();
        self
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{table}", self.base_url)
    }

    // Cabeçalhos de autenticação exigidos pelo gateway do Supabase.
    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn rows(response: Response) -> Result<Vec<Record>, StoreError> {
        let response = check_status(response).await?;
        let rows = response.json::<Vec<Value>>().await?;
        rows.into_iter()
            .map(|row| match row {
                Value::Object(map) => Ok(map),
                other => Err(StoreError::Malformed(format!("expected object row, got {other}"))),
            })
            .collect()
    }
}

impl Store for SupabaseStore {
    async fn insert(&self, table: &str, record: Record) -> Result<RecordId, StoreError> {
        let response = self
            .authorized(self.client.post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .json(&record)
            .send()
            .await?;

        let rows = Self::rows(response).await?;
        let id = match rows.first().and_then(|row| row.get("id")) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        Ok(id)
    }

    async fn query(&self, table: &str, query: &Query) -> Result<Vec<Record>, StoreError> {
        let mut params: Vec<(String, String)> = vec![("select".into(), "*".into())];
        for f in &query.filters {
            params.push((f.column.clone(), format!("eq.{}", f.value)));
        }
        if let Some(order) = &query.order_by {
            let dir = if order.descending { "desc" } else { "asc" };
            params.push(("order".into(), format!("{}.{dir}", order.column)));
        }
        if let Some(limit) = query.limit {
            params.push(("limit".into(), limit.to_string()));
        }

        let response = self
            .authorized(self.client.get(self.table_url(table)))
            .query(&params)
            .send()
            .await?;
        Self::rows(response).await
    }

    async fn query_range(
        &self,
        table: &str,
        offset: usize,
        count: usize,
    ) -> Result<Vec<Record>, StoreError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let response = self
            .authorized(self.client.get(self.table_url(table)))
            .query(&[
                ("select", "*".to_string()),
                ("order", format!("{}.asc", self.page_order_column)),
            ])
            .header("Range-Unit", "items")
            .header("Range", format!("{offset}-{}", offset + count - 1))
            .send()
            .await?;

        // PostgREST responde 416 quando o offset passa do fim da tabela.
        if response.status() == StatusCode::RANGE_NOT_SATISFIABLE {
            return Ok(Vec::new());
        }
        Self::rows(response).await
    }
}

/// Converte respostas não-2xx em [`StoreError`], separando violação de unicidade.
async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    let parsed = serde_json::from_str::<PostgrestError>(&body).ok();
    let message = parsed
        .as_ref()
        .and_then(|p| p.message.clone())
        .unwrap_or(body);
    let is_unique = status == StatusCode::CONFLICT
        || parsed
            .as_ref()
            .and_then(|p| p.code.as_deref())
            .is_some_and(|code| code == UNIQUE_VIOLATION_CODE);

    if is_unique {
        Err(StoreError::UniqueViolation(message))
    } else {
        Err(StoreError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

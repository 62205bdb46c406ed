//! Contrato mínimo do armazenamento remoto usado pelo motor.
//!
//! O motor só precisa de três operações: inserir, consultar com filtros de
//! igualdade e listar uma janela por offset. [`SupabaseStore`] fala PostgREST
//! via HTTP; [`MemoryStore`] mantém as tabelas em memória para testes e para
//! o modo offline da CLI.

pub mod error;
pub mod memory;
pub mod supabase;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use supabase::{DEFAULT_PAGE_ORDER_COLUMN, SupabaseStore};

/// Uma linha de tabela, como objeto JSON.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Identificador atribuído pelo armazenamento a uma linha inserida.
pub type RecordId = String;

/// Filtro de igualdade `column = value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

/// Ordenação por uma coluna.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

/// Consulta filtrada com ordenação e limite opcionais.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.order_by = Some(OrderBy {
            column: column.to_string(),
            descending: true,
        });
        self
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.order_by = Some(OrderBy {
            column: column.to_string(),
            descending: false,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Operações de armazenamento exigidas pelo motor.
///
/// As implementações não fazem retentativas: qualquer falha, inclusive
/// timeout do cliente, volta ao chamador como [`StoreError`].
pub trait Store {
    /// Insere `record` em `table` e devolve o id atribuído.
    async fn insert(&self, table: &str, record: Record) -> Result<RecordId, StoreError>;

    /// Consulta `table` aplicando filtros de igualdade, ordenação e limite.
    async fn query(&self, table: &str, query: &Query) -> Result<Vec<Record>, StoreError>;

    /// Devolve até `count` linhas de `table` a partir de `offset`.
    async fn query_range(
        &self,
        table: &str,
        offset: usize,
        count: usize,
    ) -> Result<Vec<Record>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_builder_collects_filters() {
        let q = Query::new()
            .eq("numero_serie", "ABC123456")
            .eq("op", "OP123456789")
            .order_desc("data_hora")
            .limit(1);
        assert_eq!(q.filters.len(), 2);
        assert_eq!(q.filters[1].column, "op");
        assert_eq!(
            q.order_by,
            Some(OrderBy {
                column: "data_hora".into(),
                descending: true
            })
        );
        assert_eq!(q.limit, Some(1));
    }
}

//! Tipos de erro do armazenamento remoto.
//!
//! [`StoreError`] separa violação de unicidade (que o motor trata como
//! duplicidade) de rejeições genéricas e falhas de rede.

use thiserror::Error;

/// Erros que podem ocorrer ao falar com o armazenamento.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Uma restrição de unicidade do armazenamento rejeitou a escrita.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// O armazenamento respondeu com erro (4xx/5xx).
    /// `message` é o texto devolvido pelo servidor.
    #[error("store rejected request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    /// Armazenamento inalcançável (fora do ar, modo offline simulado).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Falha na camada HTTP (DNS, conexão recusada, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Resposta ou linha que não pôde ser interpretada.
    #[error("malformed store data: {0}")]
    Malformed(String),
}

impl StoreError {
    /// Mensagem do armazenamento sem o prefixo da variante, quando existir.
    pub fn message(&self) -> String {
        match self {
            StoreError::UniqueViolation(msg)
            | StoreError::Unavailable(msg)
            | StoreError::Malformed(msg) => msg.clone(),
            StoreError::Rejected { message, .. } => message.clone(),
            StoreError::Network(e) => e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_display() {
        let err = StoreError::Rejected {
            status: 401,
            message: "Invalid API key".into(),
        };
        assert_eq!(
            err.to_string(),
            "store rejected request (status 401): Invalid API key"
        );
        assert_eq!(err.message(), "Invalid API key");
    }

    #[test]
    fn unavailable_message_is_bare() {
        let err = StoreError::Unavailable("connection refused".into());
        assert_eq!(err.message(), "connection refused");
    }
}

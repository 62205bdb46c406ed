//! Apontamento de produção por leitura de código de barras.
//!
//! Correlaciona leituras de número de série e OP, grava apontamentos sem
//! duplicidade e registra o checklist de qualidade de cada unidade.

pub mod checklist;
pub mod config;
pub mod error;
pub mod fetch;
pub mod registration;
pub mod scan;
pub mod store;
pub mod ui;

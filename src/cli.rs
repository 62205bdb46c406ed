//! Interface de linha de comando do apontamento baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (scan, recent, today,
//! pending, checklist) e flags globais (--config, --operator, --offline,
//! --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Apontamento de OPs por leitura de código de barras e checklist de qualidade.
#[derive(Debug, Parser)]
#[command(name = "apontamento", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Arquivo de configuração (padrão: apontamento.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Operador registrado nos apontamentos desta sessão.
    #[arg(long, global = true)]
    pub operator: Option<String>,

    /// Usa armazenamento em memória em vez do Supabase. Os dados são
    /// perdidos quando o processo termina.
    #[arg(long, global = true, default_value_t = false)]
    pub offline: bool,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Lê códigos da entrada padrão, uma leitura por linha.
    Scan,

    /// Lista os últimos apontamentos, do mais novo ao mais antigo.
    Recent {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Apontamentos de hoje, total e por OP.
    Today,

    /// Números de série apontados hoje que aguardam checklist.
    Pending,

    /// Grava o checklist de um número de série.
    Checklist {
        serial: String,

        /// Status de uma pergunta, `ÍNDICE=SÍMBOLO` (ex.: `3=✅`).
        #[arg(long = "status", value_parser = parse_indexed)]
        statuses: Vec<(usize, String)>,

        /// Observação de uma pergunta, `ÍNDICE=TEXTO`.
        #[arg(long = "obs", value_parser = parse_indexed)]
        observations: Vec<(usize, String)>,

        /// OP do checklist; por padrão a do apontamento.
        #[arg(long)]
        work_order: Option<String>,
    },
}

/// Interpreta `ÍNDICE=VALOR`, com índice a partir de 1.
fn parse_indexed(s: &str) -> Result<(usize, String), String> {
    let (index, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected INDEX=VALUE, got `{s}`"))?;
    let index: usize = index
        .trim()
        .parse()
        .map_err(|_| format!("invalid question index `{}`", index.trim()))?;
    if index == 0 {
        return Err("question indices start at 1".to_string());
    }
    Ok((index, value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_checklist_subcommand() {
        let cli = Cli::parse_from([
            "apontamento",
            "checklist",
            "ABC123456",
            "--status",
            "1=✅",
            "--status",
            "3=❌",
            "--obs",
            "3=cor azul",
        ]);
        match cli.command {
            Command::Checklist {
                serial,
                statuses,
                observations,
                work_order,
            } => {
                assert_eq!(serial, "ABC123456");
                assert_eq!(statuses, vec![(1, "✅".to_string()), (3, "❌".to_string())]);
                assert_eq!(observations, vec![(3, "cor azul".to_string())]);
                assert!(work_order.is_none());
            }
            _ => panic!("expected Checklist command"),
        }
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from([
            "apontamento",
            "--offline",
            "--operator",
            "maria",
            "--config",
            "linha2.toml",
            "--verbose",
            "scan",
        ]);
        assert!(cli.offline);
        assert!(cli.verbose);
        assert_eq!(cli.operator.as_deref(), Some("maria"));
        assert_eq!(cli.config, Some(PathBuf::from("linha2.toml")));
        assert!(matches!(cli.command, Command::Scan));
    }

    #[test]
    fn recent_limit_defaults_to_ten() {
        let cli = Cli::parse_from(["apontamento", "recent"]);
        assert!(matches!(cli.command, Command::Recent { limit: 10 }));
    }

    #[test]
    fn indexed_values_are_validated() {
        assert_eq!(parse_indexed("4=12 mm"), Ok((4, "12 mm".to_string())));
        assert_eq!(parse_indexed("4=a=b"), Ok((4, "a=b".to_string())));
        assert!(parse_indexed("4").is_err());
        assert!(parse_indexed("x=✅").is_err());
        assert!(parse_indexed("0=✅").is_err());
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}

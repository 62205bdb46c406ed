//! Interface de terminal do apontamento: spinners e saída colorida.
//!
//! Usa as crates `indicatif` para spinners durante leituras no Supabase e
//! `console` para estilização com cores.

use std::time::Duration;

use chrono::FixedOffset;
use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::checklist::{Checklist, PendingInspection, QuestionCatalog};
use crate::error::EngineError;
use crate::registration::{DailySummary, Registration};
use crate::scan::{ScanOutcome, ScanSession, SessionState};

/// Spinner exibido enquanto uma chamada ao armazenamento está em andamento.
pub struct Loading {
    pb: ProgressBar,
}

impl Loading {
    pub fn start(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Self { pb }
    }

    pub fn finish(self) {
        self.pb.finish_and_clear();
    }
}

/// Estilos usados em toda a saída do terminal.
pub struct Printer {
    green: Style,
    red: Style,
    yellow: Style,
    dim: Style,
    bold: Style,
    offset: FixedOffset,
}

impl Printer {
    /// `offset` é o fuso em que horários são exibidos.
    pub fn new(offset: FixedOffset) -> Self {
        Self {
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            dim: Style::new().dim(),
            bold: Style::new().bold(),
            offset,
        }
    }

    pub fn outcome(&self, outcome: &ScanOutcome) {
        match outcome {
            ScanOutcome::NoInput => {}
            ScanOutcome::Ignored(value) => {
                println!("  {} Leitura ignorada: {value}", self.yellow.apply_to("?"));
            }
            ScanOutcome::SerialAccepted(serial) => {
                println!("  {} Série lida: {serial}", self.green.apply_to("•"));
            }
            ScanOutcome::SerialRequired => {
                println!(
                    "  {} Leia o número de série antes da OP",
                    self.red.apply_to("✗")
                );
            }
            ScanOutcome::Registered(r) => {
                println!(
                    "  {} Série {} apontada na OP {}",
                    self.green.apply_to("✓"),
                    r.serial_number,
                    r.work_order
                );
            }
            ScanOutcome::Failed(e) => self.error(e),
        }
    }

    pub fn session(&self, session: &ScanSession) {
        println!("{}", self.dim.apply_to(session_line(session)));
    }

    pub fn error(&self, err: &EngineError) {
        println!("  {} {err}", self.red.apply_to("✗"));
    }

    pub fn recent(&self, rows: &[Registration]) {
        if rows.is_empty() {
            println!("{}", self.dim.apply_to("Nenhum apontamento."));
            return;
        }
        println!(
            "{}",
            self.bold
                .apply_to(format!("{:<12} {:<12} {:<20} {}", "SÉRIE", "OP", "DATA/HORA", "OPERADOR"))
        );
        for r in rows {
            println!("{}", registration_line(r, self.offset));
        }
    }

    pub fn summary(&self, summary: &DailySummary) {
        println!(
            "{} {}: {}",
            self.bold.apply_to("Apontamentos de hoje"),
            summary.date.format("%d/%m/%Y"),
            self.green.apply_to(summary.total)
        );
        for (work_order, count) in &summary.by_work_order {
            println!("  {work_order:<12} {count:>5}");
        }
    }

    pub fn pending(&self, pending: &[PendingInspection]) {
        if pending.is_empty() {
            println!("{}", self.dim.apply_to("Nenhuma série aguardando checklist."));
            return;
        }
        for p in pending {
            println!(
                "  {:<12} OP {:<12} {}",
                p.serial_number,
                p.work_order,
                self.dim.apply_to(
                    p.registered_at
                        .with_timezone(&self.offset)
                        .format("%H:%M:%S")
                )
            );
        }
    }

    pub fn checklist_saved(&self, checklist: &Checklist) {
        println!(
            "  {} Checklist da série {} salvo ({} itens)",
            self.green.apply_to("✓"),
            checklist.serial_number,
            checklist.items.len()
        );
    }

    /// Lista as perguntas, marcando as que exigem observação.
    pub fn questions(&self, catalog: &QuestionCatalog, is_mandatory: impl Fn(usize) -> bool) {
        for q in catalog.questions() {
            let mark = if is_mandatory(q.index) { "*" } else { " " };
            println!(
                "  {:>2}{} {} {}",
                q.index,
                self.yellow.apply_to(mark),
                self.bold.apply_to(q.key),
                q.text
            );
        }
    }
}

fn session_line(session: &ScanSession) -> String {
    let mut line = format!("[{}]", session.state());
    if let (SessionState::AwaitingWorkOrder, Some(serial)) =
        (session.state(), session.pending_serial())
    {
        line.push_str(&format!(" série {serial}, aguardando OP"));
    }
    if let Some(op) = session.last_work_order() {
        line.push_str(&format!(" | última OP {op}"));
    }
    line
}

fn registration_line(r: &Registration, offset: FixedOffset) -> String {
    format!(
        "{:<12} {:<12} {:<20} {}",
        r.serial_number,
        r.work_order,
        r.timestamp.with_timezone(&offset).format("%d/%m/%Y %H:%M:%S"),
        r.operator
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::plant_offset;
    use crate::scan::{CorrelationMachine, classify};
    use chrono::{TimeZone, Utc};

    #[test]
    fn registration_line_uses_plant_time() {
        let r = Registration {
            serial_number: "ABC123456".into(),
            work_order: "OP202412345".into(),
            operator: "maria".into(),
            timestamp: Utc.with_ymd_and_hms(2026, 3, 2, 1, 30, 0).unwrap(),
        };
        let line = registration_line(&r, plant_offset(-3));
        assert!(line.contains("01/03/2026 22:30:00"), "{line}");
        assert!(line.ends_with("maria"));
    }

    #[test]
    fn session_line_shows_pending_serial() {
        let mut session = ScanSession::new("maria");
        assert_eq!(session_line(&session), "[IDLE]");

        let token = classify("ABC123456").unwrap();
        CorrelationMachine::accept(&mut session, token);
        assert_eq!(
            session_line(&session),
            "[AWAITING_WORK_ORDER] série ABC123456, aguardando OP"
        );
    }
}

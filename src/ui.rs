//! Interface de terminal: barra de progresso e saída colorida.
//!
//! Usa as crates `indicatif` para a barra de progresso por linha da planilha e
//! `console` para estilização com cores. O [`RowProgress`] acompanha
//! visualmente uma execução; [`print_summary`] mostra o resumo final.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::chatguru::PollOutcome;
use crate::reconcile::RunSummary;

/// Indicador visual de progresso sobre as linhas da planilha.
///
/// Exibe uma barra durante o processamento e mensagens coloridas para
/// cadastro (verde), erro (vermelho) e linhas puladas (cinza).
pub struct RowProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
    dim: Style,
}

impl RowProgress {
    /// Cria a barra; `visible = false` gera uma barra oculta (usada nos testes).
    pub fn new(total: usize, label: &str, visible: bool) -> Self {
        let pb = if visible {
            ProgressBar::new(total as u64)
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::default_bar().template("{bar:30.cyan/blue} {pos}/{len} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(label.to_string());

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            dim: Style::new().dim(),
        }
    }

    pub fn registered(&self, line: usize, name: &str, registration_id: &str) {
        self.pb.println(format!(
            "  {} row {line}: {name} registered ({registration_id})",
            self.green.apply_to("✓")
        ));
    }

    pub fn failed(&self, line: usize, name: &str, detail: &str) {
        self.pb.println(format!(
            "  {} row {line}: {name} failed: {detail}",
            self.red.apply_to("✗")
        ));
    }

    pub fn skipped(&self, line: usize, reason: &str) {
        self.pb.println(format!(
            "  {}",
            self.dim.apply_to(format!("- row {line}: skipped, {reason}"))
        ));
    }

    /// Resultado da consulta de status; `done` em verde, demais em amarelo.
    pub fn polled(&self, line: usize, registration_id: &str, outcome: &PollOutcome) {
        let mark = match outcome {
            PollOutcome::Finished { state, .. } if state.eq_ignore_ascii_case("done") => {
                self.green.apply_to("✓")
            }
            PollOutcome::Finished { .. } | PollOutcome::Failed(_) => self.red.apply_to("✗"),
            PollOutcome::TimedOut { .. } | PollOutcome::Interrupted => self.yellow.apply_to("↻"),
        };
        self.pb
            .println(format!("  {mark} row {line} ({registration_id}): {outcome}"));
    }

    pub fn advance(&self) {
        self.pb.inc(1);
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

/// Imprime o resumo da execução em JSON com estilo colorido.
pub fn print_summary(summary: &RunSummary) {
    let style = if summary.interrupted || summary.save_failures > 0 {
        Style::new().yellow().bold()
    } else if summary.failed > 0 {
        Style::new().red().bold()
    } else {
        Style::new().green().bold()
    };
    println!();
    println!("{}", style.apply_to("─── Run Summary ───"));
    println!(
        "{}",
        serde_json::to_string_pretty(summary).unwrap_or_default()
    );
}

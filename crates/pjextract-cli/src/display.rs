//! Terminal rendering of run progress and the end-of-run summary.

use std::io::Write;

use pjextract_core::{Category, InstanceId, InstanceOutcome, Progress, RunReport};

// ── Live progress ──

/// Prints one status line per event. Write errors are ignored; losing a
/// status line must not abort a run.
pub struct TextProgress<W> {
    out: W,
}

impl TextProgress<std::io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }
}

impl<W: Write> TextProgress<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: std::fmt::Arguments<'_>) {
        let _ = writeln!(self.out, "{text}");
    }
}

impl<W: Write + Send> Progress for TextProgress<W> {
    fn run_started(&mut self, total: usize) {
        self.line(format_args!("Iniciando extração em {total} tribunais."));
    }

    fn instance_started(&mut self, instance: InstanceId, position: usize, total: usize) {
        self.line(format_args!("\n[{position}/{total}] {instance}"));
    }

    fn login_succeeded(&mut self, instance: InstanceId) {
        self.line(format_args!("  {instance}: login realizado."));
    }

    fn login_failed(&mut self, instance: InstanceId, reason: &str) {
        self.line(format_args!("  {instance}: falha no login ({reason}); tribunal ignorado."));
    }

    fn page_fetched(&mut self, _instance: InstanceId, category: Category, page: u32, total: usize) {
        self.line(format_args!("  {category}: página {page}, {total} processos até agora"));
    }

    fn category_finished(&mut self, instance: InstanceId, category: Category, records: usize) {
        self.line(format_args!("  {instance} {category}: {records} processos"));
    }

    fn instance_finished(&mut self, _instance: InstanceId, fraction: f32) {
        self.line(format_args!("  progresso {:.0}%", fraction * 100.0));
    }

    fn message(&mut self, msg: &str) {
        self.line(format_args!("{msg}"));
    }

    fn warning(&mut self, msg: &str) {
        self.line(format_args!("Aviso: {msg}"));
    }

    fn run_finished(&mut self, collected: usize) {
        self.line(format_args!("\nExtração concluída: {collected} processos coletados."));
    }
}

// ── Summary ──

/// Per-instance table printed once the run is over.
pub fn render_summary(report: &RunReport) -> String {
    let mut out = String::from("Resumo por tribunal\n");
    for outcome in &report.instances {
        match outcome {
            InstanceOutcome::Collected { instance, tallies } => {
                let cells: Vec<String> = tallies
                    .iter()
                    .map(|t| {
                        let mark = if t.complete { "" } else { " (parcial)" };
                        format!("{}: {}{mark}", t.category, t.records)
                    })
                    .collect();
                out.push_str(&format!("  {:<6} {}\n", instance.to_string(), cells.join(", ")));
            }
            InstanceOutcome::LoginFailed { instance, reason } => {
                out.push_str(&format!("  {:<6} login falhou: {reason}\n", instance.to_string()));
            }
        }
    }
    out.push_str(&format!(
        "  {:<6} {} acervo geral, {} arquivados\n",
        "total",
        report.results.general.len(),
        report.results.archived.len()
    ));
    out
}

use std::time::Duration;

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets};

/// Summary of a completed factorization pipeline.
#[derive(Debug, Clone)]
pub struct FactorStats {
    /// Matrix dimension.
    pub n: usize,
    /// Entries in the lower-triangular input pattern.
    pub pattern_nnz: usize,
    /// Below-diagonal entries in the factor L.
    pub factor_nnz: usize,
    /// `factor_nnz` relative to the below-diagonal entries of the input.
    pub fill_ratio: f64,
    /// Supernode groups in the assembly tree schedule.
    pub supernodes: usize,
}

/// One stage of the pipeline, for diagnostics.
#[derive(Debug, Clone)]
pub struct StageReport {
    /// Stage name.
    pub stage: &'static str,
    /// Size of the stage's output (entries, columns, or nonzeros).
    pub output: usize,
    /// Wall time spent in the stage.
    pub elapsed: Duration,
}

pub(crate) fn emit_line(line: &str) {
    if log::log_enabled!(log::Level::Info) {
        log::info!("{line}");
    } else {
        println!("{line}");
    }
}

/// Receives per-stage diagnostics from the pipeline.
pub trait Reporter {
    fn on_stage(&mut self, report: &StageReport);
    fn on_finish(&mut self, stats: &FactorStats) {
        let _ = stats;
    }
}

/// Collects stage reports and prints them as a table when the pipeline
/// finishes, through `log::info!` when enabled and stdout otherwise.
pub struct StdoutReporter {
    rows: Vec<StageReport>,
}

impl StdoutReporter {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }
}

impl Default for StdoutReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for StdoutReporter {
    fn on_stage(&mut self, report: &StageReport) {
        self.rows.push(report.clone());
    }

    fn on_finish(&mut self, stats: &FactorStats) {
        if self.rows.is_empty() {
            return;
        }
        if !log::log_enabled!(log::Level::Info) {
            println!();
        }
        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("stage"),
            Cell::new("output").set_alignment(CellAlignment::Right),
            Cell::new("time").set_alignment(CellAlignment::Right),
        ]);
        for row in &self.rows {
            table.add_row(vec![
                Cell::new(row.stage),
                Cell::new(row.output).set_alignment(CellAlignment::Right),
                Cell::new(format_duration(row.elapsed)).set_alignment(CellAlignment::Right),
            ]);
        }

        for line in table.to_string().lines() {
            emit_line(line);
        }
        emit_line(&format!(
            "n: {}, nnz(A): {}, nnz(L): {}, fill: {:.2}, supernodes: {}",
            stats.n, stats.pattern_nnz, stats.factor_nnz, stats.fill_ratio, stats.supernodes
        ));
        self.rows.clear();
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs >= 1.0 {
        format!("{:.3} s", secs)
    } else if secs >= 1e-3 {
        format!("{:.3} ms", secs * 1e3)
    } else if secs >= 1e-6 {
        format!("{:.3} us", secs * 1e6)
    } else {
        format!("{:.0} ns", secs * 1e9)
    }
}

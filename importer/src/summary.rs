//! Final summary printed when an import finishes.

use std::fmt::Write;

use edne::pipeline::{PhaseReport, RunSummary};
use serde::Serialize;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Serialize)]
struct JsonSummary<'a> {
    phases: &'a [PhaseReport],
    total_lines: u64,
    total_bytes: u64,
    total_records: u64,
    total_ceps: u64,
    elapsed_ms: u128,
    throughput_mib_per_sec: f64,
}

/// Renders `summary` as a human readable block.
pub fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "eDNE import finished in {:.1}s",
        summary.elapsed.as_secs_f64()
    );
    for phase in &summary.phases {
        let _ = writeln!(
            out,
            "  {}: {} files, {} lines, {:.1} MiB",
            phase.phase,
            phase.files.len(),
            group_digits(phase.total_lines()),
            phase.total_bytes() as f64 / BYTES_PER_MIB
        );
        for file in &phase.files {
            let _ = writeln!(
                out,
                "    {:<32} {:>12} lines  +{} ~{} -{}",
                file.file_name,
                group_digits(file.lines),
                group_digits(file.inserts),
                group_digits(file.updates),
                group_digits(file.deletes)
            );
        }
    }
    let _ = writeln!(out, "  records: {}", group_digits(summary.total_records));
    let _ = writeln!(out, "  ceps: {}", group_digits(summary.total_ceps));
    let _ = writeln!(out, "  throughput: {:.2} MiB/s", summary.throughput_mib());

    out
}

/// Renders `summary` as pretty printed JSON.
pub fn render_json(summary: &RunSummary) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonSummary {
        phases: &summary.phases,
        total_lines: summary.total_lines(),
        total_bytes: summary.total_bytes(),
        total_records: summary.total_records,
        total_ceps: summary.total_ceps,
        elapsed_ms: summary.elapsed.as_millis(),
        throughput_mib_per_sec: summary.throughput_mib(),
    })
}

/// Formats `value` with a comma between groups of three digits.
fn group_digits(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }

    out
}

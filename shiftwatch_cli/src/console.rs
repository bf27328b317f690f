use shiftwatch::{Report, alerts};
use std::fmt::Write;

const WIDE_RULE: &str = "============================================================";
const THIN_RULE: &str = "------------------------------------------------------------";

/// Human-readable summary of a report, as printed at the end of a run.
pub fn render(report: &Report, source: &str) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_report(&mut out, report, source);
    out
}

fn write_report(out: &mut String, report: &Report, source: &str) -> std::fmt::Result {
    let session = &report.session_info;
    writeln!(out, "\n{WIDE_RULE}")?;
    writeln!(out, "WORKER ACTIVITY REPORT: {source}")?;
    writeln!(out, "{WIDE_RULE}")?;
    writeln!(out, "\nSession Start: {}", session.start_time)?;
    writeln!(out, "Duration: {:.2} seconds", session.duration_seconds)?;
    writeln!(out, "Total Workers Detected: {}", session.total_workers)?;
    writeln!(out, "Frames Processed: {}", session.total_frames_processed)?;

    writeln!(out, "\n{THIN_RULE}")?;
    writeln!(out, "INDIVIDUAL WORKER PERFORMANCE")?;
    writeln!(out, "{THIN_RULE}")?;
    for worker in &report.workers {
        writeln!(out, "\n{}", worker.worker_id.to_uppercase())?;
        writeln!(out, "  Effective Working Hours: {:.2} hrs", worker.effective_working_hours)?;
        writeln!(out, "  Active Time: {:.2} min", worker.active_time_minutes)?;
        writeln!(out, "  Idle Time: {:.2} min", worker.idle_time_minutes)?;
        writeln!(out, "  Productivity Rate: {:.2}%", worker.productivity_rate)?;
        writeln!(out, "  Performance Score: {:.2}/100", worker.performance_score)?;
        writeln!(out, "  Rating: {}", worker.rating)?;
    }

    if let Some(stats) = &report.aggregate_statistics {
        writeln!(out, "\n{THIN_RULE}")?;
        writeln!(out, "AGGREGATE STATISTICS")?;
        writeln!(out, "{THIN_RULE}")?;
        writeln!(out, "  Average Performance Score: {:.2}/100", stats.average_performance_score)?;
        writeln!(out, "  Average Productivity Rate: {:.2}%", stats.average_productivity_rate)?;
        writeln!(out, "  Total Effective Working Hours: {:.2} hrs", stats.total_effective_working_hours)?;
    }

    let flagged = alerts(report);
    if !flagged.is_empty() {
        writeln!(out, "\n{THIN_RULE}")?;
        writeln!(out, "PERFORMANCE ALERTS")?;
        writeln!(out, "{THIN_RULE}")?;
        for (label, ids) in [
            ("Low productivity (score < 60)", &flagged.low_productivity),
            ("Excessive idle (idle rate > 30%)", &flagged.excessive_idle),
            ("Excellent performance (score >= 90)", &flagged.excellent_performance),
        ] {
            if !ids.is_empty() {
                writeln!(out, "  {label}: {}", ids.join(", "))?;
            }
        }
    }
    writeln!(out, "\n{WIDE_RULE}")
}

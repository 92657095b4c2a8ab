//! Assessment reporting: renders one video's evaluation result as text.

use std::fmt::Write;

use crate::config::Config;
use crate::evaluation::EvaluationResult;

/// Render the adherence report for one evaluated video.
pub fn render(config: &Config, result: &EvaluationResult) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Brand: {}", config.brand.brand_name);
    let _ = writeln!(out, "Asset: {}", result.video_name);
    let _ = writeln!(out);

    for verdict in &result.verdicts {
        let mark = if verdict.detected { "✅" } else { "❌" };
        let _ = write!(out, "{} {} [{}]", mark, verdict.name, verdict.category);
        if let Some(secondary) = verdict.secondary_detected {
            let _ = write!(out, " (llm: {})", if secondary { "✅" } else { "❌" });
        }
        if let Some(evidence) = &verdict.evidence {
            let _ = write!(out, " ({})", evidence);
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Video score: {:.2}%, adherence ({}/{})",
        result.score,
        result.detected_count(),
        result.verdicts.len()
    );
    let _ = writeln!(out, "{}", result.bucket().label());

    out
}

use std::fmt::Write;

use crate::models::{
    CategorySummary, HarassmentCategory, Recommendation, Report, ReportStatus, StudentAnalysis,
};

pub fn summarize_by_category(reports: &[Report]) -> Vec<CategorySummary> {
    let mut map: std::collections::HashMap<HarassmentCategory, (usize, u32)> =
        std::collections::HashMap::new();

    for report in reports {
        for category in report.categories() {
            let entry = map.entry(category).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += u32::from(report.emotion.level);
        }
    }

    let mut summaries: Vec<CategorySummary> = map
        .into_iter()
        .map(|(category, (count, total_emotion))| CategorySummary {
            category,
            count,
            avg_emotion: if count == 0 {
                0.0
            } else {
                f64::from(total_emotion) / count as f64
            },
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.category.as_str().cmp(b.category.as_str()))
    });
    summaries
}

/// Teacher overview across every visible report.
pub fn build_dashboard(reports: &[Report]) -> String {
    let summaries = summarize_by_category(reports);
    let mut output = String::new();

    let _ = writeln!(output, "# Are You Safe - Report Dashboard");
    let _ = writeln!(output, "{} reports on file", reports.len());
    let _ = writeln!(output);
    let _ = writeln!(output, "## Status");

    let mut pending = 0;
    let mut reviewed = 0;
    let mut resolved = 0;
    for report in reports {
        match report.status {
            ReportStatus::Pending => pending += 1,
            ReportStatus::Reviewed => reviewed += 1,
            ReportStatus::Resolved => resolved += 1,
        }
    }
    let _ = writeln!(output, "- pending: {pending}");
    let _ = writeln!(output, "- reviewed: {reviewed}");
    let _ = writeln!(output, "- resolved: {resolved}");

    let _ = writeln!(output);
    let _ = writeln!(output, "## Category Mix");

    if summaries.is_empty() {
        let _ = writeln!(output, "No reports recorded yet.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {} reports (avg emotion {:.1})",
                summary.category, summary.count, summary.avg_emotion
            );
        }
    }

    let mut recent_reports = reports.to_vec();
    recent_reports.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Reports");

    if recent_reports.is_empty() {
        let _ = writeln!(output, "No reports recorded yet.");
    } else {
        for report in recent_reports.iter().take(10) {
            let _ = writeln!(
                output,
                "- {} {} ({}) [{}] at {}, emotion {}/5, safety {}/5",
                report.timestamp.format("%Y-%m-%d %H:%M"),
                report.student_name,
                report.student_id,
                report.status,
                report.location.name,
                report.emotion.level,
                report.safety.level
            );
        }
    }

    output
}

pub fn build_incident_summary(report: &Report, recommendation: Option<&Recommendation>) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Are You Safe - Bullying Report");
    let _ = writeln!(output, "Report {} for {}", report.id, report.student_name);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Report Details");
    let _ = writeln!(
        output,
        "- Date: {}",
        report.timestamp.format("%m/%d/%Y %H:%M")
    );
    let _ = writeln!(output, "- Status: {}", report.status);
    let _ = writeln!(output, "- Student ID: {}", report.student_id);

    let labels: Vec<String> = report
        .symbols
        .iter()
        .map(|symbol| format!("{} ({})", symbol.label, symbol.category))
        .collect();
    let _ = writeln!(output, "- Harassment types: {}", labels.join(", "));

    if report.has_body_markers() {
        let parts: Vec<&str> = report
            .body_markers()
            .iter()
            .map(|marker| marker.body_part.as_str())
            .collect();
        let _ = writeln!(output, "- Body parts affected: {}", parts.join(", "));
    }

    let _ = writeln!(output, "- Emotional state: {}/5", report.emotion.level);
    let _ = writeln!(output, "- Location: {}", report.location.name);
    let _ = writeln!(output, "- Frequency: {}", report.frequency);
    let _ = writeln!(output, "- Safety level: {}/5", report.safety.level);

    if let Some(notes) = report.teacher_notes.as_deref().filter(|n| !n.is_empty()) {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Teacher Notes");
        let _ = writeln!(output, "{notes}");
    }

    if let Some(rec) = recommendation {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Recommendations");
        let _ = writeln!(output, "Urgency: {}", rec.urgency.as_str().to_uppercase());
        let _ = writeln!(output);
        let _ = writeln!(output, "{}", rec.summary);

        for (title, items) in [
            ("Immediate Actions", &rec.immediate_actions),
            ("Short-term Actions", &rec.short_term_actions),
            ("Long-term Actions", &rec.long_term_actions),
            ("Resources", &rec.resources),
        ] {
            if items.is_empty() {
                continue;
            }
            let _ = writeln!(output);
            let _ = writeln!(output, "### {title}");
            for item in items {
                let _ = writeln!(output, "- {item}");
            }
        }

        let _ = writeln!(output);
        let _ = writeln!(output, "### Notes");
        let _ = writeln!(output, "{}", rec.notes);
    }

    output
}

pub fn build_student_report(student_name: &str, analysis: &StudentAnalysis) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Student History: {student_name}");

    match (analysis.first_report_date, analysis.last_report_date) {
        (Some(first), Some(last)) => {
            let _ = writeln!(
                output,
                "{} reports between {} and {}",
                analysis.total_reports,
                first.format("%Y-%m-%d"),
                last.format("%Y-%m-%d")
            );
        }
        _ => {
            let _ = writeln!(output, "No reports on file.");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Trend");
    let _ = writeln!(output, "{}", analysis.trend_analysis.recommendation);

    if analysis.total_reports == 0 {
        return output;
    }

    let _ = writeln!(
        output,
        "- Average emotion level: {:.1}/5",
        analysis.average_emotion_level
    );
    let _ = writeln!(
        output,
        "- Average safety level: {:.1}/5",
        analysis.average_safety_level
    );
    let _ = writeln!(
        output,
        "- Improving: {}, worsening: {}",
        yes_no(analysis.trend_analysis.is_improving),
        yes_no(analysis.trend_analysis.is_worsening)
    );

    if !analysis.recurring_issues.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Recurring Issues");
        for issue in &analysis.recurring_issues {
            let _ = writeln!(output, "- {issue}");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Categories");
    for entry in &analysis.most_common_categories {
        let _ = writeln!(output, "- {}: {}", entry.category, entry.count);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Locations");
    for entry in &analysis.most_common_locations {
        let _ = writeln!(output, "- {}: {}", entry.location, entry.count);
    }

    let pattern = &analysis.frequency_pattern;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Frequency");
    let _ = writeln!(
        output,
        "- once: {}, sometimes: {}, often: {}, always: {}",
        pattern.once, pattern.sometimes, pattern.often, pattern.always
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Status History");
    for entry in &analysis.status_history {
        let _ = writeln!(
            output,
            "- {}: {}",
            entry.date.format("%Y-%m-%d %H:%M"),
            entry.status
        );
    }

    output
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

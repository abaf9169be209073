use crate::models::{
    CategoryCount, FrequencyPattern, LocationCount, Report, ReportStatus, StatusEntry,
    StudentAnalysis, TrendAnalysis,
};

/// Number of latest reports compared against the rest of the history.
pub const RECENT_WINDOW: usize = 3;

pub const NO_REPORTS: &str = "No reports available for analysis.";
pub const RECURRING: &str = "⚠️ CRITICAL: Previous interventions appear incomplete. Similar issues have recurred after resolution. Review and strengthen intervention strategies.";
pub const WORSENING: &str =
    "⚠️ Situation appears to be worsening. Immediate intervention and support needed.";
pub const IMPROVING: &str = "✓ Positive trend observed. Continue current support strategies.";
pub const MULTIPLE_REPORTS: &str = "Monitor closely. Multiple reports indicate ongoing concerns.";
pub const SINGLE_REPORT: &str = "Single report. Monitor for any recurrence.";

pub fn analyze_student_reports(reports: &[Report]) -> StudentAnalysis {
    if reports.is_empty() {
        return empty_analysis();
    }

    let mut sorted: Vec<&Report> = reports.iter().collect();
    sorted.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));

    let mut frequency_pattern = FrequencyPattern::default();
    for report in &sorted {
        frequency_pattern.record(report.frequency);
    }

    let status_history = sorted
        .iter()
        .map(|report| StatusEntry {
            status: report.status,
            date: report.timestamp,
        })
        .collect();

    let recurring_issues = detect_recurrences(&sorted);
    let trend_analysis = compute_trend(&sorted, &recurring_issues);

    StudentAnalysis {
        total_reports: sorted.len(),
        first_report_date: sorted.first().map(|report| report.timestamp),
        last_report_date: sorted.last().map(|report| report.timestamp),
        average_emotion_level: round_one(mean(&sorted, |r| r.emotion.level)),
        average_safety_level: round_one(mean(&sorted, |r| r.safety.level)),
        most_common_categories: rank_categories(&sorted),
        most_common_locations: rank_locations(&sorted),
        frequency_pattern,
        status_history,
        recurring_issues,
        trend_analysis,
    }
}

fn empty_analysis() -> StudentAnalysis {
    StudentAnalysis {
        total_reports: 0,
        first_report_date: None,
        last_report_date: None,
        average_emotion_level: 0.0,
        average_safety_level: 0.0,
        most_common_categories: Vec::new(),
        most_common_locations: Vec::new(),
        frequency_pattern: FrequencyPattern::default(),
        status_history: Vec::new(),
        recurring_issues: Vec::new(),
        trend_analysis: TrendAnalysis {
            is_improving: false,
            is_worsening: false,
            has_recurring_problems: false,
            recommendation: NO_REPORTS.to_string(),
        },
    }
}

fn mean(reports: &[&Report], level: impl Fn(&Report) -> u8) -> f64 {
    if reports.is_empty() {
        return 0.0;
    }
    let total: u32 = reports.iter().map(|report| u32::from(level(*report))).sum();
    f64::from(total) / reports.len() as f64
}

fn round_one(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Counts per key, highest first. Equal counts keep first-seen order.
fn rank<K: PartialEq>(keys: impl Iterator<Item = K>) -> Vec<(K, usize)> {
    let mut tally: Vec<(K, usize)> = Vec::new();
    for key in keys {
        match tally.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, count)) => *count += 1,
            None => tally.push((key, 1)),
        }
    }
    tally.sort_by(|a, b| b.1.cmp(&a.1));
    tally
}

fn rank_categories(sorted: &[&Report]) -> Vec<CategoryCount> {
    let symbols = sorted
        .iter()
        .flat_map(|report| report.symbols.iter().map(|symbol| symbol.category));
    rank(symbols)
        .into_iter()
        .map(|(category, count)| CategoryCount { category, count })
        .collect()
}

fn rank_locations(sorted: &[&Report]) -> Vec<LocationCount> {
    rank(sorted.iter().map(|report| report.location.name.as_str()))
        .into_iter()
        .map(|(location, count)| LocationCount {
            location: location.to_string(),
            count,
        })
        .collect()
}

/// One narrative per resolved report that is followed by a later report
/// sharing any of its categories.
fn detect_recurrences(sorted: &[&Report]) -> Vec<String> {
    let mut issues = Vec::new();

    for resolved in sorted
        .iter()
        .filter(|report| report.status == ReportStatus::Resolved)
    {
        let later: Vec<&&Report> = sorted
            .iter()
            .filter(|report| report.timestamp > resolved.timestamp)
            .collect();
        let Some(first_later) = later.first() else {
            continue;
        };

        let categories = resolved.categories();
        let shares_category = later.iter().any(|report| {
            report
                .symbols
                .iter()
                .any(|symbol| categories.contains(&symbol.category))
        });
        if !shares_category {
            continue;
        }

        let days_after = (first_later.timestamp - resolved.timestamp).num_days();
        issues.push(format!(
            "Report resolved on {} but similar issues reported {} days later - may indicate incomplete resolution",
            resolved.timestamp.format("%-m/%-d/%Y"),
            days_after
        ));
    }

    issues
}

fn compute_trend(sorted: &[&Report], recurring_issues: &[String]) -> TrendAnalysis {
    let split = sorted.len().saturating_sub(RECENT_WINDOW);
    let (older, recent) = sorted.split_at(split);

    let recent_emotion = mean(recent, |r| r.emotion.level);
    let recent_safety = mean(recent, |r| r.safety.level);
    let (older_emotion, older_safety) = if older.is_empty() {
        (recent_emotion, recent_safety)
    } else {
        (
            mean(older, |r| r.emotion.level),
            mean(older, |r| r.safety.level),
        )
    };

    let is_improving = recent_emotion < older_emotion && recent_safety < older_safety;
    let is_worsening = recent_emotion > older_emotion || recent_safety > older_safety;
    let has_recurring_problems = !recurring_issues.is_empty();

    let recommendation = if has_recurring_problems {
        RECURRING
    } else if is_worsening {
        WORSENING
    } else if is_improving {
        IMPROVING
    } else if sorted.len() > 1 {
        MULTIPLE_REPORTS
    } else {
        SINGLE_REPORT
    };

    TrendAnalysis {
        is_improving,
        is_worsening,
        has_recurring_problems,
        recommendation: recommendation.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{on_day, report};
    use crate::models::HarassmentCategory::{Cyber, Physical, Social, Verbal};
    use crate::models::{Frequency, HarassmentCategory, Location};

    fn at(location: &str, mut sample: Report) -> Report {
        sample.location = Location {
            id: location.to_lowercase(),
            name: location.to_string(),
            icon: String::new(),
        };
        sample
    }

    #[test]
    fn empty_history_yields_zeroed_analysis() {
        let analysis = analyze_student_reports(&[]);
        assert_eq!(analysis.total_reports, 0);
        assert!(analysis.first_report_date.is_none());
        assert_eq!(analysis.average_emotion_level, 0.0);
        assert_eq!(analysis.frequency_pattern, FrequencyPattern::default());
        assert_eq!(analysis.trend_analysis.recommendation, NO_REPORTS);
        assert!(!analysis.trend_analysis.is_worsening);
    }

    #[test]
    fn single_report_is_monitored() {
        let analysis = analyze_student_reports(&[report(&[Verbal], 2, 2)]);
        assert_eq!(analysis.total_reports, 1);
        assert_eq!(
            analysis.trend_analysis.recommendation,
            "Single report. Monitor for any recurrence."
        );
        assert_eq!(analysis.first_report_date, analysis.last_report_date);
    }

    #[test]
    fn resolved_then_repeated_category_is_recurrence() {
        let mut resolved = on_day(report(&[Verbal], 2, 2), 0);
        resolved.status = ReportStatus::Resolved;
        let later = on_day(report(&[Verbal], 2, 2), 5);

        let analysis = analyze_student_reports(&[later, resolved]);
        assert_eq!(analysis.recurring_issues.len(), 1);
        assert_eq!(
            analysis.recurring_issues[0],
            "Report resolved on 3/2/2026 but similar issues reported 5 days later - may indicate incomplete resolution"
        );
        assert!(analysis.trend_analysis.has_recurring_problems);
        assert_eq!(analysis.trend_analysis.recommendation, RECURRING);
    }

    #[test]
    fn disjoint_categories_are_not_recurrence() {
        let mut resolved = on_day(report(&[Cyber], 2, 2), 0);
        resolved.status = ReportStatus::Resolved;
        let later = on_day(report(&[Physical], 2, 2), 3);

        let analysis = analyze_student_reports(&[resolved, later]);
        assert!(analysis.recurring_issues.is_empty());
        assert!(!analysis.trend_analysis.has_recurring_problems);
    }

    #[test]
    fn every_resolved_report_can_produce_a_narrative() {
        let mut first = on_day(report(&[Social], 2, 2), 0);
        first.status = ReportStatus::Resolved;
        let mut second = on_day(report(&[Social, Verbal], 2, 2), 2);
        second.status = ReportStatus::Resolved;
        let third = on_day(report(&[Verbal], 2, 2), 9);

        let analysis = analyze_student_reports(&[first, second, third]);
        assert_eq!(analysis.recurring_issues.len(), 2);
        assert!(analysis.recurring_issues[0].contains("2 days later"));
        assert!(analysis.recurring_issues[1].contains("7 days later"));
    }

    #[test]
    fn short_history_never_reports_a_trend() {
        let history = vec![
            on_day(report(&[Verbal], 2, 1), 0),
            on_day(report(&[Verbal], 3, 1), 1),
            on_day(report(&[Verbal], 5, 1), 2),
        ];
        let analysis = analyze_student_reports(&history);
        assert!(!analysis.trend_analysis.is_improving);
        assert!(!analysis.trend_analysis.is_worsening);
        assert_eq!(analysis.trend_analysis.recommendation, MULTIPLE_REPORTS);
        assert_eq!(analysis.average_emotion_level, 3.3);
    }

    #[test]
    fn rising_levels_are_worsening() {
        let history = vec![
            on_day(report(&[Verbal], 1, 1), 0),
            on_day(report(&[Verbal], 3, 1), 1),
            on_day(report(&[Verbal], 3, 1), 2),
            on_day(report(&[Verbal], 3, 1), 3),
        ];
        let analysis = analyze_student_reports(&history);
        assert!(analysis.trend_analysis.is_worsening);
        assert!(!analysis.trend_analysis.is_improving);
        assert_eq!(analysis.trend_analysis.recommendation, WORSENING);
    }

    #[test]
    fn improving_requires_both_levels_to_fall() {
        let falling = vec![
            on_day(report(&[Verbal], 5, 5), 0),
            on_day(report(&[Verbal], 2, 2), 1),
            on_day(report(&[Verbal], 2, 2), 2),
            on_day(report(&[Verbal], 2, 2), 3),
        ];
        let analysis = analyze_student_reports(&falling);
        assert!(analysis.trend_analysis.is_improving);
        assert_eq!(analysis.trend_analysis.recommendation, IMPROVING);

        let mixed = vec![
            on_day(report(&[Verbal], 5, 1), 0),
            on_day(report(&[Verbal], 2, 2), 1),
            on_day(report(&[Verbal], 2, 2), 2),
            on_day(report(&[Verbal], 2, 2), 3),
        ];
        let analysis = analyze_student_reports(&mixed);
        assert!(!analysis.trend_analysis.is_improving);
        assert!(analysis.trend_analysis.is_worsening);
    }

    #[test]
    fn rankings_are_descending_with_first_seen_ties() {
        let history = vec![
            at("Hallway", on_day(report(&[Social], 1, 1), 0)),
            at("Cafeteria", on_day(report(&[Verbal, Cyber], 1, 1), 1)),
            at("Cafeteria", on_day(report(&[Verbal], 1, 1), 2)),
            at("Hallway", on_day(report(&[Cyber], 1, 1), 3)),
        ];
        let analysis = analyze_student_reports(&history);
        let categories: Vec<(HarassmentCategory, usize)> = analysis
            .most_common_categories
            .iter()
            .map(|c| (c.category, c.count))
            .collect();
        assert_eq!(categories, vec![(Verbal, 2), (Cyber, 2), (Social, 1)]);

        let locations: Vec<(&str, usize)> = analysis
            .most_common_locations
            .iter()
            .map(|l| (l.location.as_str(), l.count))
            .collect();
        assert_eq!(locations, vec![("Hallway", 2), ("Cafeteria", 2)]);
    }

    #[test]
    fn frequency_and_status_history_follow_chronology() {
        let mut late = on_day(report(&[Verbal], 1, 1), 4);
        late.frequency = Frequency::Often;
        late.status = ReportStatus::Reviewed;
        let early = on_day(report(&[Verbal], 1, 1), 1);

        let analysis = analyze_student_reports(&[late.clone(), early.clone()]);
        assert_eq!(analysis.frequency_pattern.once, 1);
        assert_eq!(analysis.frequency_pattern.often, 1);
        assert_eq!(analysis.status_history.len(), 2);
        assert_eq!(analysis.status_history[0].date, early.timestamp);
        assert_eq!(analysis.status_history[1].status, ReportStatus::Reviewed);
        assert_eq!(analysis.first_report_date, Some(early.timestamp));
        assert_eq!(analysis.last_report_date, Some(late.timestamp));
    }

    #[test]
    fn analysis_does_not_depend_on_input_order() {
        let mut resolved = on_day(report(&[Social, Verbal], 4, 2), 0);
        resolved.status = ReportStatus::Resolved;
        let history = vec![
            resolved,
            at("Bus", on_day(report(&[Cyber], 2, 3), 1)),
            at("Bus", on_day(report(&[Verbal], 1, 1), 1)),
            on_day(report(&[Physical], 3, 3), 6),
        ];
        let mut reversed = history.clone();
        reversed.reverse();

        assert_eq!(
            analyze_student_reports(&history),
            analyze_student_reports(&reversed)
        );
    }
}

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::models::{Frequency, HarassmentCategory, Recommendation, Report, Urgency};

/// First matching tier wins.
pub fn classify_urgency(report: &Report) -> Urgency {
    let emotion = report.emotion.level;
    let safety = report.safety.level;
    let frequency = report.frequency;

    if report.has_body_markers() || emotion >= 4 || safety >= 4 {
        Urgency::Critical
    } else if safety >= 3 || emotion >= 3 || frequency.is_repeated() {
        Urgency::High
    } else if emotion >= 2 || frequency == Frequency::Sometimes {
        Urgency::Medium
    } else {
        Urgency::Low
    }
}

/// Scores a validated report against the fixed rule table.
pub fn build_recommendation(report: &Report) -> Result<Recommendation> {
    report.validate()?;

    let urgency = classify_urgency(report);
    let emotion = report.emotion.level;
    let has_body_markers = report.has_body_markers();

    let mut immediate_actions = Vec::new();
    let mut short_term_actions = Vec::new();
    let mut long_term_actions = Vec::new();
    let mut resources = Vec::new();

    let base: &[&str] = match urgency {
        Urgency::Critical => &[
            "Contact school administration immediately",
            "Ensure student safety - consider temporary separation if needed",
            "Notify parents/guardians of both parties",
        ],
        Urgency::High => &[
            "Schedule meeting with student within 24 hours",
            "Document incident thoroughly",
            "Assess immediate safety concerns",
        ],
        Urgency::Medium | Urgency::Low => &[
            "Review report details carefully",
            "Plan follow-up conversation with student",
        ],
    };
    push_all(&mut immediate_actions, base);

    if has_body_markers {
        push_all(
            &mut immediate_actions,
            &[
                "Document physical evidence if applicable",
                "Consider medical attention if injuries present",
            ],
        );
    }

    if report.has_category(HarassmentCategory::Physical) {
        push_all(
            &mut short_term_actions,
            &[
                "Implement increased supervision in identified location",
                "Review and enforce school anti-bullying policies",
                "Conduct mediation session if appropriate",
            ],
        );
    }
    if report.has_category(HarassmentCategory::Verbal) {
        push_all(
            &mut short_term_actions,
            &[
                "Provide conflict resolution training",
                "Monitor interactions between involved parties",
                "Implement positive behavior reinforcement",
            ],
        );
    }
    if report.has_category(HarassmentCategory::Social) {
        push_all(
            &mut short_term_actions,
            &[
                "Facilitate social skills development",
                "Create inclusive group activities",
                "Address social exclusion patterns",
            ],
        );
    }
    if report.has_category(HarassmentCategory::Cyber) {
        push_all(
            &mut short_term_actions,
            &[
                "Review digital communication policies",
                "Educate on responsible online behavior",
                "Monitor online interactions if possible",
            ],
        );
    }
    if report.frequency.is_repeated() {
        push_all(
            &mut short_term_actions,
            &[
                "Develop intervention plan with school counselor",
                "Establish regular check-ins with student",
                "Create safety plan for student",
            ],
        );
    }

    push_all(
        &mut long_term_actions,
        &[
            "Develop comprehensive anti-bullying program",
            "Provide ongoing support and counseling",
            "Monitor progress and adjust interventions as needed",
            "Foster positive school climate and culture",
        ],
    );
    if emotion >= 3 {
        push_all(
            &mut long_term_actions,
            &[
                "Connect student with mental health resources",
                "Implement emotional support strategies",
            ],
        );
    }

    push_all(
        &mut resources,
        &[
            "School counseling services",
            "Anti-bullying policy documentation",
        ],
    );
    if report.has_category(HarassmentCategory::Physical) {
        resources.push("Physical safety protocols".to_string());
    }
    if report.has_category(HarassmentCategory::Cyber) {
        resources.push("Digital citizenship resources".to_string());
    }
    if emotion >= 3 {
        resources.push("Mental health support services".to_string());
    }

    Ok(Recommendation {
        summary: build_summary(report, urgency),
        urgency,
        immediate_actions,
        short_term_actions,
        long_term_actions,
        resources,
        notes: build_notes(report, urgency),
    })
}

/// Runs the rule table behind a simulated external call. Dropping the
/// returned future cancels it; exceeding `config.timeout` is an error.
pub async fn generate_recommendation(
    report: &Report,
    config: &EngineConfig,
) -> Result<Recommendation> {
    report.validate()?;

    let call = async {
        if !config.delay.is_zero() {
            tokio::time::sleep(config.delay).await;
        }
        build_recommendation(report)
    };

    match tokio::time::timeout(config.timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(EngineError::TimedOut(config.timeout)),
    }
}

fn push_all(list: &mut Vec<String>, items: &[&str]) {
    list.extend(items.iter().map(|item| item.to_string()));
}

fn symbol_categories(report: &Report) -> String {
    report
        .symbols
        .iter()
        .map(|symbol| symbol.category.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn body_parts(report: &Report) -> String {
    report
        .body_markers()
        .iter()
        .map(|marker| marker.body_part.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn build_summary(report: &Report, urgency: Urgency) -> String {
    let physical = if report.has_body_markers() {
        "Physical harassment has been reported with specific body parts affected. "
    } else {
        ""
    };

    format!(
        "This report indicates {urgency} urgency level. The student has reported {} harassment. \
         Emotional state is at level {}/5 and safety level is {}/5. \
         The incident frequency is {}. \
         {physical}Location: {}. \
         Immediate attention and appropriate intervention are recommended.",
        symbol_categories(report),
        report.emotion.level,
        report.safety.level,
        report.frequency,
        report.location.name,
    )
}

fn frequency_narrative(frequency: Frequency) -> &'static str {
    match frequency {
        Frequency::Once => "isolated incident",
        Frequency::Sometimes => "occasional pattern",
        Frequency::Often | Frequency::Always => "recurring pattern",
    }
}

fn build_notes(report: &Report, urgency: Urgency) -> String {
    let mut lines = vec![
        "Based on the report analysis:".to_string(),
        format!("- {} type(s) of harassment identified", report.symbols.len()),
        format!(
            "- Student emotional distress level: {}/5",
            report.emotion.level
        ),
        format!("- Safety concern level: {}/5", report.safety.level),
        format!(
            "- Frequency pattern suggests {}",
            frequency_narrative(report.frequency)
        ),
        format!("- Location context: {}", report.location.name),
    ];
    if report.has_body_markers() {
        lines.push(format!("- Physical harm reported: {}", body_parts(report)));
    }

    let verdict = match urgency {
        Urgency::Critical => "Immediate intervention required",
        Urgency::High => "Prompt action needed",
        Urgency::Medium | Urgency::Low => "Monitor and support",
    };
    lines.push(String::new());
    lines.push(format!("Recommendation: {verdict}"));
    lines.join("\n")
}

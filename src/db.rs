use anyhow::Context;
use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::RecommendationCache;
use crate::models::{
    BodyMapMarker, Emotion, Frequency, HarassmentCategory, Location, Recommendation, Report,
    ReportStatus, Safety, SymbolSelection,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<usize> {
    let start = Utc
        .with_ymd_and_hms(2026, 2, 2, 10, 15, 0)
        .single()
        .context("invalid seed date")?;

    let reports = vec![
        seed_report(
            "3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2",
            ("stu-avery", "Avery Lee"),
            start,
            &[HarassmentCategory::Verbal],
            (2, 2),
            ("hallway", "Hallway"),
            Frequency::Sometimes,
            ReportStatus::Resolved,
        )?,
        seed_report(
            "0c22f1f1-9184-4fd4-9b21-28c68a6a89dc",
            ("stu-avery", "Avery Lee"),
            start + Duration::days(6),
            &[HarassmentCategory::Verbal, HarassmentCategory::Social],
            (3, 3),
            ("cafeteria", "Cafeteria"),
            Frequency::Often,
            ReportStatus::Pending,
        )?,
        seed_report(
            "d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2",
            ("stu-jules", "Jules Moreno"),
            start + Duration::days(3),
            &[HarassmentCategory::Cyber],
            (2, 1),
            ("online", "Online"),
            Frequency::Once,
            ReportStatus::Reviewed,
        )?,
    ];

    let mut inserted = 0usize;
    for report in &reports {
        if insert_report(pool, report).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}

#[allow(clippy::too_many_arguments)]
fn seed_report(
    id: &str,
    student: (&str, &str),
    timestamp: DateTime<Utc>,
    categories: &[HarassmentCategory],
    (emotion, safety): (u8, u8),
    (location_id, location_name): (&str, &str),
    frequency: Frequency,
    status: ReportStatus,
) -> anyhow::Result<Report> {
    Ok(Report {
        id: Uuid::parse_str(id)?,
        student_id: student.0.to_string(),
        student_name: student.1.to_string(),
        timestamp,
        symbols: categories.iter().copied().map(symbol_for).collect(),
        body_map: None,
        emotion: Emotion::new(emotion),
        location: Location {
            id: location_id.to_string(),
            name: location_name.to_string(),
            icon: String::new(),
        },
        frequency,
        safety: Safety {
            level: safety,
            feeling: String::new(),
        },
        status,
        teacher_notes: None,
    })
}

fn symbol_for(category: HarassmentCategory) -> SymbolSelection {
    let label = match category {
        HarassmentCategory::Physical => "Physical",
        HarassmentCategory::Verbal => "Verbal",
        HarassmentCategory::Social => "Social",
        HarassmentCategory::Cyber => "Cyber",
    };
    SymbolSelection {
        id: category.as_str().to_string(),
        label: label.to_string(),
        category,
    }
}

/// Validates and stores a report. Returns `false` when the id already exists.
pub async fn insert_report(pool: &PgPool, report: &Report) -> anyhow::Result<bool> {
    report.validate()?;

    let result = sqlx::query(
        r#"
        INSERT INTO are_you_safe.reports
        (id, student_id, student_name, created_at, status, teacher_notes, payload)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(report.id)
    .bind(&report.student_id)
    .bind(&report.student_name)
    .bind(report.timestamp)
    .bind(report.status.as_str())
    .bind(report.teacher_notes.as_deref())
    .bind(Json(report))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

fn report_from_row(row: &sqlx::postgres::PgRow) -> anyhow::Result<Report> {
    let Json(mut report): Json<Report> = row.try_get("payload")?;
    let status: String = row.try_get("status")?;
    report.status = status
        .parse()
        .map_err(|err: String| anyhow::anyhow!(err))?;
    report.teacher_notes = row.try_get("teacher_notes")?;
    Ok(report)
}

pub async fn fetch_report(pool: &PgPool, id: Uuid) -> anyhow::Result<Report> {
    let row = sqlx::query(
        "SELECT payload, status, teacher_notes FROM are_you_safe.reports WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(crate::error::EngineError::NotFound(id))?;

    report_from_row(&row)
}

pub async fn fetch_reports(pool: &PgPool, student_id: Option<&str>) -> anyhow::Result<Vec<Report>> {
    let mut query = String::from(
        "SELECT payload, status, teacher_notes FROM are_you_safe.reports",
    );
    if student_id.is_some() {
        query.push_str(" WHERE student_id = $1");
    }
    query.push_str(" ORDER BY created_at, id");

    let mut rows = sqlx::query(&query);
    if let Some(value) = student_id {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut reports = Vec::with_capacity(records.len());
    for row in records {
        reports.push(report_from_row(&row)?);
    }

    debug!(count = reports.len(), student_id, "fetched reports");
    Ok(reports)
}

/// Applies a teacher's status change and/or notes. Notes of `Some("")`
/// clear the stored notes.
pub async fn update_report(
    pool: &PgPool,
    id: Uuid,
    status: Option<ReportStatus>,
    teacher_notes: Option<String>,
) -> anyhow::Result<Report> {
    let mut report = fetch_report(pool, id).await?;

    if let Some(status) = status {
        report.status = status;
    }
    if let Some(notes) = teacher_notes {
        report.teacher_notes = if notes.is_empty() { None } else { Some(notes) };
    }

    sqlx::query(
        r#"
        UPDATE are_you_safe.reports
        SET status = $2, teacher_notes = $3, payload = $4
        WHERE id = $1
        "#,
    )
    .bind(report.id)
    .bind(report.status.as_str())
    .bind(report.teacher_notes.as_deref())
    .bind(Json(&report))
    .execute(pool)
    .await?;

    info!(report_id = %report.id, status = %report.status, "report updated");
    Ok(report)
}

#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    report_id: Option<Uuid>,
    student_id: String,
    student_name: String,
    timestamp: DateTime<Utc>,
    categories: String,
    body_parts: Option<String>,
    emotion_level: u8,
    location: String,
    frequency: String,
    safety_level: u8,
    status: Option<String>,
}

impl CsvRow {
    fn into_report(self) -> anyhow::Result<Report> {
        let symbols = split_list(&self.categories)
            .map(|name| {
                name.parse::<HarassmentCategory>()
                    .map(symbol_for)
                    .map_err(|err| anyhow::anyhow!(err))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let body_map: Vec<BodyMapMarker> = self
            .body_parts
            .as_deref()
            .map(split_list)
            .into_iter()
            .flatten()
            .map(|part| BodyMapMarker {
                x: 0.0,
                y: 0.0,
                body_part: part.to_string(),
            })
            .collect();

        let status = match self.status.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(value) => value.parse().map_err(|err: String| anyhow::anyhow!(err))?,
            None => ReportStatus::Pending,
        };

        let report = Report {
            id: self.report_id.unwrap_or_else(Uuid::new_v4),
            student_id: self.student_id,
            student_name: self.student_name,
            timestamp: self.timestamp,
            symbols,
            body_map: if body_map.is_empty() { None } else { Some(body_map) },
            emotion: Emotion::new(self.emotion_level),
            location: Location {
                id: self.location.trim().to_lowercase().replace(' ', "-"),
                name: self.location.trim().to_string(),
                icon: String::new(),
            },
            frequency: self
                .frequency
                .parse::<Frequency>()
                .map_err(|err| anyhow::anyhow!(err))?,
            safety: Safety {
                level: self.safety_level,
                feeling: String::new(),
            },
            status,
            teacher_notes: None,
        };
        report.validate()?;
        Ok(report)
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(['|', ';'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

fn read_csv_reports(csv_path: &std::path::Path) -> anyhow::Result<Vec<Report>> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut reports = Vec::new();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result?;
        let report = row
            .into_report()
            .with_context(|| format!("invalid report on CSV row {}", index + 1))?;
        reports.push(report);
    }

    Ok(reports)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let reports = read_csv_reports(csv_path)?;
    insert_all(pool, &reports).await
}

pub async fn import_json(pool: &PgPool, json_path: &std::path::Path) -> anyhow::Result<usize> {
    let contents = std::fs::read_to_string(json_path)
        .with_context(|| format!("failed to read {}", json_path.display()))?;
    let reports: Vec<Report> = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse reports from {}", json_path.display()))?;
    insert_all(pool, &reports).await
}

async fn insert_all(pool: &PgPool, reports: &[Report]) -> anyhow::Result<usize> {
    for report in reports {
        report.validate()?;
    }

    let mut inserted = 0usize;
    for report in reports {
        if insert_report(pool, report).await? {
            inserted += 1;
        } else {
            warn!(report_id = %report.id, "report already stored, skipping");
        }
    }

    Ok(inserted)
}

pub async fn export_json(pool: &PgPool) -> anyhow::Result<String> {
    let reports = fetch_reports(pool, None).await?;
    Ok(serde_json::to_string_pretty(&reports)?)
}

/// Recommendation cache backed by the `recommendations` table.
#[derive(Debug, Clone)]
pub struct PgRecommendationCache {
    pool: PgPool,
}

impl PgRecommendationCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl RecommendationCache for PgRecommendationCache {
    async fn get(&self, report_id: Uuid) -> crate::error::Result<Option<Recommendation>> {
        let row = sqlx::query(
            "SELECT payload FROM are_you_safe.recommendations WHERE report_id = $1",
        )
        .bind(report_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let Json(recommendation): Json<Recommendation> = row.try_get("payload")?;
                Ok(Some(recommendation))
            }
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        report_id: Uuid,
        recommendation: &Recommendation,
    ) -> crate::error::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO are_you_safe.recommendations (report_id, payload, generated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (report_id) DO UPDATE
            SET payload = EXCLUDED.payload, generated_at = EXCLUDED.generated_at
            "#,
        )
        .bind(report_id)
        .bind(Json(recommendation))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const HEADER: &str = "report_id,student_id,student_name,timestamp,categories,body_parts,emotion_level,location,frequency,safety_level,status\n";

    #[test]
    fn csv_rows_become_validated_reports() {
        let file = write_csv(&format!(
            "{HEADER}\
             ,stu-1,Avery Lee,2026-02-02T10:00:00Z,physical|verbal,arm;leg,4,Gym,often,3,resolved\n\
             ,stu-1,Avery Lee,2026-02-05T10:00:00Z,cyber,,1,Online,once,1,\n"
        ));

        let reports = read_csv_reports(file.path()).unwrap();

        assert_eq!(reports.len(), 2);
        let first = &reports[0];
        assert_eq!(first.categories().len(), 2);
        assert_eq!(first.body_markers().len(), 2);
        assert_eq!(first.body_markers()[1].body_part, "leg");
        assert_eq!(first.status, ReportStatus::Resolved);
        assert_eq!(first.location.id, "gym");
        assert_eq!(first.frequency, Frequency::Often);

        let second = &reports[1];
        assert!(second.body_map.is_none());
        assert_eq!(second.status, ReportStatus::Pending);
    }

    #[test]
    fn csv_rejects_unknown_category_and_bad_timestamp() {
        let file = write_csv(&format!(
            "{HEADER},stu-1,Avery Lee,2026-02-02T10:00:00Z,teasing,,2,Gym,once,2,\n"
        ));
        let err = read_csv_reports(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("unknown harassment category"));

        let file = write_csv(&format!(
            "{HEADER},stu-1,Avery Lee,yesterday,verbal,,2,Gym,once,2,\n"
        ));
        assert!(read_csv_reports(file.path()).is_err());
    }

    #[test]
    fn csv_rejects_body_parts_without_physical_category() {
        let file = write_csv(&format!(
            "{HEADER},stu-1,Avery Lee,2026-02-02T10:00:00Z,verbal,arm,2,Gym,once,2,\n"
        ));
        let err = read_csv_reports(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("physical"));
    }

    #[test]
    fn seed_reports_are_valid() {
        let report = seed_report(
            "3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2",
            ("stu-avery", "Avery Lee"),
            Utc::now(),
            &[HarassmentCategory::Verbal],
            (2, 2),
            ("hallway", "Hallway"),
            Frequency::Once,
            ReportStatus::Pending,
        )
        .unwrap();
        assert!(report.validate().is_ok());
        assert_eq!(report.symbols[0].label, "Verbal");
    }
}

use anyhow::Context;
use chrono::Utc;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::models::RosterEntry;
use crate::roster;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub updated: usize,
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Merges roster entries by A Number. An existing cadet keeps the flight
/// assigned in the registry.
pub async fn upsert_cadets(pool: &PgPool, entries: &[RosterEntry]) -> anyhow::Result<ImportSummary> {
    let mut summary = ImportSummary::default();
    let edited_at = Utc::now();

    for entry in entries {
        let inserted: bool = sqlx::query(
            r#"
            INSERT INTO cadet_registry.cadets
            (a_number, last_name, first_name, email, as_year, flight, last_edited)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (a_number) DO UPDATE
            SET last_name = EXCLUDED.last_name,
                first_name = EXCLUDED.first_name,
                email = EXCLUDED.email,
                as_year = EXCLUDED.as_year,
                last_edited = EXCLUDED.last_edited
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(&entry.a_number)
        .bind(&entry.last_name)
        .bind(&entry.first_name)
        .bind(&entry.email)
        .bind(&entry.as_year)
        .bind(&entry.flight)
        .bind(edited_at)
        .fetch_one(pool)
        .await
        .with_context(|| format!("failed to upsert cadet {}", entry.a_number))?
        .get("inserted");

        if inserted {
            summary.inserted += 1;
        } else {
            summary.updated += 1;
        }
    }

    Ok(summary)
}

pub async fn import_roster(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<ImportSummary> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open roster {}", csv_path.display()))?;
    let entries = roster::parse_roster(file)
        .with_context(|| format!("failed to parse roster {}", csv_path.display()))?;
    let summary = upsert_cadets(pool, &entries).await?;
    info!(
        path = %csv_path.display(),
        inserted = summary.inserted,
        updated = summary.updated,
        "roster merged"
    );
    Ok(summary)
}

pub async fn fetch_cadets(pool: &PgPool, as_years: &[String]) -> anyhow::Result<Vec<RosterEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT a_number, last_name, first_name, email, as_year, flight
        FROM cadet_registry.cadets
        WHERE as_year = ANY($1)
        ORDER BY as_year, last_name, first_name, a_number
        "#,
    )
    .bind(as_years)
    .fetch_all(pool)
    .await?;

    let mut cadets = Vec::with_capacity(rows.len());
    for row in rows {
        cadets.push(RosterEntry {
            a_number: row.get("a_number"),
            last_name: row.get("last_name"),
            first_name: row.get("first_name"),
            email: row.get("email"),
            as_year: row.get("as_year"),
            flight: row.get("flight"),
        });
    }

    Ok(cadets)
}

//! # Nominations
//!
//! Free-text submissions naming a candidate and their year. Several nominations
//! may name the same person; they are grouped on read, never merged on write.
//!
//! Only admins create, edit or delete nominations. Committee members read them.
use serde::Serialize;
use sqlx::{Executor, Sqlite};
use tracing::{info, warn};

use crate::{
    auth::require_role,
    db::Store,
    error::{Error, Result},
    models::{Identity, Nomination, NominationFields, NominationInput, NominationPatch, Role},
};

const COLUMNS: &str = "id, name, year, career_position, professional_achievements, professional_awards,
    educational_achievements, merit_awards, service_church_community, service_mbaphs,
    nomination_summary, nominator_name, nominator_email, nominator_phone, created_at, created_by";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportFailure {
    /// 1-based position in the submitted batch.
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub success_count: usize,
    pub error_count: usize,
    pub errors: Vec<ImportFailure>,
}

pub async fn list_all(store: &Store) -> Result<Vec<Nomination>> {
    Ok(
        sqlx::query_as(&format!("SELECT {COLUMNS} FROM nominations ORDER BY created_at DESC, id DESC"))
            .fetch_all(&store.pool)
            .await?,
    )
}

pub async fn get(store: &Store, id: i64) -> Result<Nomination> {
    sqlx::query_as(&format!("SELECT {COLUMNS} FROM nominations WHERE id = ?"))
        .bind(id)
        .fetch_optional(&store.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Nomination not found".to_string()))
}

/// Every nomination for one person. An empty year matches nominations with no year.
pub async fn list_by_person(store: &Store, name: &str, year: &str) -> Result<Vec<Nomination>> {
    Ok(sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM nominations
         WHERE name = ? AND COALESCE(year, '') = ?
         ORDER BY created_at DESC, id DESC"
    ))
    .bind(name)
    .bind(year)
    .fetch_all(&store.pool)
    .await?)
}

pub async fn export_all(store: &Store) -> Result<Vec<Nomination>> {
    Ok(
        sqlx::query_as(&format!("SELECT {COLUMNS} FROM nominations ORDER BY name, year, id"))
            .fetch_all(&store.pool)
            .await?,
    )
}

pub async fn create(store: &Store, actor: &Identity, input: NominationInput) -> Result<Nomination> {
    require_role(actor, Role::Admin)?;

    let id = insert(&store.pool, &input, actor.id).await?;
    info!("{} created nomination {id}", actor.username);

    get(store, id).await
}

pub async fn update(store: &Store, actor: &Identity, id: i64, patch: NominationPatch) -> Result<Nomination> {
    require_role(actor, Role::Admin)?;

    let name = match patch.person_name.as_deref().map(str::trim) {
        Some("") => return Err(Error::Validation("Name cannot be blank".to_string())),
        other => other,
    };
    let year = patch.person_year.as_deref().map(str::trim);
    let f = &patch.fields;

    let result = sqlx::query(
        "UPDATE nominations SET
            name = COALESCE(?, name),
            year = COALESCE(?, year),
            career_position = COALESCE(?, career_position),
            professional_achievements = COALESCE(?, professional_achievements),
            professional_awards = COALESCE(?, professional_awards),
            educational_achievements = COALESCE(?, educational_achievements),
            merit_awards = COALESCE(?, merit_awards),
            service_church_community = COALESCE(?, service_church_community),
            service_mbaphs = COALESCE(?, service_mbaphs),
            nomination_summary = COALESCE(?, nomination_summary),
            nominator_name = COALESCE(?, nominator_name),
            nominator_email = COALESCE(?, nominator_email),
            nominator_phone = COALESCE(?, nominator_phone)
         WHERE id = ?",
    )
    .bind(name)
    .bind(year)
    .bind(&f.career_position)
    .bind(&f.professional_achievements)
    .bind(&f.professional_awards)
    .bind(&f.educational_achievements)
    .bind(&f.merit_awards)
    .bind(&f.service_church_community)
    .bind(&f.service_mbaphs)
    .bind(&f.nomination_summary)
    .bind(&f.nominator_name)
    .bind(&f.nominator_email)
    .bind(&f.nominator_phone)
    .bind(id)
    .execute(&store.pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("Nomination not found".to_string()));
    }

    info!("{} updated nomination {id}", actor.username);
    get(store, id).await
}

pub async fn delete(store: &Store, actor: &Identity, id: i64) -> Result<()> {
    require_role(actor, Role::Admin)?;

    let result = sqlx::query("DELETE FROM nominations WHERE id = ?")
        .bind(id)
        .execute(&store.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("Nomination not found".to_string()));
    }

    info!("{} deleted nomination {id}", actor.username);
    Ok(())
}

/// Inserts each row on its own. A bad row is reported and skipped; it never
/// takes the rest of the batch down with it. Rows arrive already parsed, or as
/// the reason they could not be.
pub async fn bulk_import<I>(store: &Store, actor: &Identity, rows: I) -> Result<ImportReport>
where
    I: IntoIterator<Item = std::result::Result<NominationInput, String>>,
{
    require_role(actor, Role::Admin)?;

    let mut report = ImportReport::default();
    let mut seen = 0;

    for (index, row) in rows.into_iter().enumerate() {
        seen += 1;
        let row_number = index + 1;

        let outcome = match row {
            Ok(input) => insert(&store.pool, &input, actor.id).await.map(|_| ()),
            Err(reason) => Err(Error::Validation(reason)),
        };

        match outcome {
            Ok(()) => report.success_count += 1,
            Err(error) => {
                warn!("Import row {row_number} rejected: {error}");
                report.errors.push(ImportFailure {
                    row: row_number,
                    reason: error.to_string(),
                });
            }
        }
    }

    if seen == 0 {
        return Err(Error::Validation("Invalid nominations data".to_string()));
    }

    report.error_count = report.errors.len();
    info!(
        "{} imported {} nominations ({} rejected)",
        actor.username, report.success_count, report.error_count
    );

    Ok(report)
}

async fn insert<'e, E>(executor: E, input: &NominationInput, created_by: i64) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let name = input.person_name.trim();
    if name.is_empty() {
        return Err(Error::Validation("Missing name".to_string()));
    }

    let year = input.person_year.as_deref().map(str::trim);
    let NominationFields {
        career_position,
        professional_achievements,
        professional_awards,
        educational_achievements,
        merit_awards,
        service_church_community,
        service_mbaphs,
        nomination_summary,
        nominator_name,
        nominator_email,
        nominator_phone,
    } = &input.fields;

    Ok(sqlx::query_scalar(
        "INSERT INTO nominations (
            name, year, career_position,
            professional_achievements, professional_awards,
            educational_achievements, merit_awards,
            service_church_community, service_mbaphs,
            nomination_summary,
            nominator_name, nominator_email, nominator_phone,
            created_by
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id",
    )
    .bind(name)
    .bind(year)
    .bind(career_position)
    .bind(professional_achievements)
    .bind(professional_awards)
    .bind(educational_achievements)
    .bind(merit_awards)
    .bind(service_church_community)
    .bind(service_mbaphs)
    .bind(nomination_summary)
    .bind(nominator_name)
    .bind(nominator_email)
    .bind(nominator_phone)
    .bind(created_by)
    .fetch_one(executor)
    .await?)
}

//! # Aggregation
//!
//! Derived views recomputed from the current tables on every read. Nothing is
//! cached. A person is the (name, year) pair shared by one or more nominations,
//! with a missing year folded to the empty string.
use std::collections::HashMap;

use sqlx::FromRow;

use crate::{
    db::Store,
    error::Result,
    models::{Person, ResultEntry, Stats, Voter},
    users,
};

#[derive(FromRow)]
struct Tally {
    person_name: String,
    person_year: String,
    nomination_count: i64,
    selection_count: i64,
}

#[derive(FromRow)]
struct Vote {
    person_name: String,
    person_year: String,
    id: i64,
    username: String,
}

pub async fn grouped_people(store: &Store) -> Result<Vec<Person>> {
    Ok(sqlx::query_as(
        "SELECT name AS person_name, COALESCE(year, '') AS person_year, COUNT(*) AS nomination_count
         FROM nominations
         GROUP BY name, COALESCE(year, '')
         ORDER BY name ASC, COALESCE(year, '') ASC",
    )
    .fetch_all(&store.pool)
    .await?)
}

/// Rounded share of the committee, zero for an empty committee. Clamped at 100
/// since admins may hold ballots too.
pub fn percentage(selection_count: i64, total_committee: i64) -> i64 {
    if total_committee <= 0 || selection_count <= 0 {
        return 0;
    }

    ((selection_count * 100 + total_committee / 2) / total_committee).min(100)
}

pub async fn results(store: &Store) -> Result<Vec<ResultEntry>> {
    let total_committee = users::count_committee(store).await?;

    let tallies: Vec<Tally> = sqlx::query_as(
        "SELECT p.person_name, p.person_year, p.nomination_count,
                (SELECT COUNT(*) FROM ballot_selections bs
                 WHERE bs.person_name = p.person_name AND bs.person_year = p.person_year) AS selection_count
         FROM (
             SELECT name AS person_name, COALESCE(year, '') AS person_year, COUNT(*) AS nomination_count
             FROM nominations
             GROUP BY name, COALESCE(year, '')
         ) p
         ORDER BY selection_count DESC, p.person_name ASC, p.person_year ASC",
    )
    .fetch_all(&store.pool)
    .await?;

    let votes: Vec<Vote> = sqlx::query_as(
        "SELECT bs.person_name, bs.person_year, u.id, u.username
         FROM ballot_selections bs
         JOIN users u ON u.id = bs.user_id
         ORDER BY u.username",
    )
    .fetch_all(&store.pool)
    .await?;

    let mut voters: HashMap<(String, String), Vec<Voter>> = HashMap::new();
    for vote in votes {
        voters
            .entry((vote.person_name, vote.person_year))
            .or_default()
            .push(Voter {
                id: vote.id,
                username: vote.username,
            });
    }

    Ok(tallies
        .into_iter()
        .enumerate()
        .map(|(index, tally)| ResultEntry {
            rank: index + 1,
            percentage: percentage(tally.selection_count, total_committee),
            voters: voters
                .remove(&(tally.person_name.clone(), tally.person_year.clone()))
                .unwrap_or_default(),
            person_name: tally.person_name,
            person_year: tally.person_year,
            nomination_count: tally.nomination_count,
            selection_count: tally.selection_count,
            total_committee,
        })
        .collect())
}

/// Four independent counts for the dashboard; they are not read from one snapshot.
pub async fn stats(store: &Store, user_id: i64) -> Result<Stats> {
    let total_people = sqlx::query_scalar(
        "SELECT COUNT(*) FROM (SELECT 1 FROM nominations GROUP BY name, COALESCE(year, ''))",
    )
    .fetch_one(&store.pool)
    .await?;

    let total_nominations = sqlx::query_scalar("SELECT COUNT(*) FROM nominations")
        .fetch_one(&store.pool)
        .await?;

    Ok(Stats {
        total_people,
        total_nominations,
        total_committee_members: users::count_committee(store).await?,
        my_selections_count: crate::ballot::count_selections(store, user_id).await?,
    })
}

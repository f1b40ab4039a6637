//! # Ballots
//!
//! Each user holds at most [`MAX_SELECTIONS`] (person, year) selections. A
//! submission replaces the whole set inside one transaction: the old rows are
//! deleted and the new ones inserted, or nothing changes at all.
//!
//! Users only ever touch their own rows, so submissions from different users
//! never conflict. Two concurrent submissions from the same user race, and
//! whichever commits last wins.
use std::collections::HashSet;

use tracing::info;

use crate::{
    db::Store,
    error::{Error, Result},
    models::{Selection, StoredSelection},
};

pub const MAX_SELECTIONS: usize = 8;

/// Current selections for a user, most recently created first.
pub async fn get_selections(store: &Store, user_id: i64) -> Result<Vec<StoredSelection>> {
    Ok(sqlx::query_as(
        "SELECT person_name, person_year, created_at, updated_at
         FROM ballot_selections
         WHERE user_id = ?
         ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(&store.pool)
    .await?)
}

pub async fn count_selections(store: &Store, user_id: i64) -> Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM ballot_selections WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(&store.pool)
        .await?)
}

pub async fn replace_selections(store: &Store, user_id: i64, selections: &[Selection]) -> Result<usize> {
    let selections = validate(selections)?;

    let mut tx = store.pool.begin().await?;

    // Tokens outlive deleted accounts.
    let voter: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
    if voter.is_none() {
        return Err(Error::NotFound("User not found".to_string()));
    }

    sqlx::query("DELETE FROM ballot_selections WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    for selection in &selections {
        sqlx::query("INSERT INTO ballot_selections (user_id, person_name, person_year) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(&selection.person_name)
            .bind(&selection.person_year)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    info!("User {user_id} saved a ballot with {} selections", selections.len());
    Ok(selections.len())
}

fn validate(selections: &[Selection]) -> Result<Vec<Selection>> {
    if selections.len() > MAX_SELECTIONS {
        return Err(Error::TooManySelections(selections.len()));
    }

    let mut seen = HashSet::with_capacity(selections.len());
    let mut cleaned = Vec::with_capacity(selections.len());

    for selection in selections {
        let selection = Selection::new(selection.person_name.trim(), selection.person_year.trim());

        if selection.person_name.is_empty() {
            return Err(Error::Validation("Each selection needs a person name".to_string()));
        }

        if !seen.insert(selection.clone()) {
            return Err(Error::DuplicateSelection {
                name: selection.person_name,
                year: selection.person_year,
            });
        }

        cleaned.push(selection);
    }

    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::test_store,
        models::{Identity, Role},
        users,
    };

    fn picks(n: usize) -> Vec<Selection> {
        (0..n).map(|i| Selection::new(format!("Person {i}"), "2001")).collect()
    }

    fn as_set(stored: Vec<StoredSelection>) -> HashSet<Selection> {
        stored
            .into_iter()
            .map(|s| Selection::new(s.person_name, s.person_year))
            .collect()
    }

    async fn member(store: &Store, username: &str) -> i64 {
        users::create_user(store, username, "secret1", Role::Committee).await.unwrap()
    }

    #[tokio::test]
    async fn test_empty_by_default() {
        let store = test_store().await;
        let id = member(&store, "kpipe").await;

        assert!(get_selections(&store, id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_then_get() {
        let store = test_store().await;
        let id = member(&store, "kpipe").await;

        let selections = picks(MAX_SELECTIONS);
        assert_eq!(replace_selections(&store, id, &selections).await.unwrap(), 8);

        let stored = get_selections(&store, id).await.unwrap();
        assert_eq!(stored.len(), 8);
        assert_eq!(stored[0].person_name, "Person 7");
        assert_eq!(as_set(stored), selections.into_iter().collect::<HashSet<_>>());

        replace_selections(&store, id, &picks(2)).await.unwrap();
        assert_eq!(count_selections(&store, id).await.unwrap(), 2);

        replace_selections(&store, id, &[]).await.unwrap();
        assert!(get_selections(&store, id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_too_many_leaves_prior_set() {
        let store = test_store().await;
        let id = member(&store, "kpipe").await;
        replace_selections(&store, id, &picks(3)).await.unwrap();

        let err = replace_selections(&store, id, &picks(9)).await.unwrap_err();
        assert!(matches!(err, Error::TooManySelections(9)));
        assert_eq!(as_set(get_selections(&store, id).await.unwrap()), picks(3).into_iter().collect::<HashSet<_>>());
    }

    #[tokio::test]
    async fn test_duplicates_rejected() {
        let store = test_store().await;
        let id = member(&store, "kpipe").await;
        replace_selections(&store, id, &picks(1)).await.unwrap();

        let dupes = vec![Selection::new("Jane Doe", "2001"), Selection::new("Jane Doe ", "2001")];
        assert!(matches!(
            replace_selections(&store, id, &dupes).await,
            Err(Error::DuplicateSelection { .. })
        ));

        let blank = vec![Selection::new(" ", "2001")];
        assert!(matches!(
            replace_selections(&store, id, &blank).await,
            Err(Error::Validation(_))
        ));

        assert_eq!(count_selections(&store, id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_insert_rolls_back() {
        let store = test_store().await;
        let id = member(&store, "kpipe").await;
        replace_selections(&store, id, &picks(2)).await.unwrap();

        sqlx::query(
            "CREATE TRIGGER reject_boom BEFORE INSERT ON ballot_selections
             WHEN NEW.person_name = 'Boom'
             BEGIN SELECT RAISE(ABORT, 'boom'); END",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        let doomed = vec![Selection::new("Jane Doe", "2001"), Selection::new("Boom", "2001")];
        assert!(matches!(
            replace_selections(&store, id, &doomed).await,
            Err(Error::Database(_))
        ));
        assert_eq!(as_set(get_selections(&store, id).await.unwrap()), picks(2).into_iter().collect::<HashSet<_>>());
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let store = test_store().await;
        let a = member(&store, "kpipe").await;
        let b = member(&store, "lstabilo").await;

        replace_selections(&store, b, &picks(4)).await.unwrap();
        replace_selections(&store, a, &picks(2)).await.unwrap();
        replace_selections(&store, a, &[]).await.unwrap();

        assert_eq!(count_selections(&store, b).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_user_deletion_cascades() {
        let store = test_store().await;
        let admin_id = users::create_user(&store, "admin", "secret1", Role::Admin).await.unwrap();
        let id = member(&store, "kpipe").await;
        replace_selections(&store, id, &picks(3)).await.unwrap();

        let admin = Identity {
            id: admin_id,
            username: "admin".to_string(),
            role: Role::Admin,
        };
        users::delete_user(&store, &admin, id).await.unwrap();

        assert!(get_selections(&store, id).await.unwrap().is_empty());
        assert!(matches!(
            replace_selections(&store, id, &picks(1)).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            replace_selections(&store, id, &[]).await,
            Err(Error::NotFound(_))
        ));
        let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ballot_selections")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }
}

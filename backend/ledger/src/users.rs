use rand::{Rng, thread_rng};
use serde::Serialize;
use sqlx::{Executor, FromRow, Sqlite};
use tracing::{info, warn};

use crate::{
    auth::{hash_password, require_role, verify_password},
    db::Store,
    error::{Error, Result, on_conflict},
    models::{Identity, Role, User},
};

pub const MIN_PASSWORD_LEN: usize = 6;

const PASSWORD_CHARS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnpqrstuvwxyz23456789!@#$%^&*";

#[derive(Debug, FromRow)]
pub struct Credentials {
    #[sqlx(flatten)]
    pub user: User,
    pub password_hash: String,
}

/// A freshly created account and its plaintext password, shown exactly once.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedCredential {
    pub username: String,
    pub password: String,
    pub role: Role,
}

pub async fn create_user(store: &Store, username: &str, password: &str, role: Role) -> Result<i64> {
    let username = validate_username(username)?;
    validate_password(password)?;

    let password_hash = hash_password(password)?;

    let id = sqlx::query_scalar(
        "INSERT INTO users (username, password_hash, role) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(username)
    .bind(&password_hash)
    .bind(role)
    .fetch_one(&store.pool)
    .await
    .map_err(on_conflict("Username already exists"))?;

    info!("Created {role} account {username}");
    Ok(id)
}

/// Returns `None` when the username is already taken.
async fn insert_if_absent<'e, E>(executor: E, username: &str, password: &str, role: Role) -> Result<Option<i64>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let password_hash = hash_password(password)?;

    Ok(sqlx::query_scalar(
        "INSERT INTO users (username, password_hash, role) VALUES (?, ?, ?)
         ON CONFLICT (username) DO NOTHING RETURNING id",
    )
    .bind(username)
    .bind(&password_hash)
    .bind(role)
    .fetch_optional(executor)
    .await?)
}

/// Creates an account with a generated password unless the username exists.
pub async fn create_with_generated_password(
    store: &Store,
    username: &str,
    role: Role,
) -> Result<Option<IssuedCredential>> {
    let username = validate_username(username)?;
    let password = generate_password(12);

    Ok(insert_if_absent(&store.pool, username, &password, role)
        .await?
        .map(|_| IssuedCredential {
            username: username.to_string(),
            password,
            role,
        }))
}

pub async fn find_credentials(store: &Store, username: &str) -> Result<Option<Credentials>> {
    Ok(sqlx::query_as(
        "SELECT id, username, role, created_at, password_hash FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(&store.pool)
    .await?)
}

pub async fn get_user(store: &Store, id: i64) -> Result<User> {
    sqlx::query_as("SELECT id, username, role, created_at FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(&store.pool)
        .await?
        .ok_or_else(|| Error::NotFound("User not found".to_string()))
}

pub async fn list_users(store: &Store) -> Result<Vec<User>> {
    Ok(sqlx::query_as(
        "SELECT id, username, role, created_at FROM users ORDER BY created_at DESC, id DESC",
    )
    .fetch_all(&store.pool)
    .await?)
}

/// Removing a user takes their ballot with them; nominations they authored stay.
pub async fn delete_user(store: &Store, actor: &Identity, id: i64) -> Result<()> {
    require_role(actor, Role::Admin)?;

    if actor.id == id {
        return Err(Error::Forbidden("Cannot delete your own account".to_string()));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(&store.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("User not found".to_string()));
    }

    info!("{} deleted user {id}", actor.username);
    Ok(())
}

pub async fn change_password(store: &Store, user_id: i64, current: &str, new: &str) -> Result<()> {
    validate_password(new)?;

    let user = get_user(store, user_id).await?;
    let credentials = find_credentials(store, &user.username)
        .await?
        .ok_or_else(|| Error::NotFound("User not found".to_string()))?;

    if !verify_password(current, &credentials.password_hash)? {
        return Err(Error::Validation("Current password is incorrect".to_string()));
    }

    sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
        .bind(hash_password(new)?)
        .bind(user_id)
        .execute(&store.pool)
        .await?;

    info!("{} changed their password", user.username);
    Ok(())
}

pub async fn count_committee(store: &Store) -> Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'committee'")
        .fetch_one(&store.pool)
        .await?)
}

pub async fn admin_exists(store: &Store) -> Result<bool> {
    let admins: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin'")
        .fetch_one(&store.pool)
        .await?;

    Ok(admins > 0)
}

pub async fn first_admin(store: &Store) -> Result<Option<User>> {
    Ok(sqlx::query_as(
        "SELECT id, username, role, created_at FROM users WHERE role = 'admin' ORDER BY id LIMIT 1",
    )
    .fetch_optional(&store.pool)
    .await?)
}

/// One-time bootstrap: the first admin plus committee accounts with generated passwords.
pub async fn setup(
    store: &Store,
    admin_username: &str,
    admin_password: &str,
    committee: &[String],
) -> Result<Vec<IssuedCredential>> {
    let admin_username = validate_username(admin_username)?;
    validate_password(admin_password)?;

    let mut tx = store.pool.begin().await?;

    let admins: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin'")
        .fetch_one(&mut *tx)
        .await?;
    if admins > 0 {
        return Err(Error::Conflict("Admin already exists. Setup already completed.".to_string()));
    }
    let mut credentials = Vec::with_capacity(committee.len() + 1);

    if insert_if_absent(&mut *tx, admin_username, admin_password, Role::Admin)
        .await?
        .is_none()
    {
        return Err(Error::Conflict("Username already exists".to_string()));
    }

    credentials.push(IssuedCredential {
        username: admin_username.to_string(),
        password: admin_password.to_string(),
        role: Role::Admin,
    });

    for username in committee {
        let Ok(username) = validate_username(username) else {
            warn!("Skipping blank committee username");
            continue;
        };

        let password = generate_password(12);
        match insert_if_absent(&mut *tx, username, &password, Role::Committee).await? {
            Some(_) => credentials.push(IssuedCredential {
                username: username.to_string(),
                password,
                role: Role::Committee,
            }),
            None => warn!("Skipping {username}, already exists"),
        }
    }

    tx.commit().await?;

    info!("Setup complete, created {} accounts", credentials.len());
    Ok(credentials)
}

pub fn generate_password(len: usize) -> String {
    let mut rng = thread_rng();

    (0..len)
        .map(|_| PASSWORD_CHARS[rng.gen_range(0..PASSWORD_CHARS.len())] as char)
        .collect()
}

fn validate_username(username: &str) -> Result<&str> {
    let username = username.trim();

    if username.is_empty() {
        return Err(Error::Validation("Username is required".to_string()));
    }

    Ok(username)
}

fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_store;

    fn admin(id: i64) -> Identity {
        Identity {
            id,
            username: "admin".to_string(),
            role: Role::Admin,
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = test_store().await;
        let id = create_user(&store, "kpipe", "secret1", Role::Committee).await.unwrap();

        let user = get_user(&store, id).await.unwrap();
        assert_eq!(user.username, "kpipe");
        assert_eq!(user.role, Role::Committee);

        let credentials = find_credentials(&store, "kpipe").await.unwrap().unwrap();
        assert!(verify_password("secret1", &credentials.password_hash).unwrap());
        assert!(find_credentials(&store, "KPIPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let store = test_store().await;
        create_user(&store, "kpipe", "secret1", Role::Committee).await.unwrap();

        let err = create_user(&store, "kpipe", "secret2", Role::Admin).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(ref m) if m == "Username already exists"));
    }

    #[tokio::test]
    async fn test_validation() {
        let store = test_store().await;

        assert!(matches!(
            create_user(&store, "  ", "secret1", Role::Committee).await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            create_user(&store, "kpipe", "short", Role::Committee).await,
            Err(Error::Validation(_))
        ));
        assert!(list_users(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_user() {
        let store = test_store().await;
        let admin_id = create_user(&store, "admin", "secret1", Role::Admin).await.unwrap();
        let member = create_user(&store, "kpipe", "secret1", Role::Committee).await.unwrap();

        assert!(matches!(
            delete_user(&store, &admin(admin_id), admin_id).await,
            Err(Error::Forbidden(_))
        ));

        let committee = Identity {
            id: member,
            username: "kpipe".to_string(),
            role: Role::Committee,
        };
        assert!(matches!(
            delete_user(&store, &committee, admin_id).await,
            Err(Error::Forbidden(_))
        ));
        assert_eq!(list_users(&store).await.unwrap().len(), 2);

        delete_user(&store, &admin(admin_id), member).await.unwrap();
        assert!(matches!(get_user(&store, member).await, Err(Error::NotFound(_))));
        assert!(matches!(
            delete_user(&store, &admin(admin_id), member).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_change_password() {
        let store = test_store().await;
        let id = create_user(&store, "kpipe", "secret1", Role::Committee).await.unwrap();

        assert!(matches!(
            change_password(&store, id, "wrong-one", "secret2").await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            change_password(&store, id, "secret1", "tiny").await,
            Err(Error::Validation(_))
        ));

        change_password(&store, id, "secret1", "secret2").await.unwrap();
        let credentials = find_credentials(&store, "kpipe").await.unwrap().unwrap();
        assert!(verify_password("secret2", &credentials.password_hash).unwrap());
        assert!(!verify_password("secret1", &credentials.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_setup_runs_once() {
        let store = test_store().await;
        let committee = vec!["kpipe".to_string(), "lstabilo".to_string(), "kpipe".to_string()];

        let issued = setup(&store, "admin", "secret1", &committee).await.unwrap();
        assert_eq!(issued.len(), 3);
        assert_eq!(issued[0].role, Role::Admin);
        assert!(issued[1..].iter().all(|c| c.password.len() == 12));

        assert_eq!(count_committee(&store).await.unwrap(), 2);
        assert!(admin_exists(&store).await.unwrap());

        assert!(matches!(
            setup(&store, "admin2", "secret1", &[]).await,
            Err(Error::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_setup_creates_one_admin() {
        let store = test_store().await;

        let (first, second) = tokio::join!(
            setup(&store, "admin", "secret1", &[]),
            setup(&store, "other-admin", "secret1", &[]),
        );

        assert_eq!([first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(), 1);
        let admins: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin'")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(admins, 1);
    }

    #[tokio::test]
    async fn test_create_with_generated_password() {
        let store = test_store().await;

        let issued = create_with_generated_password(&store, "kpipe", Role::Committee)
            .await
            .unwrap()
            .unwrap();
        let credentials = find_credentials(&store, "kpipe").await.unwrap().unwrap();
        assert!(verify_password(&issued.password, &credentials.password_hash).unwrap());

        assert!(create_with_generated_password(&store, "kpipe", Role::Committee)
            .await
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_generate_password() {
        let password = generate_password(16);

        assert_eq!(password.len(), 16);
        assert!(password.bytes().all(|b| PASSWORD_CHARS.contains(&b)));
        assert!(!password.contains('0') && !password.contains('O') && !password.contains('l'));
    }
}

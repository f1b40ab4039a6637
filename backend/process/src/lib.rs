//! # Maintenance
//!
//! One-off chores run against the same database the server uses.
//!
//! - Importing the nomination form's CSV export
//! - Exporting nominations to JSON, in the shape the import endpoint accepts
//! - Creating the first admin and committee accounts
//!
//! ## CSV Import
//! 1. Header cells are whitespace-collapsed, repeated headers get a numeric suffix.
//!
//! 2. Each known column lands in its own field. Nothing is concatenated.
//!
//! 3. Blank cells are stored as absent, there is no way to tell "blank" from "missing" in a CSV.
//!
//! 4. Rows are attributed to the first admin account.
//!
//! 5. A row without a nominee name, or one the CSV reader chokes on, is reported and skipped.
use std::{fs, path::Path};

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use ledger::{
    Store,
    models::{Identity, Role},
    nominations::{self, ImportReport},
    users::{self, IssuedCredential},
};

pub mod models;
pub mod utils;

use models::{Export, ExportRow};
use utils::{missing_columns, normalize_headers, to_input};

pub async fn open(database_url: &str) -> Result<Store> {
    let store = Store::connect(database_url).await?;
    store.migrate().await?;

    Ok(store)
}

pub async fn import_csv(store: &Store, path: &Path) -> Result<ImportReport> {
    let Some(admin) = users::first_admin(store).await? else {
        bail!("No admin user found. Create an admin account first.");
    };
    let admin = Identity::from(admin);
    println!("Using admin {} for created_by\n", admin.username);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let headers = normalize_headers(reader.headers()?.iter());
    for column in missing_columns(&headers) {
        println!("Warning: column \"{column}\" not found");
    }

    let records: Vec<_> = reader.records().collect();
    println!("Parsed {} rows from CSV\n", records.len());

    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )?
        .progress_chars("=> "),
    );

    let rows = records.into_iter().map(|record| {
        pb.inc(1);
        record
            .map(|record| to_input(&headers, &record))
            .map_err(|e| e.to_string())
    });

    let report = nominations::bulk_import(store, &admin, rows).await?;
    pb.finish_with_message("Done");

    println!("\nSuccessfully imported: {}", report.success_count);
    if report.error_count > 0 {
        println!("Errors: {}", report.error_count);
        for failure in &report.errors {
            println!("  row {}: {}", failure.row, failure.reason);
        }
    }

    Ok(report)
}

pub async fn export_json(store: &Store, path: &Path) -> Result<usize> {
    let nominations: Vec<ExportRow> = nominations::export_all(store)
        .await?
        .into_iter()
        .map(ExportRow::from)
        .collect();
    let count = nominations.len();

    let json = serde_json::to_string_pretty(&Export { nominations })?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Exported {count} nominations to {}", path.display());
    Ok(count)
}

pub async fn create_admin(store: &Store, username: &str, password: Option<String>) -> Result<IssuedCredential> {
    let password = password.unwrap_or_else(|| users::generate_password(16));
    users::create_user(store, username, &password, Role::Admin).await?;

    let credential = IssuedCredential {
        username: username.trim().to_string(),
        password,
        role: Role::Admin,
    };

    println!("Admin account created");
    print_credentials(std::slice::from_ref(&credential));

    Ok(credential)
}

pub async fn create_committee(store: &Store, usernames: &[String]) -> Result<Vec<IssuedCredential>> {
    let mut credentials = Vec::with_capacity(usernames.len());

    for username in usernames {
        match users::create_with_generated_password(store, username, Role::Committee).await? {
            Some(credential) => {
                println!("Created: {}", credential.username);
                credentials.push(credential);
            }
            None => println!("Skipped: {username} (already exists)"),
        }
    }

    println!();
    print_credentials(&credentials);
    println!("Send each member their credentials over a secure channel and ask them to change their password.");

    Ok(credentials)
}

fn print_credentials(credentials: &[IssuedCredential]) {
    for (index, credential) in credentials.iter().enumerate() {
        println!("{}. {}", index + 1, credential.username);
        println!("   Role: {}", credential.role);
        println!("   Temporary Password: {}\n", credential.password);
    }
}

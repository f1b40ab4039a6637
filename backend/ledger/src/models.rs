use std::{fmt, str::FromStr};

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Committee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Committee => "committee",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "committee" => Ok(Role::Committee),
            other => Err(Error::Validation(format!("Unknown role: {other}"))),
        }
    }
}

/// A user as exposed outside the credential store; never carries the hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub created_at: NaiveDateTime,
}

/// Who is making a request, as recovered from a verified token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Nomination {
    pub id: i64,
    #[sqlx(rename = "name")]
    pub person_name: String,
    #[sqlx(rename = "year")]
    pub person_year: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub fields: NominationFields,
    pub created_at: NaiveDateTime,
    pub created_by: Option<i64>,
}

/// Free-text fields of the nomination form. `None` means the field was not provided.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(default)]
pub struct NominationFields {
    pub career_position: Option<String>,
    pub professional_achievements: Option<String>,
    pub professional_awards: Option<String>,
    pub educational_achievements: Option<String>,
    pub merit_awards: Option<String>,
    pub service_church_community: Option<String>,
    pub service_mbaphs: Option<String>,
    pub nomination_summary: Option<String>,
    pub nominator_name: Option<String>,
    pub nominator_email: Option<String>,
    pub nominator_phone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NominationInput {
    #[serde(alias = "name", default)]
    pub person_name: String,
    #[serde(alias = "year", default, deserialize_with = "year_opt")]
    pub person_year: Option<String>,
    #[serde(flatten)]
    pub fields: NominationFields,
}

/// Partial update; every `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NominationPatch {
    #[serde(alias = "name", default)]
    pub person_name: Option<String>,
    #[serde(alias = "year", default, deserialize_with = "year_opt")]
    pub person_year: Option<String>,
    #[serde(flatten)]
    pub fields: NominationFields,
}

/// One (person, year) pair on a ballot. An empty year means the person has none on record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, FromRow)]
pub struct Selection {
    pub person_name: String,
    #[serde(default, deserialize_with = "year")]
    pub person_year: String,
}

impl Selection {
    pub fn new(person_name: impl Into<String>, person_year: impl Into<String>) -> Self {
        Self {
            person_name: person_name.into(),
            person_year: person_year.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct StoredSelection {
    pub person_name: String,
    pub person_year: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Person {
    pub person_name: String,
    pub person_year: String,
    pub nomination_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Voter {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultEntry {
    pub rank: usize,
    pub person_name: String,
    pub person_year: String,
    pub nomination_count: i64,
    pub selection_count: i64,
    pub total_committee: i64,
    pub percentage: i64,
    pub voters: Vec<Voter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_people: i64,
    pub total_nominations: i64,
    pub total_committee_members: i64,
    pub my_selections_count: i64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum YearValue {
    Text(String),
    Number(i64),
}

impl From<YearValue> for String {
    fn from(value: YearValue) -> Self {
        match value {
            YearValue::Text(s) => s.trim().to_string(),
            YearValue::Number(n) => n.to_string(),
        }
    }
}

/// Years arrive as numbers from some clients and as strings from others.
fn year_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<YearValue>::deserialize(deserializer)?.map(String::from))
}

fn year<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(year_opt(deserializer)?.unwrap_or_default())
}

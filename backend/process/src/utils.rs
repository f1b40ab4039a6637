use std::{collections::HashMap, sync::LazyLock};

use ledger::models::{NominationFields, NominationInput};
use regex::Regex;

use crate::models::*;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Collapses whitespace in each header and suffixes repeats (`Email`, `Email 2`).
pub fn normalize_headers<'a>(headers: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();

    headers
        .into_iter()
        .map(|header| {
            let normalized = WHITESPACE.replace_all(header, " ").trim().to_string();
            let count = seen.entry(normalized.clone()).or_insert(0);
            *count += 1;

            if *count == 1 {
                normalized
            } else {
                format!("{normalized} {count}")
            }
        })
        .collect()
}

/// Maps one form row onto a nomination. Every column lands in its own field and
/// blank cells stay absent.
pub fn to_input(headers: &[String], record: &csv::StringRecord) -> NominationInput {
    let row: HashMap<&str, &str> = headers
        .iter()
        .map(String::as_str)
        .zip(record.iter())
        .collect();

    let cell = |column: &str| {
        row.get(column)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    NominationInput {
        person_name: cell(NAME).unwrap_or_default(),
        person_year: cell(YEAR),
        fields: NominationFields {
            career_position: cell(CAREER_POSITION),
            professional_achievements: cell(PROFESSIONAL_ACHIEVEMENTS),
            professional_awards: cell(PROFESSIONAL_AWARDS),
            educational_achievements: cell(EDUCATIONAL_ACHIEVEMENTS),
            merit_awards: cell(MERIT_AWARDS),
            service_church_community: cell(SERVICE_CHURCH_COMMUNITY),
            service_mbaphs: cell(SERVICE_MBAPHS),
            nomination_summary: cell(NOMINATION_SUMMARY),
            nominator_name: cell(NOMINATOR_NAME),
            nominator_email: cell(NOMINATOR_EMAIL),
            nominator_phone: cell(NOMINATOR_PHONE),
        },
    }
}

/// Known columns missing from the header row.
pub fn missing_columns(headers: &[String]) -> Vec<&'static str> {
    COLUMNS
        .into_iter()
        .filter(|column| !headers.iter().any(|header| header == column))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(
            normalize_headers(["Name of the  Nominee", " Graduation\nYear "]),
            vec!["Name of the Nominee", "Graduation Year"]
        );
    }

    #[test]
    fn test_normalize_duplicates() {
        assert_eq!(
            normalize_headers(["Email", "Phone", "Email", "Email "]),
            vec!["Email", "Phone", "Email 2", "Email 3"]
        );
    }

    #[test]
    fn test_to_input() {
        let headers = normalize_headers([NAME, YEAR, MERIT_AWARDS, NOMINATOR_EMAIL, "Email"]);
        let record = csv::StringRecord::from(vec![" Jane Doe ", "2001", "", "jane@example.com", "other@example.com"]);

        let input = to_input(&headers, &record);
        assert_eq!(input.person_name, "Jane Doe");
        assert_eq!(input.person_year.as_deref(), Some("2001"));
        assert_eq!(input.fields.merit_awards, None);
        assert_eq!(input.fields.nominator_email.as_deref(), Some("jane@example.com"));
        assert_eq!(input.fields.career_position, None);
    }

    #[test]
    fn test_missing_name_stays_blank() {
        let headers = normalize_headers([NAME, YEAR]);
        let record = csv::StringRecord::from(vec!["", "1999"]);

        assert_eq!(to_input(&headers, &record).person_name, "");
    }

    #[test]
    fn test_missing_columns() {
        let headers = normalize_headers([NAME, YEAR]);
        let missing = missing_columns(&headers);

        assert_eq!(missing.len(), COLUMNS.len() - 2);
        assert!(!missing.contains(&NAME));
    }
}

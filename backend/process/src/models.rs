use ledger::models::{Nomination, NominationFields};
use serde::Serialize;

/// Column headers of the nomination form export, after whitespace is collapsed.
pub const NAME: &str = "Name of the Nominee";
pub const YEAR: &str = "Graduation Year";
pub const CAREER_POSITION: &str = "Career / Position / Title";
pub const PROFESSIONAL_ACHIEVEMENTS: &str = "Professional Achievements";
pub const PROFESSIONAL_AWARDS: &str = "Professional Awards and Honors";
pub const EDUCATIONAL_ACHIEVEMENTS: &str = "Educational Achievements";
pub const MERIT_AWARDS: &str = "Merit Awards";
pub const SERVICE_CHURCH_COMMUNITY: &str = "Service to Church and Community";
pub const SERVICE_MBAPHS: &str = "Service to MBAPHS";
pub const NOMINATION_SUMMARY: &str = "Nomination Summary / Narrative";
pub const NOMINATOR_NAME: &str = "Your Name";
pub const NOMINATOR_EMAIL: &str = "Email";
pub const NOMINATOR_PHONE: &str = "Phone";

pub const COLUMNS: [&str; 13] = [
    NAME,
    YEAR,
    CAREER_POSITION,
    PROFESSIONAL_ACHIEVEMENTS,
    PROFESSIONAL_AWARDS,
    EDUCATIONAL_ACHIEVEMENTS,
    MERIT_AWARDS,
    SERVICE_CHURCH_COMMUNITY,
    SERVICE_MBAPHS,
    NOMINATION_SUMMARY,
    NOMINATOR_NAME,
    NOMINATOR_EMAIL,
    NOMINATOR_PHONE,
];

#[derive(Serialize)]
pub struct Export {
    pub nominations: Vec<ExportRow>,
}

/// Content only, so an export can be fed straight back into the import endpoint.
#[derive(Serialize)]
pub struct ExportRow {
    pub person_name: String,
    pub person_year: Option<String>,
    #[serde(flatten)]
    pub fields: NominationFields,
}

impl From<Nomination> for ExportRow {
    fn from(nomination: Nomination) -> Self {
        Self {
            person_name: nomination.person_name,
            person_year: nomination.person_year,
            fields: nomination.fields,
        }
    }
}

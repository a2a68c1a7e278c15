//! Candidate repository: profiles, their child records, resumes and
//! prompt templates.

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Database, DatabaseError};
use crate::candidate::{
    parse_flexible_date, AiProfileUpdate, CandidateId, CandidateProfile, LanguageEntry,
    NewCandidate, StoredCareer, StoredCertification, StoredEducation,
};
use crate::collaborators::{CandidateRepository, CollaboratorResult};

const DATE_FORMAT: &str = "%Y-%m-%d";

fn to_sql_date(raw: Option<&str>) -> Option<String> {
    raw.and_then(parse_flexible_date)
        .map(|d| d.format(DATE_FORMAT).to_string())
}

fn from_sql_date(stored: Option<String>) -> Option<NaiveDate> {
    stored.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok())
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Inserts a candidate with all child records and the original resume in a
/// single transaction. Returns the new candidate id.
pub fn insert_candidate(db: &Database, candidate: &NewCandidate) -> Result<CandidateId, DatabaseError> {
    let metadata = serde_json::to_string(&candidate.metadata)?;
    let resume = &candidate.resume;
    let (industry, role_tags) = candidate
        .classification
        .as_ref()
        .map(|c| (non_blank(&c.industry).map(str::to_string), c.role_tags_joined()))
        .unwrap_or((None, None));

    db.with_transaction(|tx| {
        tx.execute(
            "INSERT INTO candidate_profiles (first_name, last_name, email, chinese_name, location,
             phone_number, personal_summary, availability_weeks, preferred_work_types,
             right_to_work, salary_expectation, citizenship, classification_of_interest,
             sub_classification_of_interest, remarks, metadata_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                resume.first_name.as_deref().unwrap_or_default(),
                resume.last_name.as_deref().unwrap_or_default(),
                resume.email.as_deref().unwrap_or_default(),
                resume.chinese_name,
                resume.location,
                resume.phone_number,
                resume.personal_summary,
                resume.availability_weeks,
                resume.preferred_work_types,
                resume.right_to_work,
                resume.salary_expectation,
                resume.citizenship,
                industry,
                role_tags,
                candidate.remarks,
                metadata,
            ],
        )?;
        let id = tx.last_insert_rowid();

        for entry in &resume.career_history {
            tx.execute(
                "INSERT INTO candidate_career_history (candidate_id, job_title, company_name,
                 start_date, end_date, description) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id,
                    entry.job_title,
                    entry.company_name,
                    to_sql_date(entry.start_date.as_deref()),
                    to_sql_date(entry.end_date.as_deref()),
                    entry.description,
                ],
            )?;
        }

        for skill in resume.skills.iter().filter_map(|s| non_blank(s)) {
            tx.execute(
                "INSERT INTO candidate_skills (candidate_id, skill) VALUES (?1, ?2)",
                params![id, skill],
            )?;
        }

        for entry in &resume.education {
            tx.execute(
                "INSERT INTO candidate_education (candidate_id, school, degree, field_of_study,
                 start_date, end_date, grade, description) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id,
                    entry.school,
                    entry.degree,
                    entry.field_of_study,
                    to_sql_date(entry.start_date.as_deref()),
                    to_sql_date(entry.end_date.as_deref()),
                    entry.grade,
                    entry.description,
                ],
            )?;
        }

        for entry in &resume.certifications {
            tx.execute(
                "INSERT INTO candidate_licenses_certifications (candidate_id, name,
                 issuing_organisation, issue_date, expiry_date, description)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id,
                    entry.name,
                    entry.issuing_organisation,
                    to_sql_date(entry.issue_date.as_deref()),
                    to_sql_date(entry.expiry_date.as_deref()),
                    entry.description,
                ],
            )?;
        }

        for entry in &resume.languages {
            let Some(language) = non_blank(&entry.language) else {
                continue;
            };
            tx.execute(
                "INSERT INTO candidate_languages (candidate_id, language, proficiency_level)
                 VALUES (?1, ?2, ?3)",
                params![id, language, entry.proficiency_level],
            )?;
        }

        if let Some(ref file) = candidate.resume_file {
            tx.execute(
                "INSERT INTO candidate_resumes (candidate_id, file_name, file_size, content_type, data)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id,
                    file.file_name,
                    file.bytes.len() as i64,
                    file.content_type,
                    file.bytes,
                ],
            )?;
        }

        Ok(id)
    })
}

/// Writes the AI summary and/or embedding. Fields left `None` keep their
/// stored value.
pub fn update_ai_fields(
    db: &Database,
    id: CandidateId,
    update: &AiProfileUpdate,
) -> Result<(), DatabaseError> {
    let embedding = update
        .embedding
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    db.with_transaction(|tx| {
        let changed = tx.execute(
            "UPDATE candidate_profiles SET
                 ai_short_summary = COALESCE(?2, ai_short_summary),
                 embedding_vector = COALESCE(?3, embedding_vector),
                 updated_at = datetime('now')
             WHERE id = ?1",
            params![id, update.summary, embedding],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "candidate",
                id,
            });
        }
        Ok(())
    })
}

fn profile_from_row(row: &Row<'_>) -> Result<(CandidateProfile, Option<String>), rusqlite::Error> {
    let profile = CandidateProfile {
        id: row.get("id")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        email: row.get("email")?,
        chinese_name: row.get("chinese_name")?,
        location: row.get("location")?,
        phone_number: row.get("phone_number")?,
        personal_summary: row.get("personal_summary")?,
        availability_weeks: row.get("availability_weeks")?,
        preferred_work_types: row.get("preferred_work_types")?,
        right_to_work: row.get("right_to_work")?,
        salary_expectation: row.get("salary_expectation")?,
        citizenship: row.get("citizenship")?,
        classification_of_interest: row.get("classification_of_interest")?,
        sub_classification_of_interest: row.get("sub_classification_of_interest")?,
        ai_short_summary: row.get("ai_short_summary")?,
        ..CandidateProfile::default()
    };
    Ok((profile, row.get("embedding_vector")?))
}

/// Loads an active profile together with its active child records.
pub fn load_profile(db: &Database, id: CandidateId) -> Result<CandidateProfile, DatabaseError> {
    db.with_conn(|conn| {
        let found = conn
            .query_row(
                "SELECT * FROM candidate_profiles WHERE id = ?1 AND is_active = 1",
                [id],
                profile_from_row,
            )
            .optional()?;
        let Some((mut profile, embedding)) = found else {
            return Err(DatabaseError::NotFound {
                entity: "candidate",
                id,
            });
        };

        profile.embedding_vector = embedding
            .as_deref()
            .map(serde_json::from_str::<Vec<f32>>)
            .transpose()?;
        load_children(conn, &mut profile)?;
        Ok(profile)
    })
}

fn load_children(conn: &Connection, profile: &mut CandidateProfile) -> Result<(), DatabaseError> {
    let id = profile.id;

    let mut stmt = conn.prepare(
        "SELECT job_title, company_name, start_date, end_date, description
         FROM candidate_career_history WHERE candidate_id = ?1 AND is_active = 1 ORDER BY id",
    )?;
    profile.career_history = stmt
        .query_map([id], |row| {
            Ok(StoredCareer {
                job_title: row.get(0)?,
                company_name: row.get(1)?,
                start_date: from_sql_date(row.get(2)?),
                end_date: from_sql_date(row.get(3)?),
                description: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT skill FROM candidate_skills WHERE candidate_id = ?1 AND is_active = 1 ORDER BY id",
    )?;
    profile.skills = stmt
        .query_map([id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT school, degree, field_of_study, start_date, end_date, grade, description
         FROM candidate_education WHERE candidate_id = ?1 AND is_active = 1 ORDER BY id",
    )?;
    profile.education = stmt
        .query_map([id], |row| {
            Ok(StoredEducation {
                school: row.get(0)?,
                degree: row.get(1)?,
                field_of_study: row.get(2)?,
                start_date: from_sql_date(row.get(3)?),
                end_date: from_sql_date(row.get(4)?),
                grade: row.get(5)?,
                description: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT name, issuing_organisation, issue_date, expiry_date, description
         FROM candidate_licenses_certifications
         WHERE candidate_id = ?1 AND is_active = 1 ORDER BY id",
    )?;
    profile.certifications = stmt
        .query_map([id], |row| {
            Ok(StoredCertification {
                name: row.get(0)?,
                issuing_organisation: row.get(1)?,
                issue_date: from_sql_date(row.get(2)?),
                expiry_date: from_sql_date(row.get(3)?),
                description: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT language, proficiency_level FROM candidate_languages
         WHERE candidate_id = ?1 AND is_active = 1 ORDER BY id",
    )?;
    profile.languages = stmt
        .query_map([id], |row| {
            Ok(LanguageEntry {
                language: row.get(0)?,
                proficiency_level: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(())
}

/// Ids of all active profiles, ascending.
pub fn list_active_profile_ids(db: &Database) -> Result<Vec<CandidateId>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT id FROM candidate_profiles WHERE is_active = 1 ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<CandidateId>, _>>()?;
        Ok(ids)
    })
}

/// Soft-deletes a profile; it no longer loads or lists.
pub fn deactivate_candidate(db: &Database, id: CandidateId) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE candidate_profiles SET is_active = 0, updated_at = datetime('now') WHERE id = ?1",
            [id],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "candidate",
                id,
            });
        }
        Ok(())
    })
}

/// Returns the stored resume `(file_name, content_type, bytes)` of a candidate.
pub fn load_resume(
    db: &Database,
    candidate_id: CandidateId,
) -> Result<Option<(String, String, Vec<u8>)>, DatabaseError> {
    db.with_conn(|conn| {
        let resume = conn
            .query_row(
                "SELECT file_name, content_type, data FROM candidate_resumes
                 WHERE candidate_id = ?1 AND is_active = 1 ORDER BY id DESC LIMIT 1",
                [candidate_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        Ok(resume)
    })
}

/// Inserts an inactive prompt template and returns its id.
pub fn insert_prompt_template(
    db: &Database,
    name: &str,
    template_type: &str,
    content: &str,
) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO ai_prompt_templates (name, template_type, content) VALUES (?1, ?2, ?3)",
            params![name, template_type, content],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

/// Makes `template_id` the only active template of its type.
pub fn activate_prompt_template(db: &Database, template_id: i64) -> Result<(), DatabaseError> {
    db.with_transaction(|tx| {
        let template_type: Option<String> = tx
            .query_row(
                "SELECT template_type FROM ai_prompt_templates WHERE id = ?1",
                [template_id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(template_type) = template_type else {
            return Err(DatabaseError::NotFound {
                entity: "prompt template",
                id: template_id,
            });
        };

        tx.execute(
            "UPDATE ai_prompt_templates SET is_active = 0, updated_at = datetime('now')
             WHERE template_type = ?1 AND id != ?2",
            params![template_type, template_id],
        )?;
        tx.execute(
            "UPDATE ai_prompt_templates SET is_active = 1, updated_at = datetime('now') WHERE id = ?1",
            [template_id],
        )?;
        Ok(())
    })
}

/// Id of the active template of `template_type`, if any.
pub fn active_prompt_template(db: &Database, template_type: &str) -> Result<Option<i64>, DatabaseError> {
    db.with_conn(|conn| {
        let id = conn
            .query_row(
                "SELECT id FROM ai_prompt_templates WHERE template_type = ?1 AND is_active = 1",
                [template_type],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    })
}

#[async_trait]
impl CandidateRepository for Database {
    async fn create_candidate(&self, candidate: NewCandidate) -> CollaboratorResult<CandidateId> {
        Ok(insert_candidate(self, &candidate)?)
    }

    async fn update_ai_fields(
        &self,
        id: CandidateId,
        update: &AiProfileUpdate,
    ) -> CollaboratorResult<()> {
        Ok(update_ai_fields(self, id, update)?)
    }

    async fn load_profile(&self, id: CandidateId) -> CollaboratorResult<CandidateProfile> {
        Ok(load_profile(self, id)?)
    }

    async fn list_active_profile_ids(&self) -> CollaboratorResult<Vec<CandidateId>> {
        Ok(list_active_profile_ids(self)?)
    }

    async fn activate_prompt_template(&self, template_id: i64) -> CollaboratorResult<()> {
        Ok(activate_prompt_template(self, template_id)?)
    }
}

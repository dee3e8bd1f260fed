//! Change detection and record reconciliation
//!
//! Every candidate is reduced to a content fingerprint; comparing it against
//! the stored fingerprint decides whether a sighting is a new posting, a
//! changed one, or a plain re-sighting. Re-sightings still refresh
//! `last_seen` so staleness can be judged later.

use crate::model::{CandidateRecord, JobRecord};
use crate::store::{Store, StoreResult};
use chrono::Utc;
use sha2::{Digest, Sha256};

/// How a candidate relates to what the store already holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// First sighting of this (external_id, site_key)
    New,

    /// Known posting whose content changed
    Updated,

    /// Known posting, content identical
    Unchanged,
}

/// Computes the content fingerprint of a candidate.
///
/// The digest covers title, company, location, salary and description in a
/// fixed order, with absent fields contributing an empty string, plus any
/// detail-page fields in key order. Identity fields (external id, URLs) are
/// deliberately excluded so a posting moving between pages does not read as
/// a change.
pub fn fingerprint(candidate: &CandidateRecord) -> String {
    let mut content = format!(
        "{}|{}|{}|{}|{}",
        candidate.title,
        candidate.company.as_deref().unwrap_or(""),
        candidate.location.as_deref().unwrap_or(""),
        candidate.salary.as_deref().unwrap_or(""),
        candidate.description.as_deref().unwrap_or(""),
    );

    for (key, value) in &candidate.additional_details {
        content.push('|');
        content.push_str(key);
        content.push('=');
        content.push_str(value);
    }

    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Reconciles extracted candidates against the store
pub struct DedupEngine;

impl DedupEngine {
    pub fn new() -> Self {
        Self
    }

    /// Classifies and persists one candidate.
    ///
    /// Unknown postings are created with `is_new` set. Known postings always
    /// get `last_seen` refreshed; content fields are overwritten only when
    /// the fingerprint differs. The lifecycle flags and `first_seen` are
    /// never touched for known postings.
    pub fn reconcile(
        &self,
        store: &mut dyn Store,
        site_key: &str,
        candidate: &CandidateRecord,
    ) -> StoreResult<Classification> {
        let digest = fingerprint(candidate);
        let now = Utc::now();

        let Some(mut existing) = store.find_by_key(&candidate.external_id, site_key)? else {
            let record = JobRecord {
                id: 0,
                external_id: candidate.external_id.clone(),
                site_key: site_key.to_string(),
                title: candidate.title.clone(),
                company: candidate.company.clone(),
                location: candidate.location.clone(),
                salary: candidate.salary.clone(),
                description: candidate.description.clone(),
                requirements: candidate.requirements.clone(),
                additional_details: candidate.additional_details.clone(),
                url: candidate.url.clone(),
                first_seen: now,
                last_seen: now,
                is_new: true,
                is_relevant: false,
                is_processed: false,
                fingerprint: digest,
                created_at: now,
                updated_at: now,
            };
            store.create(&record)?;
            tracing::info!("New posting: {} ({})", candidate.title, candidate.external_id);
            return Ok(Classification::New);
        };

        existing.last_seen = now;
        existing.updated_at = now;

        if existing.fingerprint == digest {
            store.update(&existing)?;
            return Ok(Classification::Unchanged);
        }

        existing.title = candidate.title.clone();
        existing.company = candidate.company.clone();
        existing.location = candidate.location.clone();
        existing.salary = candidate.salary.clone();
        existing.description = candidate.description.clone();
        existing.requirements = candidate.requirements.clone();
        existing.additional_details = candidate.additional_details.clone();
        existing.url = candidate.url.clone();
        existing.fingerprint = digest;

        store.update(&existing)?;
        tracing::info!(
            "Updated posting: {} ({})",
            candidate.title,
            candidate.external_id
        );
        Ok(Classification::Updated)
    }
}

impl Default for DedupEngine {
    fn default() -> Self {
        Self::new()
    }
}

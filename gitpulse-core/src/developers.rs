//! Developer identity unification
//!
//! Collapses author signatures with varying names and emails into canonical
//! identities. Lookup is keyed by normalized (trimmed, lower-cased) name and
//! email; email takes precedence when both are present. Single-threaded by
//! design: signatures are observed once, chronologically ascending.

use crate::repo::Commit;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// A canonical developer with the signature variants observed for them
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DeveloperIdentity {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "BTreeSet::is_empty", default)]
    pub alternative_names: BTreeSet<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty", default)]
    pub alternative_emails: BTreeSet<String>,
}

impl DeveloperIdentity {
    fn new(name: &str, email: &str) -> DeveloperIdentity {
        DeveloperIdentity {
            name: name.to_string(),
            email: email.to_string(),
            alternative_names: BTreeSet::new(),
            alternative_emails: BTreeSet::new(),
        }
    }

    /// Display form: canonical name, canonical email as fallback
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            if self.email.is_empty() {
                "(anonymous)"
            } else {
                &self.email
            }
        } else {
            &self.name
        }
    }
}

/// Signature-to-identity assignment for an analyzed span
#[derive(Debug, Clone, Default)]
pub struct Unification {
    pub identities: Vec<DeveloperIdentity>,
    /// Commit id → index into `identities`
    pub by_commit: HashMap<String, usize>,
}

impl Unification {
    pub fn identity_of(&self, commit_id: &str) -> Option<&DeveloperIdentity> {
        self.by_commit
            .get(commit_id)
            .and_then(|&idx| self.identities.get(idx))
    }
}

/// Incremental unifier over observed signatures
#[derive(Debug, Default)]
pub struct DeveloperUnifier {
    identities: Vec<DeveloperIdentity>,
    by_name: HashMap<String, usize>,
    by_email: HashMap<String, usize>,
    anonymous: Option<usize>,
}

impl DeveloperUnifier {
    pub fn new() -> DeveloperUnifier {
        DeveloperUnifier::default()
    }

    /// Observe one signature and return its identity index.
    ///
    /// Both parts empty binds to a shared anonymous identity. With only one
    /// part present, that part's map decides. With both present, a known
    /// email wins; otherwise a known name is reused and the email is bound
    /// to it; otherwise a fresh identity registers under both keys.
    pub fn observe(&mut self, name: &str, email: &str) -> usize {
        let norm_name = name.trim().to_lowercase();
        let norm_email = email.trim().to_lowercase();

        let idx = match (norm_name.is_empty(), norm_email.is_empty()) {
            (true, true) => match self.anonymous {
                Some(idx) => idx,
                None => {
                    let idx = self.create("", "");
                    self.anonymous = Some(idx);
                    idx
                }
            },
            (false, true) => match self.by_name.get(&norm_name).copied() {
                Some(idx) => idx,
                None => {
                    let idx = self.create(name.trim(), "");
                    self.by_name.insert(norm_name.clone(), idx);
                    idx
                }
            },
            (true, false) => match self.by_email.get(&norm_email).copied() {
                Some(idx) => idx,
                None => {
                    let idx = self.create("", email.trim());
                    self.by_email.insert(norm_email.clone(), idx);
                    idx
                }
            },
            (false, false) => {
                if let Some(idx) = self.by_email.get(&norm_email).copied() {
                    self.by_name.entry(norm_name.clone()).or_insert(idx);
                    idx
                } else if let Some(idx) = self.by_name.get(&norm_name).copied() {
                    self.by_email.insert(norm_email.clone(), idx);
                    idx
                } else {
                    let idx = self.create(name.trim(), email.trim());
                    self.by_name.insert(norm_name.clone(), idx);
                    self.by_email.insert(norm_email.clone(), idx);
                    idx
                }
            }
        };

        self.record_variants(idx, name.trim(), email.trim());
        idx
    }

    fn create(&mut self, name: &str, email: &str) -> usize {
        self.identities.push(DeveloperIdentity::new(name, email));
        self.identities.len() - 1
    }

    /// Record the exact observed parts: promote into an empty canonical
    /// slot, otherwise keep them as alternatives.
    fn record_variants(&mut self, idx: usize, name: &str, email: &str) {
        let identity = &mut self.identities[idx];
        if !name.is_empty() {
            if identity.name.is_empty() {
                identity.name = name.to_string();
            } else if identity.name != name {
                identity.alternative_names.insert(name.to_string());
            }
        }
        if !email.is_empty() {
            if identity.email.is_empty() {
                identity.email = email.to_string();
            } else if identity.email != email {
                identity.alternative_emails.insert(email.to_string());
            }
        }
    }

    pub fn identities(&self) -> &[DeveloperIdentity] {
        &self.identities
    }

    pub fn into_identities(self) -> Vec<DeveloperIdentity> {
        self.identities
    }
}

/// Unify the author signatures of a commit span.
///
/// `commits` must be ordered chronologically ascending; identities form in
/// first-seen order.
pub fn unify_commits(commits: &[Commit]) -> Unification {
    let mut unifier = DeveloperUnifier::new();
    let mut by_commit = HashMap::with_capacity(commits.len());
    for commit in commits {
        let idx = unifier.observe(&commit.author.name, &commit.author.email);
        by_commit.insert(commit.id.clone(), idx);
    }
    Unification {
        identities: unifier.into_identities(),
        by_commit,
    }
}

//! Resource name derivation and availability-driven conflict resolution.
//!
//! One validated [`ProjectName`] plus a [`Suffix`] deterministically yields a
//! [`NameSet`]: resource group, storage account, Synapse workspace and the
//! suffixed project name handed to the infrastructure template. [`resolve`]
//! probes only the storage account name, which is the most constrained
//! namespace (global, no dashes, at most 24 characters). Resource group and
//! workspace uniqueness are assumed to follow from the same suffix; workspace
//! names are global too and are never verified.

use std::fmt;
use std::sync::OnceLock;

use rand::Rng;
use regex::Regex;
use serde::Serialize;

use crate::defaults::NamingConfig;
use crate::error::{Error, Result};

pub const PROJECT_NAME_MIN_LEN: usize = 3;
pub const PROJECT_NAME_MAX_LEN: usize = 20;
pub const STORAGE_NAME_MAX_LEN: usize = 24;
pub const RANDOM_SUFFIX_LEN: usize = 4;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

fn random_suffix_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z0-9]{4}$").expect("suffix pattern is valid"))
}

fn project_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z][a-z0-9-]*[a-z0-9]$").expect("project name pattern is valid")
    })
}

/// A validated project name: lowercase letters, digits and dashes, starting
/// with a letter and ending with a letter or digit, 3-20 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ProjectName(String);

impl ProjectName {
    pub fn parse(raw: &str) -> Result<Self> {
        let value = raw.trim();
        let len = value.chars().count();

        if !(PROJECT_NAME_MIN_LEN..=PROJECT_NAME_MAX_LEN).contains(&len) {
            return Err(Error::validation_invalid_argument(
                "project_name",
                format!(
                    "Project name must be {}-{} characters (got {})",
                    PROJECT_NAME_MIN_LEN, PROJECT_NAME_MAX_LEN, len
                ),
                Some(value.to_string()),
                None,
            ));
        }

        if !project_name_pattern().is_match(value) {
            return Err(Error::validation_invalid_argument(
                "project_name",
                "Project name may only contain lowercase letters, numbers and dashes, \
                 must start with a letter and end with a letter or number",
                Some(value.to_string()),
                None,
            ));
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Disambiguating suffix applied identically to every derived name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Suffix {
    None,
    Counter(u32),
    Random(String),
}

impl Suffix {
    /// Interpret a user-supplied suffix: empty, a canonical counter, or a
    /// 4-character `[a-z0-9]` token. Anything else would break the storage
    /// account charset and is rejected.
    pub fn from_input(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Suffix::None);
        }
        if let Some(n) = raw.parse::<u32>().ok().filter(|n| n.to_string() == raw) {
            return Ok(Suffix::Counter(n));
        }
        if random_suffix_pattern().is_match(raw) {
            return Ok(Suffix::Random(raw.to_string()));
        }
        Err(Error::validation_invalid_argument(
            "suffix",
            format!(
                "Suffix must be empty, a number, or {} lowercase letters/digits",
                RANDOM_SUFFIX_LEN
            ),
            Some(raw.to_string()),
            None,
        ))
    }
}

impl fmt::Display for Suffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Suffix::None => Ok(()),
            Suffix::Counter(n) => write!(f, "{}", n),
            Suffix::Random(token) => f.write_str(token),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NameSet {
    pub resource_group_name: String,
    pub storage_account_name: String,
    pub workspace_name: String,
    pub final_project_name: String,
}

/// Derive every resource name for one attempt. Pure.
pub fn derive(project: &ProjectName, suffix: &Suffix) -> NameSet {
    let suffix = suffix.to_string();
    let project = project.as_str();

    NameSet {
        resource_group_name: format!("rg-{}{}", project, suffix),
        storage_account_name: storage_account_name(project, &suffix),
        workspace_name: format!("{}{}-syn", project, suffix),
        final_project_name: format!("{}{}", project, suffix),
    }
}

fn storage_account_name(project: &str, suffix: &str) -> String {
    project
        .chars()
        .filter(|c| *c != '-')
        .chain("st".chars())
        .chain(suffix.chars())
        .take(STORAGE_NAME_MAX_LEN)
        .collect()
}

/// Remote check for global storage account name availability.
pub trait NameAvailability {
    fn is_available(&self, storage_account_name: &str) -> Result<bool>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Available,
    Taken,
    /// The check itself failed. Treated exactly like `Taken`.
    Error { message: String },
}

impl ProbeOutcome {
    pub fn is_available(&self) -> bool {
        matches!(self, ProbeOutcome::Available)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub attempt: u32,
    pub suffix: Suffix,
    pub storage_account_name: String,
    pub outcome: ProbeOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub project_name: ProjectName,
    pub suffix: Suffix,
    pub names: NameSet,
    pub attempts: Vec<Attempt>,
    /// Whether the accepted storage name was reported available.
    pub verified: bool,
    /// Whether the checked attempts were exhausted and a random suffix was used.
    pub fallback: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvePolicy {
    pub max_attempts: u32,
    pub verify_fallback: bool,
}

impl Default for ResolvePolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            verify_fallback: false,
        }
    }
}

impl From<&NamingConfig> for ResolvePolicy {
    fn from(config: &NamingConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            verify_fallback: config.verify_fallback,
        }
    }
}

/// Resolve a name set with the default policy and the thread RNG.
pub fn resolve<A>(project: &ProjectName, availability: &A) -> Resolution
where
    A: NameAvailability + ?Sized,
{
    resolve_with(project, availability, &ResolvePolicy::default(), &mut rand::rng())
}

/// First-fit resolution: try `""`, `"1"`, `"2"`, ... until the storage name is
/// available or `max_attempts` checks have been spent, then fall back to a
/// random 4-character suffix.
///
/// The fallback is accepted without a check unless `verify_fallback` is set,
/// and even then it is accepted regardless of the answer. Probe errors count
/// as "taken". This never fails.
pub fn resolve_with<A, R>(
    project: &ProjectName,
    availability: &A,
    policy: &ResolvePolicy,
    rng: &mut R,
) -> Resolution
where
    A: NameAvailability + ?Sized,
    R: Rng + ?Sized,
{
    let mut attempts = Vec::new();
    let mut suffix = Suffix::None;
    let mut counter = 0;

    while counter < policy.max_attempts {
        let names = derive(project, &suffix);
        log_status!(
            "names",
            "Checking storage account name '{}' ({}/{})",
            names.storage_account_name,
            counter + 1,
            policy.max_attempts
        );

        let outcome = probe(availability, &names.storage_account_name);
        let available = outcome.is_available();
        attempts.push(Attempt {
            attempt: counter + 1,
            suffix: suffix.clone(),
            storage_account_name: names.storage_account_name.clone(),
            outcome,
        });

        if available {
            return Resolution {
                project_name: project.clone(),
                suffix,
                names,
                attempts,
                verified: true,
                fallback: false,
                warnings: Vec::new(),
            };
        }

        counter += 1;
        suffix = Suffix::Counter(counter);
    }

    let suffix = Suffix::Random(random_suffix(rng));
    let names = derive(project, &suffix);
    let mut warnings = Vec::new();

    log_status!(
        "names",
        "No available name after {} attempts, using random suffix '{}'",
        policy.max_attempts,
        suffix
    );

    let verified = if policy.verify_fallback {
        let outcome = probe(availability, &names.storage_account_name);
        let available = outcome.is_available();
        attempts.push(Attempt {
            attempt: policy.max_attempts + 1,
            suffix: suffix.clone(),
            storage_account_name: names.storage_account_name.clone(),
            outcome,
        });
        if !available {
            warnings.push(format!(
                "Fallback storage account name '{}' was not reported available; deployment may collide",
                names.storage_account_name
            ));
        }
        available
    } else {
        warnings.push(format!(
            "Fallback storage account name '{}' was not checked for availability",
            names.storage_account_name
        ));
        false
    };

    Resolution {
        project_name: project.clone(),
        suffix,
        names,
        attempts,
        verified,
        fallback: true,
        warnings,
    }
}

fn probe<A>(availability: &A, storage_account_name: &str) -> ProbeOutcome
where
    A: NameAvailability + ?Sized,
{
    match availability.is_available(storage_account_name) {
        Ok(true) => ProbeOutcome::Available,
        Ok(false) => ProbeOutcome::Taken,
        Err(err) => {
            log_status!(
                "names",
                "Availability check for '{}' failed, treating as taken: {}",
                storage_account_name,
                err
            );
            ProbeOutcome::Error {
                message: err.to_string(),
            }
        }
    }
}

/// Random lowercase-alphanumeric token of `RANDOM_SUFFIX_LEN` characters.
pub fn random_suffix<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..RANDOM_SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.random_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect()
}

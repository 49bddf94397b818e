use anyhow::{Context, bail};
use bank_utils::writer::MAX_BATCH_LIMIT;
use sentry::types::Dsn;
use std::{env::var, fmt};
use tracing::warn;

#[derive(Clone, Debug)]
pub struct EnvVars {
    pub batch_limit: usize,
    pub bucket_name: String,
    pub environment: Environment,
    pub mongodb_uri: Option<String>,
    pub sentry_dsn: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl From<String> for Environment {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "development" => Environment::Development,
            "staging" => Environment::Staging,
            "production" => Environment::Production,
            other => {
                warn!(
                    "ENVIRONMENT value '{}' is not valid. Defaulting to 'production'.",
                    other
                );
                Environment::Production
            }
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        };
        f.write_str(s)
    }
}

impl EnvVars {
    pub fn new() -> anyhow::Result<Self> {
        Self::from_lookup(|key| var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mongodb_uri = lookup("MONGODB_URI").filter(|uri| !uri.is_empty());

        let sentry_dsn = match lookup("SENTRY_DSN").filter(|dsn| !dsn.is_empty()) {
            Some(dsn_string) => {
                if !valid_sentry_dsn(&dsn_string) {
                    bail!("SENTRY_DSN is not valid DSN.");
                }
                Some(dsn_string)
            }
            None => None,
        };

        let environment = match lookup("ENVIRONMENT") {
            Some(v) => v.into(),
            None => {
                warn!("ENVIRONMENT not set. Defaulting to 'production'.");
                Environment::Production
            }
        };

        let batch_limit = match lookup("BATCH_LIMIT") {
            Some(v) => {
                let limit: usize = v
                    .parse()
                    .with_context(|| format!("BATCH_LIMIT '{v}' is not a whole number"))?;
                if limit == 0 || limit > MAX_BATCH_LIMIT {
                    bail!("BATCH_LIMIT must be between 1 and {MAX_BATCH_LIMIT}, got {limit}");
                }
                limit
            }
            None => MAX_BATCH_LIMIT,
        };

        let default_bucket_name = "EXAM_PREP_ASSETS".to_string();
        let bucket_name = match lookup("S3_BUCKET_NAME").filter(|s| !s.is_empty()) {
            Some(s) => s,
            None => default_bucket_name,
        };

        Ok(Self {
            batch_limit,
            bucket_name,
            environment,
            mongodb_uri,
            sentry_dsn,
        })
    }

    /// The connection string for jobs that touch the database.
    pub fn require_mongodb_uri(&self) -> anyhow::Result<&str> {
        self.mongodb_uri
            .as_deref()
            .context("MONGODB_URI required (set it in the environment or pass --mongodb-uri)")
    }
}

fn valid_sentry_dsn(url: &str) -> bool {
    url.parse::<Dsn>().is_ok()
}

// libs/appointment-cell/src/services/credentials.rs
use std::collections::HashMap;

use tracing::warn;

use shared_config::AppConfig;

use crate::models::normalize_provider_id;

/// Answers "may this provider open their dashboard".
pub trait CredentialLookup: Send + Sync {
    fn verify(&self, provider_id: &str, secret: &str) -> bool;
}

/// Fixed table of provider secrets, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    table: HashMap<String, String>,
}

impl StaticCredentials {
    /// Parses `id:secret` pairs separated by commas. Malformed pairs are skipped.
    pub fn parse(raw: &str) -> Self {
        let mut table = HashMap::new();

        for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match pair.split_once(':') {
                Some((id, secret)) if !id.trim().is_empty() && !secret.is_empty() => {
                    table.insert(normalize_provider_id(id), secret.to_string());
                }
                _ => warn!("Ignoring malformed provider credential entry"),
            }
        }

        Self { table }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::parse(&config.provider_credentials)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl CredentialLookup for StaticCredentials {
    fn verify(&self, provider_id: &str, secret: &str) -> bool {
        self.table
            .get(provider_id)
            .is_some_and(|expected| expected == secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reads_pairs_and_skips_garbage() {
        let credentials =
            StaticCredentials::parse("oussama:1234567, zaki:1234 ,broken,:nope,mounir:");
        assert_eq!(credentials.len(), 2);
        assert!(credentials.verify("oussama", "1234567"));
        assert!(credentials.verify("zaki", "1234"));
    }

    #[test]
    fn verify_is_exact_on_both_sides() {
        let credentials = StaticCredentials::parse("zaki:1234");
        assert!(!credentials.verify("zaki", "12345"));
        assert!(!credentials.verify("ZAKI", "1234"));
        assert!(!credentials.verify("mounir", "1234"));
    }

    #[test]
    fn secrets_may_contain_colons() {
        let credentials = StaticCredentials::parse("zaki:a:b");
        assert!(credentials.verify("zaki", "a:b"));
    }

    #[test]
    fn empty_table_rejects_everyone() {
        let credentials = StaticCredentials::default();
        assert!(credentials.is_empty());
        assert!(!credentials.verify("zaki", ""));
    }
}

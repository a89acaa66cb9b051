use std::collections::HashSet;
use std::fmt;

use loupe_api::{ProviderModule, ProviderSettings};
use loupe_provider_api::ProviderError;

/// One rejected provider entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFailure {
    /// Identifier of the rejected entry, possibly empty.
    pub id: String,
    /// Why the entry was rejected.
    pub reason: String,
}

impl ConfigFailure {
    /// Failure for `id` with a human-readable `reason`.
    pub fn new(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConfigFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.reason)
    }
}

/// Check every entry of a configuration batch, reporting all failures at once.
///
/// Ids must be non-empty and unique, required module fields must be non-blank,
/// and URL fields must parse as absolute `http` or `https` URLs.
///
/// # Errors
///
/// Returns every [`ConfigFailure`] found in the batch.
pub fn validate(settings: &[ProviderSettings]) -> Result<(), Vec<ConfigFailure>> {
    let mut failures = Vec::new();
    let mut seen = HashSet::new();

    for entry in settings {
        if is_blank(&entry.id) {
            failures.push(ConfigFailure::new(&entry.id, "id is empty"));
        } else if !seen.insert(entry.id.as_str()) {
            failures.push(ConfigFailure::new(&entry.id, "duplicate id"));
        }

        for reason in module_problems(&entry.module) {
            failures.push(ConfigFailure::new(&entry.id, reason));
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(failures)
    }
}

fn module_problems(module: &ProviderModule) -> Vec<String> {
    let mut problems = Vec::new();
    match module {
        ProviderModule::Upsource { url, token } | ProviderModule::Gitlab { url, token } => {
            check_url(url, &mut problems);
            require("token", token, &mut problems);
        }
        ProviderModule::Github { token, query } => {
            require("token", token, &mut problems);
            require("query", query, &mut problems);
        }
    }
    problems
}

fn require(field: &str, value: &str, problems: &mut Vec<String>) {
    if is_blank(value) {
        problems.push(format!("{field} is empty"));
    }
}

fn check_url(url: &str, problems: &mut Vec<String>) {
    if is_blank(url) {
        problems.push("url is empty".to_owned());
        return;
    }
    match loupe_providers::check_base_url(url) {
        Ok(()) => {}
        Err(ProviderError::InvalidConfiguration { message }) => problems.push(message),
        Err(other) => problems.push(other.to_string()),
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn github(id: &str, token: &str, query: &str) -> ProviderSettings {
        ProviderSettings {
            id: id.into(),
            name: format!("GitHub {id}"),
            module: ProviderModule::Github {
                token: token.into(),
                query: query.into(),
            },
        }
    }

    fn gitlab(id: &str, url: &str) -> ProviderSettings {
        ProviderSettings {
            id: id.into(),
            name: "GitLab".into(),
            module: ProviderModule::Gitlab {
                url: url.into(),
                token: "t".into(),
            },
        }
    }

    #[test]
    fn accepts_well_formed_batch() {
        let batch = [
            github("gh1", "t", "is:open"),
            gitlab("gl1", "https://gitlab.example.com"),
        ];
        assert_eq!(validate(&batch), Ok(()));
        assert_eq!(validate(&[]), Ok(()));
    }

    #[test]
    fn reports_every_failure() {
        let batch = [
            github("gh1", "t", "is:open"),
            github("gh1", " ", "is:open"),
            gitlab("gl1", "ftp://gitlab.example.com"),
            gitlab("", "gitlab.example.com"),
        ];
        let failures = validate(&batch).expect_err("invalid batch");

        let reasons: Vec<String> = failures.iter().map(ToString::to_string).collect();
        assert_eq!(
            reasons,
            [
                "gh1: duplicate id",
                "gh1: token is empty",
                "gl1: unsupported url scheme 'ftp'",
                ": id is empty",
                ": invalid url 'gitlab.example.com': relative URL without a base",
            ]
        );
    }

    #[test]
    fn blank_query_is_rejected() {
        let failures = validate(&[github("gh1", "t", "\t")]).expect_err("blank query");
        assert_eq!(failures, [ConfigFailure::new("gh1", "query is empty")]);
    }
}

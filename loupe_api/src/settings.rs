use std::fmt;

use serde::{Deserialize, Serialize};

/// Configuration of one backend as sent by the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Identifier the UI uses to address this provider; unique per configuration.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Backend kind and credentials.
    pub module: ProviderModule,
}

/// Backend kind together with the credentials it needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderModule {
    /// JetBrains Upsource server.
    Upsource {
        /// Server base URL.
        url: String,
        /// Bearer token.
        token: String,
    },
    /// GitHub pull requests matching a search query.
    Github {
        /// Personal access token.
        token: String,
        /// Issue search query, e.g. `is:open review-requested:@me`.
        query: String,
    },
    /// GitLab merge requests.
    Gitlab {
        /// Instance base URL.
        url: String,
        /// Personal access token.
        token: String,
    },
}

impl ProviderModule {
    /// Backend kind of this module.
    pub const fn kind(&self) -> ProviderKind {
        match self {
            Self::Upsource { .. } => ProviderKind::Upsource,
            Self::Github { .. } => ProviderKind::Github,
            Self::Gitlab { .. } => ProviderKind::Gitlab,
        }
    }
}

/// Closed set of supported backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// JetBrains Upsource.
    Upsource,
    /// GitHub.
    Github,
    /// GitLab.
    Gitlab,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Upsource => "upsource",
            Self::Github => "github",
            Self::Gitlab => "gitlab",
        };
        f.write_str(label)
    }
}

//! Chain and provider selection

use std::collections::BTreeSet;

/// Registry folders that never hold a chain record
pub const DEFAULT_IGNORED_FOLDERS: &[&str] = &[
    "_IBC",
    "_memo_keys",
    "_non-cosmos",
    "_scripts",
    "_template",
    "testnets",
    "node_modules",
];

/// Decides which chain folders and providers a pass looks at.
///
/// Built once from config and CLI flags, then only read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainFilter {
    /// Folder names that are never chains
    ignored_folders: BTreeSet<String>,
    /// Chains skipped on purpose
    ignored_chains: BTreeSet<String>,
    /// When non-empty, only these chains are considered
    chains: BTreeSet<String>,
    /// When non-empty, only endpoints from these providers are considered
    providers: BTreeSet<String>,
}

impl Default for ChainFilter {
    fn default() -> Self {
        Self {
            ignored_folders: DEFAULT_IGNORED_FOLDERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ignored_chains: BTreeSet::new(),
            chains: BTreeSet::new(),
            providers: BTreeSet::new(),
        }
    }
}

impl ChainFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter for extra ignored folders
    pub fn ignore_folders<I, S>(mut self, folders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_folders
            .extend(folders.into_iter().map(Into::into));
        self
    }

    /// Builder-style setter for ignored chains
    pub fn ignore_chains<I, S>(mut self, chains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_chains.extend(chains.into_iter().map(Into::into));
        self
    }

    /// Restrict to the given chains
    pub fn only_chains<I, S>(mut self, chains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chains.extend(chains.into_iter().map(Into::into));
        self
    }

    /// Restrict to the given providers
    pub fn only_providers<I, S>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.providers
            .extend(providers.into_iter().map(Into::into));
        self
    }

    /// Check if a registry folder should be treated as a chain
    pub fn allows_folder(&self, folder: &str) -> bool {
        if folder.starts_with('.') || self.ignored_folders.contains(folder) {
            return false;
        }
        if self.ignored_chains.contains(folder) {
            return false;
        }
        self.chains.is_empty() || self.chains.contains(folder)
    }

    /// Check if an endpoint's provider is selected
    pub fn allows_provider(&self, provider: Option<&str>) -> bool {
        if self.providers.is_empty() {
            return true;
        }
        provider.is_some_and(|p| self.providers.contains(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ignores_meta_folders() {
        let filter = ChainFilter::default();

        assert!(filter.allows_folder("osmosis"));
        assert!(!filter.allows_folder("_IBC"));
        assert!(!filter.allows_folder("_template"));
        assert!(!filter.allows_folder("testnets"));
        assert!(!filter.allows_folder(".github"));
        assert!(!filter.allows_folder(".git"));
    }

    #[test]
    fn test_allow_and_ignore_lists() {
        let filter = ChainFilter::new()
            .only_chains(["osmosis", "juno"])
            .ignore_chains(["juno"]);

        assert!(filter.allows_folder("osmosis"));
        assert!(!filter.allows_folder("juno"));
        assert!(!filter.allows_folder("cosmoshub"));
    }

    #[test]
    fn test_provider_filter() {
        let open = ChainFilter::default();
        assert!(open.allows_provider(None));
        assert!(open.allows_provider(Some("Polkachu")));

        let filter = ChainFilter::new().only_providers(["Polkachu", "Stake&Relax 🦥"]);
        assert!(filter.allows_provider(Some("Polkachu")));
        assert!(filter.allows_provider(Some("Stake&Relax 🦥")));
        assert!(!filter.allows_provider(Some("forbole")));
        assert!(!filter.allows_provider(None));
    }
}

// src/state/selector.rs

use std::collections::BTreeSet;

use regex::Regex;

/// Which devices of a topology a request targets.
#[derive(Debug, Clone)]
pub enum DeviceSelector {
    /// Every device in the topology.
    All,
    /// Devices whose full path matches the regex.
    Pattern(Regex),
    /// Exactly these device paths (used internally, e.g. for devices added by
    /// an update).
    Paths(BTreeSet<String>),
}

impl DeviceSelector {
    /// Build a selector from a request's path field.
    ///
    /// An empty path selects all devices. Anything else is a regex that must
    /// match the whole device path.
    pub fn from_path(path: &str) -> Result<Self, regex::Error> {
        let path = path.trim();
        if path.is_empty() {
            return Ok(DeviceSelector::All);
        }
        let re = Regex::new(&format!("^(?:{path})$"))?;
        Ok(DeviceSelector::Pattern(re))
    }

    pub fn paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DeviceSelector::Paths(paths.into_iter().map(Into::into).collect())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, DeviceSelector::All)
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            DeviceSelector::All => true,
            DeviceSelector::Pattern(re) => re.is_match(path),
            DeviceSelector::Paths(paths) => paths.contains(path),
        }
    }
}

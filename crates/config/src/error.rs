//! Errors raised while loading a [`Config`](crate::Config).
//!
//! Every problem is reported against the dotted key of the setting it concerns, whether it was
//! caught by figment while extracting or by validating the chain profile afterwards.

use crate::chain::ChainProfileError;
use std::{error::Error, fmt};

/// The first line of every config error.
pub const FAILED_TO_EXTRACT_CONFIG_MSG: &str = "failed to load arc config:";

/// A problem with a single setting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettingError {
    /// Dotted key, e.g. `chain.rpc_urls`. Empty if the problem is not tied to one setting.
    pub key: String,
    /// Where the value came from, e.g. `TOML file arc.toml`.
    pub origin: Option<String>,
    pub message: String,
}

impl SettingError {
    fn from_figment(err: &figment::Error) -> Self {
        let origin = err.metadata.as_ref().map(|meta| match &meta.source {
            Some(source) => format!("{} {source}", meta.name),
            None => meta.name.to_string(),
        });
        Self { key: err.path.join("."), origin, message: err.kind.to_string() }
    }
}

impl From<&ChainProfileError> for SettingError {
    fn from(err: &ChainProfileError) -> Self {
        Self { key: err.setting().to_string(), origin: None, message: err.to_string() }
    }
}

impl fmt::Display for SettingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if !self.key.is_empty() {
            write!(f, " for setting `{}`", self.key)?;
        }
        if let Some(origin) = &self.origin {
            write!(f, " in {origin}")?;
        }
        Ok(())
    }
}

/// Figment could not extract a `Config`.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractConfigError {
    pub(crate) error: figment::Error,
}

impl ExtractConfigError {
    pub fn new(error: figment::Error) -> Self {
        Self { error }
    }

    /// One entry per distinct problem, in the order figment found them.
    pub fn settings(&self) -> Vec<SettingError> {
        let mut out: Vec<SettingError> = Vec::with_capacity(self.error.count());
        for err in self.error.clone() {
            let err = SettingError::from_figment(&err);
            if !out.contains(&err) {
                out.push(err);
            }
        }
        out
    }
}

impl fmt::Display for ExtractConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(FAILED_TO_EXTRACT_CONFIG_MSG)?;
        for setting in self.settings() {
            write!(f, "\n  {setting}")?;
        }
        Ok(())
    }
}

impl Error for ExtractConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Error::source(&self.error)
    }
}

/// Anything that prevents a usable `Config` from being loaded.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum LoadConfigError {
    #[error(transparent)]
    Extract(#[from] ExtractConfigError),
    #[error("{}\n  {}", FAILED_TO_EXTRACT_CONFIG_MSG, SettingError::from(.0))]
    Chain(#[from] ChainProfileError),
}

impl LoadConfigError {
    /// The offending settings.
    pub fn settings(&self) -> Vec<SettingError> {
        match self {
            Self::Extract(err) => err.settings(),
            Self::Chain(err) => vec![err.into()],
        }
    }
}

//! Picking a provider among the ones a browser injected.
//!
//! A page sees either one provider or, when several wallet extensions are installed, a list of
//! them. Each carries self-reported capability flags. Selection is a ranked list of rules
//! evaluated in order; the first rule that matches any provider wins.

use crate::{error::WalletError, provider::Eip1193Provider};
use arc_config::Config;
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, fmt, sync::Arc};

/// Capability flags an injected provider reports about itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletFlags {
    #[serde(rename = "isMetaMask")]
    pub is_metamask: bool,
    #[serde(rename = "isRabby")]
    pub is_rabby: bool,
    #[serde(rename = "isCoinbaseWallet")]
    pub is_coinbase_wallet: bool,
    #[serde(rename = "isBraveWallet")]
    pub is_brave_wallet: bool,
    #[serde(rename = "isTrust")]
    pub is_trust: bool,
}

impl WalletFlags {
    /// The display name derived from the flags.
    pub fn wallet_name(&self) -> &'static str {
        if self.is_metamask {
            "MetaMask"
        } else if self.is_rabby {
            "Rabby"
        } else if self.is_coinbase_wallet {
            "Coinbase Wallet"
        } else if self.is_brave_wallet {
            "Brave Wallet"
        } else if self.is_trust {
            "Trust Wallet"
        } else {
            "Ethereum Wallet"
        }
    }
}

/// A provider together with its flags.
#[derive(Clone)]
pub struct InjectedProvider {
    pub flags: WalletFlags,
    pub provider: Arc<dyn Eip1193Provider>,
}

impl fmt::Debug for InjectedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectedProvider")
            .field("name", &self.name())
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

impl InjectedProvider {
    pub fn new(provider: Arc<dyn Eip1193Provider>, flags: WalletFlags) -> Self {
        Self { flags, provider }
    }

    pub fn name(&self) -> &'static str {
        self.flags.wallet_name()
    }
}

/// What the page found under `window.ethereum`.
#[derive(Clone, Debug)]
pub enum InjectedEthereum {
    /// A single provider.
    Single(InjectedProvider),
    /// Several providers listed under `.providers`.
    Multi(Vec<InjectedProvider>),
}

impl InjectedEthereum {
    /// All providers, in injection order.
    pub fn providers(&self) -> &[InjectedProvider] {
        match self {
            Self::Single(provider) => std::slice::from_ref(provider),
            Self::Multi(providers) => providers,
        }
    }

    /// All providers for display, MetaMask first and the rest by name.
    pub fn detect(&self) -> Vec<&InjectedProvider> {
        let mut providers = self.providers().iter().collect::<Vec<_>>();
        providers.sort_by(|a, b| {
            b.flags.is_metamask.cmp(&a.flags.is_metamask).then_with(|| a.name().cmp(b.name()))
        });
        providers
    }
}

type Predicate = Box<dyn Fn(&InjectedProvider) -> bool + Send + Sync>;

/// A named predicate.
pub struct SelectionRule {
    name: Cow<'static, str>,
    predicate: Predicate,
}

impl fmt::Debug for SelectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SelectionRule").field(&self.name).finish()
    }
}

impl SelectionRule {
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        predicate: impl Fn(&InjectedProvider) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self { name: name.into(), predicate: Box::new(predicate) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches(&self, provider: &InjectedProvider) -> bool {
        (self.predicate)(provider)
    }
}

/// Ranked provider selection.
///
/// The default ranking is MetaMask, then Rabby, then whatever was injected first.
#[derive(Debug)]
pub struct ProviderSelector {
    rules: Vec<SelectionRule>,
}

impl Default for ProviderSelector {
    fn default() -> Self {
        Self::empty()
            .rule(SelectionRule::new("MetaMask", |p| p.flags.is_metamask))
            .rule(SelectionRule::new("Rabby", |p| p.flags.is_rabby))
            .rule(SelectionRule::new("first available", |_| true))
    }
}

impl ProviderSelector {
    /// The default ranking behind the config's `preferred_wallet`, if any.
    pub fn from_config(config: &Config) -> Self {
        Self::default().maybe_prefer(config.preferred_wallet.as_deref())
    }

    /// A selector without rules; it selects nothing until rules are added.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Appends a rule with the lowest priority so far.
    pub fn rule(mut self, rule: SelectionRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Puts a rule matching the wallet named `name` (case-insensitive) in front of all others.
    pub fn prefer(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let wanted = name.to_lowercase();
        self.rules.insert(
            0,
            SelectionRule::new(format!("preferred {name}"), move |p| {
                p.name().to_lowercase() == wanted
            }),
        );
        self
    }

    /// Like [`prefer`](Self::prefer) for an optional preference.
    pub fn maybe_prefer(self, name: Option<impl Into<String>>) -> Self {
        match name {
            Some(name) => self.prefer(name),
            None => self,
        }
    }

    pub fn rules(&self) -> &[SelectionRule] {
        &self.rules
    }

    /// Picks a provider, failing with [`WalletError::ProviderUnavailable`] if none qualifies.
    pub fn select<'a>(
        &self,
        injected: Option<&'a InjectedEthereum>,
    ) -> Result<&'a InjectedProvider, WalletError> {
        let providers = injected.map(InjectedEthereum::providers).unwrap_or_default();
        for rule in &self.rules {
            if let Some(provider) = providers.iter().find(|p| rule.matches(p)) {
                debug!(
                    target: "wallets::selection",
                    rule = rule.name(),
                    wallet = provider.name(),
                    "selected provider"
                );
                return Ok(provider);
            }
        }
        warn!(target: "wallets::selection", available = providers.len(), "no provider selected");
        Err(WalletError::ProviderUnavailable)
    }
}

//! Error reporting for `arcw`.
//!
//! Reports are a deduplicated chain of messages, followed by a hint when the failure is one the
//! user can act on in their wallet or config. With `ARC_DEBUG` set, color-eyre's full report
//! (span trace and backtrace) is printed instead.

use arc_config::LoadConfigError;
use arc_wallets::{WalletError, WalletErrorKind};
use eyre::EyreHandler;
use std::{error::Error, fmt};

struct ArcHandler {
    verbose: Option<Box<dyn EyreHandler>>,
}

impl EyreHandler for ArcHandler {
    fn display(&self, error: &(dyn Error + 'static), f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&dedup_chain(error).join(": "))
    }

    fn debug(&self, error: &(dyn Error + 'static), f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(verbose) = &self.verbose {
            return verbose.debug(error, f);
        }
        if f.alternate() {
            return fmt::Debug::fmt(error, f);
        }

        let mut messages = dedup_chain(error).into_iter();
        if let Some(first) = messages.next() {
            f.write_str(&first)?;
        }
        for cause in messages {
            write!(f, "\n  caused by: {cause}")?;
        }
        if let Some(hint) = hint(error) {
            write!(f, "\n\nhint: {hint}")?;
        }
        Ok(())
    }

    fn track_caller(&mut self, location: &'static std::panic::Location<'static>) {
        if let Some(verbose) = &mut self.verbose {
            verbose.track_caller(location);
        }
    }
}

/// The messages of `error` and its sources, skipping sources already quoted by the message
/// before them.
pub fn dedup_chain(error: &(dyn Error + 'static)) -> Vec<String> {
    let mut causes = eyre::Chain::new(error)
        .map(|cause| cause.to_string().trim().to_string())
        .collect::<Vec<_>>();
    causes.dedup_by(|b, a| a.contains(b.as_str()));
    causes
}

/// What the user can do about `error`, if anything.
pub fn hint(error: &(dyn Error + 'static)) -> Option<&'static str> {
    eyre::Chain::new(error).find_map(|cause| {
        if let Some(err) = cause.downcast_ref::<WalletError>() {
            return match err.kind() {
                WalletErrorKind::UserRejected => Some("approve the request in your wallet"),
                WalletErrorKind::ProviderUnavailable => {
                    Some("check that the bridge is running and a wallet is connected to it")
                }
                WalletErrorKind::VerificationMismatch | WalletErrorKind::ChainUnrecognized => {
                    Some("switch networks manually in your wallet, see `arcw profile`")
                }
                WalletErrorKind::Transport => None,
            };
        }
        cause
            .downcast_ref::<LoadConfigError>()
            .map(|_| "check arc.toml and the ARC_* environment variables")
    })
}

/// Installs the `eyre` and panic hooks.
pub fn install() {
    if std::env::var_os("RUST_BACKTRACE").is_none() {
        unsafe {
            std::env::set_var("RUST_BACKTRACE", "1");
        }
    }

    let panic_section = "This is a bug. Please report it together with the output above.";
    let (panic_hook, eyre_hook) =
        color_eyre::config::HookBuilder::default().panic_section(panic_section).into_hooks();
    panic_hook.install();
    let eyre_hook = eyre_hook.into_eyre_hook();
    let verbose = std::env::var_os("ARC_DEBUG").is_some();
    if let Err(err) = eyre::set_hook(Box::new(move |e| {
        Box::new(ArcHandler { verbose: verbose.then(|| eyre_hook(e)) })
    })) {
        debug!("failed to install eyre error hook: {err}");
    }
}

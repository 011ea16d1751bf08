use serde::Serialize;

/// Initializes a tracing subscriber for the CLI, filtered by `RUST_LOG`.
pub fn subscriber() {
    tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

/// Loads a `.env` file from the current directory or its parents, if there is one.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => trace!(?path, "loaded .env"),
        Err(err) if err.not_found() => {}
        Err(err) => warn!(%err, "failed to load .env"),
    }
}

/// Prints `value` as pretty JSON to stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

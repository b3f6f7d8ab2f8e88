//! Startup reporting.

use tracing::info;
use userapi_config::AppConfig;

/// Logs the resolved configuration. The password is never printed.
pub fn print_startup_info(config: &AppConfig) {
    let db = &config.database;
    let separator = "=".repeat(60);
    info!("{}", separator);
    info!("UserAPI {} ({})", config.app.version, config.app.environment);
    info!("Backend:   {}", db.kind);
    info!("Address:   {}:{}", db.host, db.port);
    info!("Database:  {}", db.name);
    info!("User:      {}", db.user);
    info!("Password:  {}", redact(&db.password));
    info!(
        "Pool:      {}..{} connections, connect timeout {:?}",
        db.min_connections,
        db.max_connections,
        db.connect_timeout()
    );
    info!("{}", separator);
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_never_returns_secret() {
        assert_eq!(redact("hunter2"), "<redacted>");
        assert_eq!(redact(""), "<empty>");
    }

    #[test]
    fn test_print_startup_info_does_not_panic() {
        let _ = tracing_subscriber::fmt::try_init();
        print_startup_info(&AppConfig::default());
    }
}

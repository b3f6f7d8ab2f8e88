//! Supported storage backends.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of database engines the data access layer can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// PostgreSQL (relational).
    Postgres,
    /// MySQL (relational).
    MySql,
    /// MongoDB (document store).
    Mongo,
}

impl BackendKind {
    /// All supported kinds, in declaration order.
    pub const ALL: [Self; 3] = [Self::Postgres, Self::MySql, Self::Mongo];

    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Mongo => "mongo",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a backend kind string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedBackend(pub String);

impl fmt::Display for UnsupportedBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unsupported database type '{}' (expected postgres, mysql or mongo)",
            self.0
        )
    }
}

impl std::error::Error for UnsupportedBackend {}

impl FromStr for BackendKind {
    type Err = UnsupportedBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" => Ok(Self::MySql),
            "mongo" | "mongodb" => Ok(Self::Mongo),
            _ => Err(UnsupportedBackend(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_names() {
        assert_eq!("postgres".parse::<BackendKind>(), Ok(BackendKind::Postgres));
        assert_eq!("mysql".parse::<BackendKind>(), Ok(BackendKind::MySql));
        assert_eq!("mongo".parse::<BackendKind>(), Ok(BackendKind::Mongo));
    }

    #[test]
    fn test_parse_aliases_and_case() {
        assert_eq!("PostgreSQL".parse::<BackendKind>(), Ok(BackendKind::Postgres));
        assert_eq!(" MongoDB ".parse::<BackendKind>(), Ok(BackendKind::Mongo));
        assert_eq!("MYSQL".parse::<BackendKind>(), Ok(BackendKind::MySql));
    }

    #[test]
    fn test_parse_unsupported_names_offender() {
        let err = "sqlite".parse::<BackendKind>().unwrap_err();
        assert_eq!(err, UnsupportedBackend("sqlite".to_string()));
        assert!(err.to_string().contains("'sqlite'"));
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for kind in BackendKind::ALL {
            assert_eq!(kind.to_string().parse::<BackendKind>(), Ok(kind));
        }
    }
}

/// Where the profile store lives.
///
/// The URL is kept as given. Helpers split it into server, database name
/// and query string so callers can point at a sibling database on the same
/// server without losing options such as `sslmode`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub database_url: String,
}

/// A connection URL split at the database path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct UrlParts<'a> {
    /// Scheme, credentials, host and port.
    server: &'a str,
    database: Option<&'a str>,
    query: Option<&'a str>,
}

impl DbConfig {
    pub const DEFAULT_URL: &str = "postgresql://localhost:5432/fitplan";

    /// Env var the CLI reads the URL from.
    pub const URL_ENV: &str = "FITPLAN_DATABASE_URL";

    /// Database every PostgreSQL server has; used to create and drop others.
    pub const MAINTENANCE_DATABASE: &str = "postgres";

    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    fn parts(&self) -> UrlParts<'_> {
        let (base, query) = match self.database_url.split_once('?') {
            Some((base, query)) => (base, Some(query)),
            None => (self.database_url.as_str(), None),
        };
        let authority = base.find("://").map_or(0, |i| i + 3);
        match base[authority..].find('/') {
            Some(slash) => {
                let cut = authority + slash;
                UrlParts {
                    server: &base[..cut],
                    database: Some(&base[cut + 1..]).filter(|s| !s.is_empty()),
                    query,
                }
            }
            None => UrlParts {
                server: base,
                database: None,
                query,
            },
        }
    }

    /// The database named in the URL, if any.
    pub fn database_name(&self) -> Option<&str> {
        self.parts().database
    }

    /// The same server and options, pointed at database `name`.
    pub fn with_database(&self, name: &str) -> Self {
        let parts = self.parts();
        let mut url = format!("{}/{name}", parts.server);
        if let Some(query) = parts.query {
            url.push('?');
            url.push_str(query);
        }
        Self::new(url)
    }

    /// URL of the maintenance database on the same server.
    pub fn maintenance_url(&self) -> String {
        self.with_database(Self::MAINTENANCE_DATABASE).database_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_url_names_fitplan() {
        let cfg = DbConfig::new(DbConfig::DEFAULT_URL);
        assert_eq!(cfg.database_name(), Some("fitplan"));
        assert_eq!(cfg.maintenance_url(), "postgresql://localhost:5432/postgres");
    }

    #[test]
    fn query_string_is_not_part_of_the_name_and_survives_rewrites() {
        let cfg = DbConfig::new("postgresql://db.internal:5432/coach?sslmode=require");
        assert_eq!(cfg.database_name(), Some("coach"));
        assert_eq!(
            cfg.with_database("coach_test").database_url,
            "postgresql://db.internal:5432/coach_test?sslmode=require"
        );
    }

    #[test]
    fn server_root_has_no_database() {
        for url in ["postgresql://u:p@localhost:5432", "postgresql://u:p@localhost:5432/"] {
            let cfg = DbConfig::new(url);
            assert_eq!(cfg.database_name(), None, "{url}");
            assert_eq!(cfg.maintenance_url(), "postgresql://u:p@localhost:5432/postgres");
        }
    }

    #[test]
    fn with_database_replaces_existing_name() {
        let cfg = DbConfig::new("postgres://h/fitplan").with_database("other");
        assert_eq!(cfg, DbConfig::new("postgres://h/other"));
    }
}

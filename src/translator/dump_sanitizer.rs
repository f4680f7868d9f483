use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

// Pre-compiled rewrite patterns. Every pattern that removes a statement also
// consumes its line terminator so no blank lines pile up in the output.
static SQLITE_INTERNALS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(?:PRAGMA.*;|BEGIN.*;|.*sqlite_sequence.*;)\r?$\n?").unwrap()
});

static CREATE_STATEMENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?ms)^CREATE\b.*?;\r?$\n?").unwrap()
});

static MIGRATION_LOG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?ms)^INSERT INTO "?migration_log"? .*?;\r?$\n?"#).unwrap()
});

static INSERT_TARGET_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^INSERT INTO "?([A-Za-z0-9_]+)"? VALUES"#).unwrap()
});

static CHAR_FUNCTION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r",char\((\d+)\)\)").unwrap()
});

/// A named `text -> text` rewrite applied to the whole dump
#[derive(Clone, Copy)]
pub struct SanitizeRule {
    pub name: &'static str,
    pub apply: fn(&str) -> String,
}

/// Rewrites a raw `sqlite3 .dump` into statements Postgres accepts.
///
/// Rules run in the order of [`DumpSanitizer::RULES`]. Each rule after the
/// first assumes identifiers already use double quotes.
pub struct DumpSanitizer;

impl DumpSanitizer {
    pub const RULES: [SanitizeRule; 6] = [
        SanitizeRule { name: "normalize_backticks", apply: Self::normalize_backticks },
        SanitizeRule { name: "strip_sqlite_internals", apply: Self::strip_sqlite_internals },
        SanitizeRule { name: "strip_create_statements", apply: Self::strip_create_statements },
        SanitizeRule { name: "strip_migration_log", apply: Self::strip_migration_log },
        SanitizeRule { name: "quote_insert_targets", apply: Self::quote_insert_targets },
        SanitizeRule { name: "translate_char_function", apply: Self::translate_char_function },
    ];

    /// Run every rule over the dump
    pub fn sanitize(dump: &str) -> String {
        let mut result = dump.to_string();
        for rule in Self::RULES.iter() {
            let before = result.len();
            result = (rule.apply)(&result);
            debug!("Sanitize rule {}: {} -> {} bytes", rule.name, before, result.len());
        }
        result
    }

    /// SQLite accepts `` `ident` ``, Postgres only `"ident"`
    pub fn normalize_backticks(dump: &str) -> String {
        dump.replace('`', "\"")
    }

    /// Drop `PRAGMA`, `BEGIN` and anything touching `sqlite_sequence`
    pub fn strip_sqlite_internals(dump: &str) -> String {
        SQLITE_INTERNALS_REGEX.replace_all(dump, "").into_owned()
    }

    /// Drop every `CREATE ...;`, including bodies spanning several lines.
    /// The destination schema is provisioned by the application itself.
    pub fn strip_create_statements(dump: &str) -> String {
        CREATE_STATEMENT_REGEX.replace_all(dump, "").into_owned()
    }

    /// The destination keeps its own migration history
    pub fn strip_migration_log(dump: &str) -> String {
        MIGRATION_LOG_REGEX.replace_all(dump, "").into_owned()
    }

    /// `INSERT INTO user VALUES` -> `INSERT INTO "user" VALUES`, so reserved
    /// words parse as table names
    pub fn quote_insert_targets(dump: &str) -> String {
        INSERT_TARGET_REGEX.replace_all(dump, r#"INSERT INTO "$1" VALUES"#).into_owned()
    }

    /// Multi-line strings are dumped as `replace('..','\n',char(10))`;
    /// the Postgres spelling is `chr`
    pub fn translate_char_function(dump: &str) -> String {
        CHAR_FUNCTION_REGEX.replace_all(dump, ",chr($1))").into_owned()
    }
}

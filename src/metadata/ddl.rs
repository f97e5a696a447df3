//! Materialised-column extraction from `CREATE TABLE` statements.
//!
//! The store declares a shadow column for a hot key as, e.g.:
//!
//! ```text
//! `resource_string_k8s$$cluster$$name` String DEFAULT resources_string['k8s.cluster.name'] CODEC(ZSTD(1)),
//! ```
//!
//! The column name encodes `(context, data type)` in its first two `_`-parts
//! and writes `.` in the field name as `$$`; the DEFAULT subscript carries
//! the original field name. Columns whose DEFAULT is anything other than a
//! plain `map['literal']` subscript (the `_exists` flags use
//! `if(mapContains(...))`) are not materialisations and are skipped.

use crate::fields::{FieldContext, FieldDataType, TelemetryFieldKey};

/// Scan a `CREATE TABLE` statement and return a materialised
/// [`TelemetryFieldKey`] for every shadow column it declares.
///
/// The scan is deliberately tolerant: anything that does not look like a
/// shadow column is skipped rather than reported.
pub fn extract_field_keys(statement: &str) -> Vec<TelemetryFieldKey> {
    let Some(column_list) = column_list(statement) else {
        return Vec::new();
    };

    split_top_level(column_list)
        .into_iter()
        .filter_map(|entry| field_key_from_column(entry.trim()))
        .collect()
}

/// The text between the outermost parentheses that hold the column
/// definitions.
fn column_list(statement: &str) -> Option<&str> {
    let start = statement.find('(')?;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in statement[start..].char_indices() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '`' => quote = Some(c),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(&statement[start + 1..start + i]);
                    }
                }
                _ => {}
            },
        }
    }
    None
}

/// Split the column list on commas that sit outside parentheses, quotes,
/// and backticked identifiers.
fn split_top_level(list: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut entry_start = 0usize;
    for (i, c) in list.char_indices() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '`' => quote = Some(c),
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                ',' if depth == 0 => {
                    entries.push(&list[entry_start..i]);
                    entry_start = i + 1;
                }
                _ => {}
            },
        }
    }
    entries.push(&list[entry_start..]);
    entries
}

fn field_key_from_column(entry: &str) -> Option<TelemetryFieldKey> {
    if entry.is_empty() {
        return None;
    }

    let (name, rest) = column_name(entry)?;

    // Table-level entries living alongside column definitions.
    let upper = name.to_ascii_uppercase();
    if matches!(upper.as_str(), "INDEX" | "PROJECTION" | "CONSTRAINT" | "PRIMARY") {
        return None;
    }

    let mut parts = name.splitn(3, '_');
    let field_context = match parts.next()? {
        "resource" => FieldContext::Resource,
        "scope" => FieldContext::Scope,
        "attribute" => FieldContext::Attribute,
        _ => return None,
    };
    let field_data_type = match parts.next()? {
        "string" => FieldDataType::String,
        "bool" => FieldDataType::Bool,
        "int" | "int64" | "float" | "float64" | "number" => FieldDataType::Number,
        _ => return None,
    };
    parts.next()?;

    let field_name = default_subscript_literal(rest)?;

    Some(TelemetryFieldKey {
        name: field_name.to_owned(),
        field_context,
        field_data_type,
        materialized: true,
        ..Default::default()
    })
}

/// Split a column entry into its (possibly backticked) name and the
/// remainder of the definition.
fn column_name(entry: &str) -> Option<(&str, &str)> {
    if let Some(stripped) = entry.strip_prefix('`') {
        let end = stripped.find('`')?;
        Some((&stripped[..end], &stripped[end + 1..]))
    } else {
        let end = entry.find(char::is_whitespace)?;
        Some((&entry[..end], &entry[end..]))
    }
}

/// The string literal of a `DEFAULT map['literal']` clause, if the DEFAULT
/// expression is exactly a map subscript.
fn default_subscript_literal(definition: &str) -> Option<&str> {
    let default_at = find_keyword(definition, "DEFAULT")?;
    let expr = definition[default_at..].trim_start();

    // Expect: identifier immediately followed by ['…'].
    let ident_len = expr
        .char_indices()
        .take_while(|&(_, c)| c.is_ascii_alphanumeric() || c == '_')
        .map(|(i, c)| i + c.len_utf8())
        .last()?;
    let after_ident = &expr[ident_len..];
    let subscript = after_ident.strip_prefix("['")?;
    let literal_end = subscript.find("']")?;
    let tail = subscript[literal_end + 2..].trim_start();

    // The clause must end here, give or take a CODEC/TTL/COMMENT suffix.
    if !tail.is_empty() {
        let tail_upper = tail.to_ascii_uppercase();
        if !(tail_upper.starts_with("CODEC")
            || tail_upper.starts_with("TTL")
            || tail_upper.starts_with("COMMENT"))
        {
            return None;
        }
    }

    Some(&subscript[..literal_end])
}

/// Find the content offset just past a whitespace-delimited keyword,
/// case-insensitively, skipping quoted regions.
fn find_keyword(text: &str, keyword: &str) -> Option<usize> {
    let upper = text.to_ascii_uppercase();
    let keyword_upper = keyword.to_ascii_uppercase();
    let mut search_from = 0usize;
    while let Some(rel) = upper[search_from..].find(&keyword_upper) {
        let at = search_from + rel;
        let before_ok = text[..at].chars().last().map_or(true, char::is_whitespace);
        let after = at + keyword.len();
        let after_ok = text[after..].chars().next().is_some_and(char::is_whitespace);
        if before_ok && after_ok && !in_quotes(text, at) {
            return Some(after);
        }
        search_from = at + keyword.len();
    }
    None
}

fn in_quotes(text: &str, offset: usize) -> bool {
    let mut quote: Option<char> = None;
    for (i, c) in text.char_indices() {
        if i >= offset {
            break;
        }
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => {
                if c == '\'' || c == '`' {
                    quote = Some(c);
                }
            }
        }
    }
    quote.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGS_DDL: &str = r#"CREATE TABLE telemetry_logs.logs_index
(
    `ts_bucket_start` UInt64 CODEC(DoubleDelta, LZ4),
    `resource_fingerprint` String CODEC(ZSTD(1)),
    `timestamp` UInt64 CODEC(DoubleDelta, LZ4),
    `severity_text` LowCardinality(String) CODEC(ZSTD(1)),
    `severity_number` UInt8,
    `body` String CODEC(ZSTD(2)),
    `attributes_string` Map(LowCardinality(String), String) CODEC(ZSTD(1)),
    `attributes_number` Map(LowCardinality(String), Float64) CODEC(ZSTD(1)),
    `attributes_bool` Map(LowCardinality(String), Bool) CODEC(ZSTD(1)),
    `resources_string` Map(LowCardinality(String), String) CODEC(ZSTD(1)),
    `attribute_number_input_size` Int64 DEFAULT attributes_number['input_size'] CODEC(ZSTD(1)),
    `attribute_number_input_size_exists` Bool DEFAULT if(mapContains(attributes_number, 'input_size') != 0, true, false) CODEC(ZSTD(1)),
    `attribute_string_log$$iostream` String DEFAULT attributes_string['log.iostream'] CODEC(ZSTD(1)),
    `attribute_string_log$$iostream_exists` Bool DEFAULT if(mapContains(attributes_string, 'log.iostream') != 0, true, false) CODEC(ZSTD(1)),
    `attribute_string_email` String DEFAULT attributes_string['email'] CODEC(ZSTD(1)),
    `resource_string_k8s$$cluster$$name` String DEFAULT resources_string['k8s.cluster.name'] CODEC(ZSTD(1)),
    `resource_string_k8s$$namespace$$name` String DEFAULT resources_string['k8s.namespace.name'] CODEC(ZSTD(1)),
    INDEX body_idx lower(body) TYPE ngrambf_v1(4, 60000, 5, 0) GRANULARITY 1,
    INDEX `attribute_string_log$$iostream_idx` `attribute_string_log$$iostream` TYPE bloom_filter(0.01) GRANULARITY 64
)
ENGINE = ReplicatedMergeTree('/clickhouse/tables/{uuid}/{shard}', '{replica}')
PARTITION BY toDate(timestamp / 1000000000)
ORDER BY (ts_bucket_start, resource_fingerprint, severity_text, timestamp, id)
TTL toDateTime(timestamp / 1000000000) + toIntervalSecond(2592000)
SETTINGS ttl_only_drop_parts = 1, index_granularity = 8192"#;

    #[test]
    fn extracts_materialised_columns() {
        let keys = extract_field_keys(LOGS_DDL);
        let names: Vec<&str> = keys.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "input_size",
                "log.iostream",
                "email",
                "k8s.cluster.name",
                "k8s.namespace.name",
            ]
        );
        assert!(keys.iter().all(|k| k.materialized));
    }

    #[test]
    fn dollar_escape_maps_back_to_dots() {
        let keys = extract_field_keys(LOGS_DDL);
        let iostream = keys.iter().find(|k| k.name == "log.iostream").unwrap();
        assert_eq!(iostream.field_context, FieldContext::Attribute);
        assert_eq!(iostream.field_data_type, FieldDataType::String);
        assert_eq!(
            iostream.materialised_column_name(),
            "attribute_string_log$$iostream"
        );
    }

    #[test]
    fn numeric_columns_normalise_to_number() {
        let keys = extract_field_keys(LOGS_DDL);
        let input_size = keys.iter().find(|k| k.name == "input_size").unwrap();
        assert_eq!(input_size.field_data_type, FieldDataType::Number);
        assert_eq!(
            input_size.materialised_column_name(),
            "attribute_number_input_size"
        );
    }

    #[test]
    fn exists_flags_are_not_materialisations() {
        let keys = extract_field_keys(LOGS_DDL);
        assert!(keys.iter().all(|k| !k.name.ends_with("_exists")));
        // The `if(mapContains(...))` DEFAULT must not be mistaken for a
        // subscript even though it carries a quoted key.
        assert_eq!(keys.iter().filter(|k| k.name == "input_size").count(), 1);
    }

    #[test]
    fn resource_context_is_recognised() {
        let keys = extract_field_keys(LOGS_DDL);
        let cluster = keys.iter().find(|k| k.name == "k8s.cluster.name").unwrap();
        assert_eq!(cluster.field_context, FieldContext::Resource);
    }

    #[test]
    fn unknown_context_prefix_is_skipped() {
        let ddl = "CREATE TABLE t (`custom_string_foo` String DEFAULT attributes_string['foo'])";
        assert!(extract_field_keys(ddl).is_empty());
    }

    #[test]
    fn unknown_data_type_prefix_is_skipped() {
        let ddl = "CREATE TABLE t (`attribute_uuid_foo` String DEFAULT attributes_string['foo'])";
        assert!(extract_field_keys(ddl).is_empty());
    }

    #[test]
    fn column_without_default_is_skipped() {
        let ddl = "CREATE TABLE t (`attribute_string_foo` String CODEC(ZSTD(1)))";
        assert!(extract_field_keys(ddl).is_empty());
    }

    #[test]
    fn statement_without_columns_yields_nothing() {
        assert!(extract_field_keys("SELECT 1").is_empty());
        assert!(extract_field_keys("").is_empty());
    }

    #[test]
    fn commas_inside_types_do_not_split_entries() {
        let ddl = "CREATE TABLE t (\
            `attributes_string` Map(LowCardinality(String), String), \
            `attribute_string_env` String DEFAULT attributes_string['env'])";
        let keys = extract_field_keys(ddl);
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].name, "env");
    }
}

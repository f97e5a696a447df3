//! The metadata store: field-key and field-value enumeration.
//!
//! Keys are enumerated from the per-signal dictionary tables, ranked by a
//! priority derived from their `tag_type`, and enriched with
//! materialisation info extracted from the data table's `CREATE TABLE`
//! statement. Metric keys come from the JSON labels column of the
//! time-series roll-up instead.

pub mod ddl;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::conditions::metadata::MetadataConditionBuilder;
use crate::conditions::ConditionBuilder;
use crate::config::MetadataConfig;
use crate::error::QueryError;
use crate::fields::{
    FieldContext, FieldDataType, FieldKeySelector, FieldValueSelector, SelectorMatchType, Signal,
    TelemetryFieldKey, TelemetryFieldValues,
};
use crate::sql::{and_conditions, or_conditions, SqlBuilder};
use crate::store::TelemetryStore;
use crate::value::FilterValue;

/// Read-only field metadata, as the compiler and the completion surfaces
/// consume it.
#[async_trait]
pub trait FieldMetadata: Send + Sync {
    /// Enumerate keys for one selector, keyed by name. A name maps to
    /// several keys when it exists with different contexts or data types.
    async fn get_keys(
        &self,
        selector: &FieldKeySelector,
    ) -> Result<HashMap<String, Vec<TelemetryFieldKey>>, QueryError>;

    /// Enumerate keys for many selectors in one round-trip per signal.
    async fn get_keys_multi(
        &self,
        selectors: &[FieldKeySelector],
    ) -> Result<HashMap<String, Vec<TelemetryFieldKey>>, QueryError>;

    /// The keys matching one selector's name.
    async fn get_key(
        &self,
        selector: &FieldKeySelector,
    ) -> Result<Vec<TelemetryFieldKey>, QueryError>;

    /// Distinct values of a key from the related-metadata table, for value
    /// completion.
    async fn get_related_values(
        &self,
        selector: &FieldValueSelector,
    ) -> Result<Vec<String>, QueryError>;

    /// All distinct values of a key from the signal's dictionary table.
    async fn get_all_values(
        &self,
        selector: &FieldValueSelector,
    ) -> Result<TelemetryFieldValues, QueryError>;
}

/// Metadata store backed by the telemetry store's dictionary tables.
///
/// Immutable after construction; shareable across tasks.
pub struct TelemetryMetaStore {
    store: Arc<dyn TelemetryStore>,
    config: MetadataConfig,
    related_conditions: MetadataConditionBuilder,
}

impl TelemetryMetaStore {
    pub fn new(store: Arc<dyn TelemetryStore>, config: MetadataConfig) -> Self {
        Self {
            store,
            config,
            related_conditions: MetadataConditionBuilder,
        }
    }

    /// Materialised keys declared by a signal's data table, keyed by
    /// composite identity for enrichment.
    async fn materialised_keys(
        &self,
        signal: Signal,
    ) -> Result<HashMap<String, TelemetryFieldKey>, QueryError> {
        let tables = match signal {
            Signal::Traces => &self.config.traces,
            Signal::Logs => &self.config.logs,
            _ => return Ok(HashMap::new()),
        };
        let statement = self
            .store
            .show_create_table(&tables.database, &tables.table)
            .await?;
        Ok(ddl::extract_field_keys(&statement)
            .into_iter()
            .map(|key| (key.composite_identity(), key))
            .collect())
    }

    /// Enumerate dictionary keys for the traces or logs signal.
    async fn dictionary_keys(
        &self,
        signal: Signal,
        selectors: &[FieldKeySelector],
    ) -> Result<Vec<TelemetryFieldKey>, QueryError> {
        if selectors.is_empty() {
            return Ok(Vec::new());
        }

        let materialised = self.materialised_keys(signal).await?;

        let (tables, signal_field_tag) = match signal {
            Signal::Traces => (&self.config.traces, "spanfield"),
            Signal::Logs => (&self.config.logs, "logfield"),
            _ => return Ok(Vec::new()),
        };

        let mut sql = SqlBuilder::new();
        let mut selector_conds = Vec::with_capacity(selectors.len());
        let mut limit = 0usize;
        for selector in selectors {
            let mut conds = Vec::new();
            if selector.start_unix_milli != 0 {
                conds.push(sql.ge(
                    "unix_milli",
                    FilterValue::Number(selector.start_unix_milli as f64),
                ));
            }
            if selector.end_unix_milli != 0 {
                conds.push(sql.le(
                    "unix_milli",
                    FilterValue::Number(selector.end_unix_milli as f64),
                ));
            }
            match selector.match_type {
                SelectorMatchType::Exact => {
                    conds.push(sql.eq("tag_key", FilterValue::String(selector.name.clone())));
                }
                SelectorMatchType::Fuzzy => {
                    conds.push(sql.like(
                        "tag_key",
                        FilterValue::String(format!("%{}%", selector.name)),
                    ));
                }
            }
            if selector.field_context != FieldContext::Unspecified {
                conds.push(sql.eq(
                    "tag_type",
                    FilterValue::String(selector.field_context.tag_type().to_owned()),
                ));
            }
            if selector.field_data_type != FieldDataType::Unspecified {
                conds.push(sql.eq(
                    "tag_data_type",
                    FilterValue::String(selector.field_data_type.tag_data_type().to_owned()),
                ));
            }
            selector_conds.push(and_conditions(conds));
            limit += selector.limit;
        }
        if limit == 0 {
            limit = self.config.limits.default_key_limit;
        }

        let query = format!(
            "SELECT tag_key, tag_type, tag_data_type, max(priority) AS priority FROM (\
             SELECT tag_key, tag_type, tag_data_type, \
             CASE \
             WHEN tag_type = '{signal_field_tag}' THEN 1 \
             WHEN tag_type = 'resource' THEN 2 \
             WHEN tag_type = 'scope' THEN 3 \
             WHEN tag_type = 'tag' THEN 4 \
             ELSE 5 \
             END AS priority \
             FROM {database}.{table} \
             WHERE {predicate}\
             ) AS sub_query \
             GROUP BY tag_key, tag_type, tag_data_type \
             ORDER BY priority \
             LIMIT {limit}",
            database = tables.database,
            table = tables.dictionary_table,
            predicate = or_conditions(&selector_conds),
        );

        tracing::debug!(signal = %signal, sql = %query, "enumerating field keys");
        let rows = self.store.query(&query, sql.args()).await?;

        let mut keys = Vec::with_capacity(rows.len());
        for row in rows {
            let name = row.expect_str(0)?.to_owned();
            let field_context = FieldContext::parse(row.expect_str(1)?);
            let field_data_type = FieldDataType::parse(row.expect_str(2)?);
            let mut key = TelemetryFieldKey {
                name,
                signal,
                field_context,
                field_data_type,
                ..Default::default()
            };
            if let Some(materialised) = materialised.get(&key.composite_identity()) {
                key.materialized = materialised.materialized;
            }
            keys.push(key);
        }
        Ok(keys)
    }

    /// Enumerate metric label keys from the time-series roll-up. Internal
    /// `__`-prefixed labels are excluded.
    async fn metrics_keys(
        &self,
        selectors: &[FieldKeySelector],
    ) -> Result<Vec<TelemetryFieldKey>, QueryError> {
        if selectors.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = SqlBuilder::new();

        let mut inner_conds = Vec::new();
        for selector in selectors {
            if let Some(metric_context) = &selector.metric_context {
                if !metric_context.metric_names.is_empty() {
                    inner_conds.push(sql.in_list(
                        "metric_name",
                        metric_context
                            .metric_names
                            .iter()
                            .map(|n| FilterValue::String(n.clone()))
                            .collect(),
                    ));
                }
            }
        }
        inner_conds.push("__normalized = true".to_owned());
        let inner_predicate = and_conditions(inner_conds);

        let mut outer_conds = Vec::with_capacity(selectors.len());
        let mut limit = 0usize;
        for selector in selectors {
            let name_cond = match selector.match_type {
                SelectorMatchType::Exact => {
                    sql.eq("distinctTagKey", FilterValue::String(selector.name.clone()))
                }
                SelectorMatchType::Fuzzy => format!(
                    "distinctTagKey ILIKE {}",
                    sql.var(FilterValue::String(format!("%{}%", selector.name)))
                ),
            };
            outer_conds.push(and_conditions([
                name_cond.as_str(),
                "distinctTagKey NOT LIKE '\\_\\_%'",
            ]));
            limit += selector.limit;
        }
        if limit == 0 {
            limit = self.config.limits.default_key_limit;
        }

        let query = format!(
            "SELECT arrayJoin(tagKeys) AS distinctTagKey FROM (\
             SELECT JSONExtractKeys(labels) AS tagKeys \
             FROM {database}.{table} \
             WHERE {inner_predicate} \
             GROUP BY tagKeys\
             ) WHERE {outer_predicate} \
             GROUP BY distinctTagKey \
             LIMIT {limit}",
            database = self.config.metrics.database,
            table = self.config.metrics.timeseries_table,
            outer_predicate = or_conditions(&outer_conds),
        );

        tracing::debug!(sql = %query, "enumerating metric label keys");
        let rows = self.store.query(&query, sql.args()).await?;

        let mut keys = Vec::with_capacity(rows.len());
        for row in rows {
            keys.push(TelemetryFieldKey {
                name: row.expect_str(0)?.to_owned(),
                signal: Signal::Metrics,
                field_context: FieldContext::Attribute,
                field_data_type: FieldDataType::String,
                ..Default::default()
            });
        }
        Ok(keys)
    }

    async fn keys_for_signal(
        &self,
        signal: Signal,
        selectors: &[FieldKeySelector],
    ) -> Result<Vec<TelemetryFieldKey>, QueryError> {
        match signal {
            Signal::Traces | Signal::Logs => self.dictionary_keys(signal, selectors).await,
            Signal::Metrics => self.metrics_keys(selectors).await,
            Signal::Unspecified => Ok(Vec::new()),
        }
    }

    /// Distinct `(string_value, number_value)` pairs for a key from a
    /// signal's dictionary table.
    async fn dictionary_values(
        &self,
        signal: Signal,
        selector: &FieldValueSelector,
    ) -> Result<TelemetryFieldValues, QueryError> {
        let tables = match signal {
            Signal::Traces => &self.config.traces,
            Signal::Logs => &self.config.logs,
            _ => return Ok(TelemetryFieldValues::default()),
        };

        let mut sql = SqlBuilder::new();
        let mut conds = Vec::new();
        if !selector.name.is_empty() {
            conds.push(sql.eq("tag_key", FilterValue::String(selector.name.clone())));
        }
        if selector.field_context != FieldContext::Unspecified {
            conds.push(sql.eq(
                "tag_type",
                FilterValue::String(selector.field_context.tag_type().to_owned()),
            ));
        }
        if selector.field_data_type != FieldDataType::Unspecified {
            conds.push(sql.eq(
                "tag_data_type",
                FilterValue::String(selector.field_data_type.tag_data_type().to_owned()),
            ));
        }
        if !selector.value.is_empty() {
            let pattern = FilterValue::String(format!("%{}%", selector.value));
            if selector.field_data_type.is_numeric() {
                conds.push("number_value IS NOT NULL".to_owned());
                conds.push(sql.like("toString(number_value)", pattern));
            } else {
                conds.push(sql.like("string_value", pattern));
            }
        }

        let limit = if selector.limit == 0 {
            self.config.limits.default_value_limit
        } else {
            selector.limit
        };

        let predicate = if conds.is_empty() {
            "1 = 1".to_owned()
        } else {
            and_conditions(conds)
        };
        let query = format!(
            "SELECT DISTINCT string_value, number_value FROM {database}.{table} \
             WHERE {predicate} LIMIT {limit}",
            database = tables.database,
            table = tables.dictionary_table,
        );

        tracing::debug!(signal = %signal, sql = %query, "enumerating field values");
        let rows = self.store.query(&query, sql.args()).await?;

        let mut values = TelemetryFieldValues::default();
        let mut seen_strings = std::collections::HashSet::new();
        let mut seen_numbers = Vec::new();
        for row in rows {
            if let Some(s) = row.get(0).and_then(|v| v.as_str()) {
                if !s.is_empty() && seen_strings.insert(s.to_owned()) {
                    values.string_values.push(s.to_owned());
                }
            }
            if let Some(n) = row.get(1).and_then(|v| v.as_f64()) {
                if n != 0.0 && !seen_numbers.contains(&n) {
                    seen_numbers.push(n);
                    values.number_values.push(n);
                }
            }
        }
        Ok(values)
    }
}

#[async_trait]
impl FieldMetadata for TelemetryMetaStore {
    #[tracing::instrument(skip_all, fields(name = %selector.name, signal = %selector.signal))]
    async fn get_keys(
        &self,
        selector: &FieldKeySelector,
    ) -> Result<HashMap<String, Vec<TelemetryFieldKey>>, QueryError> {
        self.get_keys_multi(std::slice::from_ref(selector)).await
    }

    #[tracing::instrument(skip_all, fields(selectors = selectors.len()))]
    async fn get_keys_multi(
        &self,
        selectors: &[FieldKeySelector],
    ) -> Result<HashMap<String, Vec<TelemetryFieldKey>>, QueryError> {
        let mut traces_selectors = Vec::new();
        let mut logs_selectors = Vec::new();
        let mut metrics_selectors = Vec::new();
        for selector in selectors {
            match selector.signal {
                Signal::Traces => traces_selectors.push(selector.clone()),
                Signal::Logs => logs_selectors.push(selector.clone()),
                Signal::Metrics => metrics_selectors.push(selector.clone()),
                Signal::Unspecified => {
                    traces_selectors.push(selector.clone());
                    logs_selectors.push(selector.clone());
                    metrics_selectors.push(selector.clone());
                }
            }
        }

        // The three enumerations are independent; fan out and join. The
        // union keeps traces, logs, metrics order so emitted SQL stays
        // deterministic.
        let (traces_keys, logs_keys, metrics_keys) = tokio::try_join!(
            self.keys_for_signal(Signal::Traces, &traces_selectors),
            self.keys_for_signal(Signal::Logs, &logs_selectors),
            self.keys_for_signal(Signal::Metrics, &metrics_selectors),
        )?;

        let mut map: HashMap<String, Vec<TelemetryFieldKey>> = HashMap::new();
        for key in traces_keys
            .into_iter()
            .chain(logs_keys)
            .chain(metrics_keys)
        {
            map.entry(key.name.clone()).or_default().push(key);
        }
        Ok(map)
    }

    async fn get_key(
        &self,
        selector: &FieldKeySelector,
    ) -> Result<Vec<TelemetryFieldKey>, QueryError> {
        let mut keys = self.get_keys(selector).await?;
        Ok(keys.remove(&selector.name).unwrap_or_default())
    }

    #[tracing::instrument(skip_all, fields(name = %selector.name))]
    async fn get_related_values(
        &self,
        selector: &FieldValueSelector,
    ) -> Result<Vec<String>, QueryError> {
        let key = TelemetryFieldKey {
            name: selector.name.clone(),
            signal: selector.signal,
            field_context: selector.field_context,
            field_data_type: selector.field_data_type,
            ..Default::default()
        };
        let select_column = self.related_conditions.field_reference(&key)?;

        let mut sql = SqlBuilder::new();
        let mut conds = Vec::new();
        conds.push(sql.ge(
            "unix_milli",
            FilterValue::Number(selector.start_unix_milli as f64),
        ));
        conds.push(sql.le(
            "unix_milli",
            FilterValue::Number(selector.end_unix_milli as f64),
        ));

        let limit = if selector.limit == 0 {
            self.config.limits.default_value_limit
        } else {
            selector.limit
        };

        let query = format!(
            "SELECT DISTINCT {select_column} FROM {database}.{table} \
             WHERE {predicate} LIMIT {limit}",
            database = self.config.related.database,
            table = self.config.related.table,
            predicate = and_conditions(&conds),
        );

        tracing::debug!(sql = %query, "enumerating related values");
        let rows = self.store.query(&query, sql.args()).await?;

        let mut values = Vec::new();
        for row in rows {
            let value = row.expect_str(0)?;
            if !value.is_empty() {
                values.push(value.to_owned());
            }
        }
        Ok(values)
    }

    async fn get_all_values(
        &self,
        selector: &FieldValueSelector,
    ) -> Result<TelemetryFieldValues, QueryError> {
        match selector.signal {
            Signal::Traces | Signal::Logs => {
                self.dictionary_values(selector.signal, selector).await
            }
            // Metric label values have no dictionary representation yet.
            _ => Ok(TelemetryFieldValues::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::MetricContext;
    use crate::store::{Row, StoreValue};
    use std::sync::Mutex;

    /// In-memory store fake recording every query it serves.
    #[derive(Default)]
    struct FakeStore {
        /// `(sql substring, rows)` pairs; the first matching entry answers.
        responses: Vec<(String, Vec<Row>)>,
        create_tables: HashMap<String, String>,
        queries: Mutex<Vec<(String, Vec<FilterValue>)>>,
    }

    impl FakeStore {
        fn respond(mut self, needle: &str, rows: Vec<Row>) -> Self {
            self.responses.push((needle.to_owned(), rows));
            self
        }

        fn with_create_table(mut self, table: &str, ddl: &str) -> Self {
            self.create_tables.insert(table.to_owned(), ddl.to_owned());
            self
        }

        fn seen_queries(&self) -> Vec<(String, Vec<FilterValue>)> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TelemetryStore for FakeStore {
        async fn query(
            &self,
            sql: &str,
            args: &[FilterValue],
        ) -> Result<Vec<Row>, QueryError> {
            self.queries
                .lock()
                .unwrap()
                .push((sql.to_owned(), args.to_vec()));
            for (needle, rows) in &self.responses {
                if sql.contains(needle) {
                    return Ok(rows.clone());
                }
            }
            Ok(Vec::new())
        }

        async fn show_create_table(
            &self,
            _database: &str,
            table: &str,
        ) -> Result<String, QueryError> {
            Ok(self
                .create_tables
                .get(table)
                .cloned()
                .unwrap_or_else(|| "CREATE TABLE t (`x` String)".to_owned()))
        }
    }

    fn key_row(name: &str, tag_type: &str, tag_data_type: &str) -> Row {
        Row(vec![
            StoreValue::String(name.to_owned()),
            StoreValue::String(tag_type.to_owned()),
            StoreValue::String(tag_data_type.to_owned()),
            StoreValue::UInt(2),
        ])
    }

    fn store_with(fake: FakeStore) -> (TelemetryMetaStore, Arc<FakeStore>) {
        let fake = Arc::new(fake);
        (
            TelemetryMetaStore::new(fake.clone(), MetadataConfig::default()),
            fake,
        )
    }

    #[tokio::test]
    async fn traces_keys_enumerate_and_rank() {
        let fake = FakeStore::default().respond(
            "parallax_traces.span_fields",
            vec![
                key_row("service.name", "resource", "string"),
                key_row("http.status_code", "tag", "float64"),
            ],
        );
        let (meta, fake) = store_with(fake);

        let mut selector = FieldKeySelector::exact("service.name");
        selector.signal = Signal::Traces;
        let keys = meta.get_keys(&selector).await.unwrap();

        let resolved = &keys["service.name"];
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].field_context, FieldContext::Resource);
        assert_eq!(resolved[0].signal, Signal::Traces);

        let status = &keys["http.status_code"];
        assert_eq!(status[0].field_context, FieldContext::Attribute);
        assert_eq!(status[0].field_data_type.normalised(), FieldDataType::Number);

        // The enumeration carries the priority CASE, grouping, and the
        // default limit.
        let queries = fake.seen_queries();
        let (sql, args) = queries
            .iter()
            .find(|(sql, _)| sql.contains("span_fields"))
            .unwrap();
        assert!(sql.contains("WHEN tag_type = 'spanfield' THEN 1"));
        assert!(sql.contains("GROUP BY tag_key, tag_type, tag_data_type"));
        assert!(sql.contains("ORDER BY priority"));
        assert!(sql.contains("LIMIT 1000"));
        assert_eq!(args, &vec![FilterValue::from("service.name")]);
    }

    #[tokio::test]
    async fn materialisation_enrichment_marks_keys() {
        let ddl = "CREATE TABLE t (\
            `resources_string` Map(LowCardinality(String), String), \
            `resource_string_service$$name` String DEFAULT resources_string['service.name'])";
        let fake = FakeStore::default()
            .with_create_table("logs_index", ddl)
            .respond(
                "parallax_logs.log_fields",
                vec![
                    key_row("service.name", "resource", "string"),
                    key_row("service.name", "tag", "string"),
                ],
            );
        let (meta, _) = store_with(fake);

        let mut selector = FieldKeySelector::exact("service.name");
        selector.signal = Signal::Logs;
        let keys = meta.get_keys(&selector).await.unwrap();

        let resolved = &keys["service.name"];
        assert_eq!(resolved.len(), 2);
        let resource = resolved
            .iter()
            .find(|k| k.field_context == FieldContext::Resource)
            .unwrap();
        assert!(resource.materialized);
        let attribute = resolved
            .iter()
            .find(|k| k.field_context == FieldContext::Attribute)
            .unwrap();
        assert!(!attribute.materialized);
    }

    #[tokio::test]
    async fn selector_filters_reach_the_dictionary_query() {
        let fake = FakeStore::default();
        let (meta, fake) = store_with(fake);

        let mut selector = FieldKeySelector::exact("http.status_code");
        selector.signal = Signal::Traces;
        selector.field_context = FieldContext::Attribute;
        selector.field_data_type = FieldDataType::String;
        selector.start_unix_milli = 1_000;
        selector.end_unix_milli = 2_000;
        selector.limit = 25;
        meta.get_keys(&selector).await.unwrap();

        let queries = fake.seen_queries();
        let (sql, args) = queries
            .iter()
            .find(|(sql, _)| sql.contains("span_fields"))
            .unwrap();
        assert!(sql.contains("unix_milli >= ?"));
        assert!(sql.contains("unix_milli <= ?"));
        assert!(sql.contains("tag_type = ?"));
        assert!(sql.contains("tag_data_type = ?"));
        assert!(sql.contains("LIMIT 25"));
        assert_eq!(
            args,
            &vec![
                FilterValue::Number(1_000.0),
                FilterValue::Number(2_000.0),
                FilterValue::from("http.status_code"),
                FilterValue::from("tag"),
                FilterValue::from("string"),
            ]
        );
    }

    #[tokio::test]
    async fn fuzzy_selector_uses_like() {
        let fake = FakeStore::default();
        let (meta, fake) = store_with(fake);

        let mut selector = FieldKeySelector::exact("status");
        selector.signal = Signal::Logs;
        selector.match_type = SelectorMatchType::Fuzzy;
        meta.get_keys(&selector).await.unwrap();

        let queries = fake.seen_queries();
        let (sql, args) = queries
            .iter()
            .find(|(sql, _)| sql.contains("log_fields"))
            .unwrap();
        assert!(sql.contains("tag_key LIKE ?"));
        assert_eq!(args, &vec![FilterValue::from("%status%")]);
    }

    #[tokio::test]
    async fn metrics_keys_come_from_labels() {
        let fake = FakeStore::default().respond(
            "JSONExtractKeys(labels)",
            vec![
                Row(vec![StoreValue::String("le".to_owned())]),
                Row(vec![StoreValue::String("status".to_owned())]),
            ],
        );
        let (meta, fake) = store_with(fake);

        let mut selector = FieldKeySelector::exact("status");
        selector.signal = Signal::Metrics;
        selector.metric_context = Some(MetricContext {
            metric_names: vec!["http_requests_total".to_owned()],
        });
        let keys = meta.get_keys(&selector).await.unwrap();

        assert!(keys.contains_key("status"));
        let status = &keys["status"][0];
        assert_eq!(status.signal, Signal::Metrics);
        assert_eq!(status.field_context, FieldContext::Attribute);
        assert_eq!(status.field_data_type, FieldDataType::String);

        let queries = fake.seen_queries();
        let (sql, args) = queries
            .iter()
            .find(|(sql, _)| sql.contains("JSONExtractKeys"))
            .unwrap();
        assert!(sql.contains("__normalized = true"));
        assert!(sql.contains("metric_name IN (?)"));
        assert!(sql.contains("NOT LIKE '\\_\\_%'"));
        assert_eq!(
            args,
            &vec![
                FilterValue::from("http_requests_total"),
                FilterValue::from("status"),
            ]
        );
    }

    #[tokio::test]
    async fn unspecified_signal_unions_all_three() {
        let fake = FakeStore::default()
            .respond(
                "parallax_traces.span_fields",
                vec![key_row("env", "resource", "string")],
            )
            .respond(
                "parallax_logs.log_fields",
                vec![key_row("env", "tag", "string")],
            )
            .respond(
                "JSONExtractKeys(labels)",
                vec![Row(vec![StoreValue::String("env".to_owned())])],
            );
        let (meta, _) = store_with(fake);

        let keys = meta.get_keys(&FieldKeySelector::exact("env")).await.unwrap();
        let resolved = &keys["env"];
        assert_eq!(resolved.len(), 3);
        // Union order is traces, logs, metrics.
        assert_eq!(resolved[0].signal, Signal::Traces);
        assert_eq!(resolved[1].signal, Signal::Logs);
        assert_eq!(resolved[2].signal, Signal::Metrics);
    }

    #[tokio::test]
    async fn get_keys_multi_batches_per_signal() {
        let fake = FakeStore::default();
        let (meta, fake) = store_with(fake);

        let mut a = FieldKeySelector::exact("a");
        a.signal = Signal::Logs;
        let mut b = FieldKeySelector::exact("b");
        b.signal = Signal::Logs;
        meta.get_keys_multi(&[a, b]).await.unwrap();

        let queries = fake.seen_queries();
        let log_queries: Vec<_> = queries
            .iter()
            .filter(|(sql, _)| sql.contains("log_fields"))
            .collect();
        assert_eq!(log_queries.len(), 1);
        let (sql, args) = log_queries[0];
        // Both selectors OR'd into one predicate.
        assert!(sql.contains("OR"));
        assert_eq!(args.len(), 2);
    }

    #[tokio::test]
    async fn get_key_returns_only_the_named_keys() {
        let fake = FakeStore::default().respond(
            "parallax_logs.log_fields",
            vec![
                key_row("env", "resource", "string"),
                key_row("other", "tag", "string"),
            ],
        );
        let (meta, _) = store_with(fake);

        let mut selector = FieldKeySelector::exact("env");
        selector.signal = Signal::Logs;
        let keys = meta.get_key(&selector).await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].name, "env");
    }

    #[tokio::test]
    async fn related_values_select_the_guarded_column() {
        let fake = FakeStore::default().respond(
            "related_metadata",
            vec![
                Row(vec![StoreValue::String("prod".to_owned())]),
                Row(vec![StoreValue::String(String::new())]),
                Row(vec![StoreValue::String("staging".to_owned())]),
            ],
        );
        let (meta, fake) = store_with(fake);

        let selector = FieldValueSelector {
            name: "env".to_owned(),
            signal: Signal::Traces,
            field_context: FieldContext::Resource,
            field_data_type: FieldDataType::String,
            start_unix_milli: 1,
            end_unix_milli: 2,
            ..Default::default()
        };
        let values = meta.get_related_values(&selector).await.unwrap();
        // Empty strings are dropped.
        assert_eq!(values, vec!["prod".to_owned(), "staging".to_owned()]);

        let queries = fake.seen_queries();
        let (sql, _) = queries
            .iter()
            .find(|(sql, _)| sql.contains("related_metadata"))
            .unwrap();
        assert!(sql.contains("SELECT DISTINCT resource_attributes['env']"));
        assert!(sql.contains("unix_milli >= ?"));
        assert!(sql.contains("LIMIT 50"));
    }

    #[tokio::test]
    async fn all_values_deduplicate() {
        let fake = FakeStore::default().respond(
            "parallax_traces.span_fields",
            vec![
                Row(vec![
                    StoreValue::String("redis".to_owned()),
                    StoreValue::Float(0.0),
                ]),
                Row(vec![
                    StoreValue::String("redis".to_owned()),
                    StoreValue::Float(1.5),
                ]),
                Row(vec![StoreValue::String(String::new()), StoreValue::Float(1.5)]),
            ],
        );
        let (meta, _) = store_with(fake);

        let selector = FieldValueSelector {
            name: "service.name".to_owned(),
            signal: Signal::Traces,
            ..Default::default()
        };
        let values = meta.get_all_values(&selector).await.unwrap();
        assert_eq!(values.string_values, vec!["redis".to_owned()]);
        assert_eq!(values.number_values, vec![1.5]);
    }

    #[tokio::test]
    async fn all_values_fuzzy_numeric_search() {
        let fake = FakeStore::default();
        let (meta, fake) = store_with(fake);

        let selector = FieldValueSelector {
            name: "request.size".to_owned(),
            signal: Signal::Logs,
            field_data_type: FieldDataType::Number,
            value: "12".to_owned(),
            ..Default::default()
        };
        meta.get_all_values(&selector).await.unwrap();

        let queries = fake.seen_queries();
        let (sql, _) = queries
            .iter()
            .find(|(sql, _)| sql.contains("log_fields"))
            .unwrap();
        assert!(sql.contains("number_value IS NOT NULL"));
        assert!(sql.contains("toString(number_value) LIKE ?"));
    }

    #[tokio::test]
    async fn empty_selector_list_queries_nothing() {
        let fake = FakeStore::default();
        let (meta, fake) = store_with(fake);
        let map = meta.get_keys_multi(&[]).await.unwrap();
        assert!(map.is_empty());
        assert!(fake.seen_queries().is_empty());
    }
}

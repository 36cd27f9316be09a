//! Annotation table retrieval and write-back of harmonized names.

use std::collections::{BTreeMap, HashSet};

use anyhow::Result;
use serde::ser::{Serialize, SerializeMap, Serializer};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use droma_core::models::{EntityKind, MatchResult};
use droma_core::DromaError;

use crate::config::Config;
use crate::db::{self, quote_ident, table_columns, table_exists};

/// Filters for [`get_annotation`].
#[derive(Debug, Clone)]
pub struct AnnotationQuery {
    pub kind: EntityKind,
    pub project: Option<String>,
    pub ids: Vec<String>,
    pub limit: Option<i64>,
}

impl AnnotationQuery {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            project: None,
            ids: Vec::new(),
            limit: None,
        }
    }
}

/// One annotation row as `(column, value)` pairs in table column order.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRow {
    pub columns: Vec<(String, Option<String>)>,
}

impl AnnotationRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(c, _)| c == column)
            .and_then(|(_, v)| v.as_deref())
    }
}

impl Serialize for AnnotationRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in &self.columns {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

pub async fn get_annotation(pool: &SqlitePool, query: &AnnotationQuery) -> Result<Vec<AnnotationRow>> {
    let kind = query.kind;
    let table = kind.table();
    if !table_exists(pool, table).await? {
        return Err(DromaError::table_not_found(table).into());
    }

    let columns = table_columns(pool, table).await?;
    let select: Vec<String> = columns
        .iter()
        .map(|c| format!("CAST({} AS TEXT)", quote_ident(c)))
        .collect();

    let mut sql = format!("SELECT {} FROM {} WHERE 1=1", select.join(", "), quote_ident(table));
    if query.project.is_some() {
        sql.push_str(" AND ProjectID = ?");
    }
    if !query.ids.is_empty() {
        let placeholders = vec!["?"; query.ids.len()].join(", ");
        sql.push_str(&format!(
            " AND {} IN ({})",
            quote_ident(kind.id_column()),
            placeholders
        ));
    }
    sql.push_str(&format!(" ORDER BY {}", quote_ident(kind.id_column())));
    if query.limit.is_some() {
        sql.push_str(" LIMIT ?");
    }

    let mut q = sqlx::query(&sql);
    if let Some(project) = &query.project {
        q = q.bind(project);
    }
    for id in &query.ids {
        q = q.bind(id);
    }
    if let Some(limit) = query.limit {
        q = q.bind(limit);
    }

    let rows = q
        .fetch_all(pool)
        .await
        .map_err(|e| DromaError::query(format!("Failed to read {}", table), e.to_string()))?;

    let result: Vec<AnnotationRow> = rows
        .iter()
        .map(|row| AnnotationRow {
            columns: columns
                .iter()
                .enumerate()
                .map(|(i, c)| (c.clone(), row.get::<Option<String>, _>(i)))
                .collect(),
        })
        .collect();

    if query.limit.is_some() {
        let total = count_rows(pool, table, query).await?;
        info!(
            "Retrieved {} {} annotation rows (of {} total)",
            result.len(),
            kind,
            total
        );
    } else {
        info!("Retrieved {} {} annotation rows", result.len(), kind);
    }

    Ok(result)
}

/// Print annotation rows for `droma annotation`.
pub async fn run_annotation(config: &Config, query: &AnnotationQuery, json: bool) -> Result<()> {
    let pool = db::connect(config).await?;
    let rows = get_annotation(&pool, query).await?;
    pool.close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No annotation rows.");
        return Ok(());
    }

    let header: Vec<&str> = rows[0].columns.iter().map(|(c, _)| c.as_str()).collect();
    println!("{}", header.join("\t"));
    for row in &rows {
        let cells: Vec<&str> = row
            .columns
            .iter()
            .map(|(_, v)| v.as_deref().unwrap_or(""))
            .collect();
        println!("{}", cells.join("\t"));
    }
    Ok(())
}

async fn count_rows(pool: &SqlitePool, table: &str, query: &AnnotationQuery) -> Result<i64> {
    let mut sql = format!("SELECT COUNT(*) FROM {} WHERE 1=1", quote_ident(table));
    if query.project.is_some() {
        sql.push_str(" AND ProjectID = ?");
    }
    if !query.ids.is_empty() {
        sql.push_str(&format!(
            " AND {} IN ({})",
            quote_ident(query.kind.id_column()),
            vec!["?"; query.ids.len()].join(", ")
        ));
    }
    let mut q = sqlx::query_scalar::<_, i64>(&sql);
    if let Some(project) = &query.project {
        q = q.bind(project);
    }
    for id in &query.ids {
        q = q.bind(id);
    }
    Ok(q.fetch_one(pool).await?)
}

// ─── Annotation update ───

/// An attribute given once for every row, or once per mapping row.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValues {
    Single(String),
    PerRow(Vec<String>),
}

impl AttributeValues {
    fn validate(&self, name: &str, n_rows: usize) -> Result<(), DromaError> {
        if let AttributeValues::PerRow(values) = self {
            if values.len() != 1 && values.len() != n_rows {
                return Err(DromaError::Validation(format!(
                    "{} list length ({}) must match name_mapping rows ({}) or be a single value",
                    name,
                    values.len(),
                    n_rows
                )));
            }
        }
        Ok(())
    }

    fn value_for(&self, row: usize) -> Option<&str> {
        match self {
            AttributeValues::Single(v) => Some(v),
            AttributeValues::PerRow(values) if values.len() == 1 => values.first().map(String::as_str),
            AttributeValues::PerRow(values) => values.get(row).map(String::as_str),
        }
    }
}

impl From<&str> for AttributeValues {
    fn from(value: &str) -> Self {
        AttributeValues::Single(value.to_string())
    }
}

impl From<Vec<String>> for AttributeValues {
    fn from(values: Vec<String>) -> Self {
        AttributeValues::PerRow(values)
    }
}

/// Sample columns filled from caller input. Ignored for drugs.
#[derive(Debug, Clone, Default)]
pub struct SampleAttributes {
    pub data_type: Option<AttributeValues>,
    pub tumor_type: Option<AttributeValues>,
    pub patient_id: Option<AttributeValues>,
    pub gender: Option<AttributeValues>,
    pub age: Option<AttributeValues>,
    pub full_ethnicity: Option<AttributeValues>,
    pub simple_ethnicity: Option<AttributeValues>,
}

impl SampleAttributes {
    fn named(&self) -> [(&'static str, &Option<AttributeValues>); 7] {
        [
            ("data_type", &self.data_type),
            ("tumor_type", &self.tumor_type),
            ("patient_id", &self.patient_id),
            ("gender", &self.gender),
            ("age", &self.age),
            ("full_ethnicity", &self.full_ethnicity),
            ("simple_ethnicity", &self.simple_ethnicity),
        ]
    }

    fn validate(&self, n_rows: usize) -> Result<(), DromaError> {
        for (name, values) in self.named() {
            if let Some(values) = values {
                values.validate(name, n_rows)?;
            }
        }
        Ok(())
    }
}

fn attr(values: &Option<AttributeValues>, row: usize) -> Option<String> {
    values
        .as_ref()
        .and_then(|v| v.value_for(row))
        .map(str::to_string)
}

/// Outcome of [`update_annotation`].
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct UpdateSummary {
    pub table: String,
    pub added: usize,
    pub skipped: usize,
    pub first_index: Option<String>,
    pub last_index: Option<String>,
    pub match_type_counts: BTreeMap<String, usize>,
}

const SAMPLE_INSERT_COLUMNS: [&str; 11] = [
    "SampleID",
    "PatientID",
    "ProjectID",
    "TumorType",
    "Gender",
    "Age",
    "FullEthnicity",
    "SimpleEthnicity",
    "DataType",
    "ProjectRawName",
    "IndexID",
];

const DRUG_INSERT_COLUMNS: [&str; 4] = ["DrugName", "ProjectID", "ProjectRawName", "IndexID"];

/// Add the resolved names of `mapping` to the annotation table for `kind`.
///
/// Rows whose `(new_name, project)` pair already exists are skipped. New
/// rows get the next `IndexID` after the current maximum. Everything is
/// written in one transaction.
pub async fn update_annotation(
    pool: &SqlitePool,
    kind: EntityKind,
    mapping: &[MatchResult],
    project: &str,
    attrs: &SampleAttributes,
) -> Result<UpdateSummary> {
    let table = kind.table();
    if !table_exists(pool, table).await? {
        return Err(DromaError::TableNotFound {
            table: table.to_string(),
            details: Some("Run `droma init` to create the annotation tables".to_string()),
        }
        .into());
    }

    if kind == EntityKind::Sample {
        attrs.validate(mapping.len())?;
    }
    if let Some(row) = mapping.iter().position(|m| m.new_name().is_empty()) {
        return Err(DromaError::Data(format!("mapping row {} has an empty new_name", row)).into());
    }

    let id_column = quote_ident(kind.id_column());
    let existing_sql = format!(
        "SELECT CAST({} AS TEXT) FROM {} WHERE ProjectID = ?",
        id_column,
        quote_ident(table)
    );
    let existing: Vec<Option<String>> = sqlx::query_scalar(&existing_sql)
        .bind(project)
        .fetch_all(pool)
        .await?;
    let mut seen: HashSet<String> = existing.into_iter().flatten().collect();

    let max_index = max_index_number(pool, kind).await?;
    let prefix = kind.index_prefix();

    let columns = match kind {
        EntityKind::Sample => &SAMPLE_INSERT_COLUMNS[..],
        EntityKind::Drug => &DRUG_INSERT_COLUMNS[..],
    };
    let insert_sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", "),
        vec!["?"; columns.len()].join(", ")
    );

    let mut summary = UpdateSummary {
        table: table.to_string(),
        ..UpdateSummary::default()
    };
    let mut next_index = max_index;

    let mut tx = pool.begin().await?;

    for (i, entry) in mapping.iter().enumerate() {
        *summary
            .match_type_counts
            .entry(entry.match_type.tag())
            .or_insert(0) += 1;

        let new_name = entry.new_name();
        if !seen.insert(new_name.to_string()) {
            summary.skipped += 1;
            continue;
        }

        next_index += 1;
        let index_id = format!("{}{}", prefix, next_index);

        let q = sqlx::query(&insert_sql).bind(new_name);
        let q = match kind {
            EntityKind::Sample => q
                .bind(attr(&attrs.patient_id, i))
                .bind(project)
                .bind(attr(&attrs.tumor_type, i))
                .bind(attr(&attrs.gender, i))
                .bind(attr(&attrs.age, i))
                .bind(attr(&attrs.full_ethnicity, i))
                .bind(attr(&attrs.simple_ethnicity, i))
                .bind(attr(&attrs.data_type, i))
                .bind(&entry.original_name)
                .bind(&index_id),
            EntityKind::Drug => q.bind(project).bind(&entry.original_name).bind(&index_id),
        };
        q.execute(&mut *tx).await.map_err(|e| {
            DromaError::query(format!("Failed to insert entry for {}", new_name), e.to_string())
        })?;

        summary.added += 1;
        if summary.first_index.is_none() {
            summary.first_index = Some(index_id.clone());
        }
        summary.last_index = Some(index_id);
    }

    tx.commit().await?;

    info!("Updated {} table:", table);
    info!("  Added: {} new entries", summary.added);
    info!("  Skipped: {} existing entries", summary.skipped);
    if let (Some(first), Some(last)) = (&summary.first_index, &summary.last_index) {
        info!("  Generated new IndexIDs from {} to {}", first, last);
    }
    info!("  Match types for processed entries:");
    for (match_type, count) in &summary.match_type_counts {
        info!("    {}: {}", match_type, count);
    }

    Ok(summary)
}

/// Largest numeric `IndexID` suffix for `kind`, or 0.
async fn max_index_number(pool: &SqlitePool, kind: EntityKind) -> Result<u64> {
    let table = kind.table();
    let columns = table_columns(pool, table).await?;
    if !columns.iter().any(|c| c == "IndexID") {
        return Ok(0);
    }

    let sql = format!(
        "SELECT CAST(IndexID AS TEXT) FROM {} WHERE IndexID IS NOT NULL",
        quote_ident(table)
    );
    let ids: Vec<Option<String>> = sqlx::query_scalar(&sql).fetch_all(pool).await?;
    let max = ids
        .iter()
        .flatten()
        .filter_map(|id| parse_index_number(id, kind.index_prefix()))
        .max()
        .unwrap_or(0);
    debug!(table, max_index = max, "current IndexID maximum");
    Ok(max)
}

fn parse_index_number(index_id: &str, prefix: &str) -> Option<u64> {
    index_id.replace(prefix, "").trim().parse().ok()
}

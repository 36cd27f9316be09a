//! Table and project catalog.
//!
//! Omics and drug tables follow the `<project>_<data type>` naming
//! convention, so most of the catalog is inferred from `sqlite_master`.
//! The `projects` table caches per-project metadata and is refreshed by
//! [`update_projects`].

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use tracing::{info, warn};

use crate::config::Config;
use crate::db::{self, quote_ident, table_columns, table_exists};

/// Tables that are never listed as omics or drug data.
pub const EXCLUDED_TABLES: [&str; 5] = [
    "sample_anno",
    "drug_anno",
    "projects",
    "droma_metadata",
    "search_vectors",
];

const EXCLUDED_FRAGMENTS: [&str; 3] = ["raw", "dose", "viability"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    pub table_name: String,
    pub project: String,
    pub feature_type: String,
    pub feature_count: i64,
    pub sample_count: usize,
    pub created_date: Option<String>,
    pub updated_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectInfo {
    pub project_name: String,
    pub dataset_type: Option<String>,
    pub data_types: Option<String>,
    pub sample_count: Option<i64>,
    pub drug_count: Option<i64>,
    pub created_date: Option<String>,
    pub updated_date: Option<String>,
}

impl ProjectInfo {
    fn named(project_name: String) -> Self {
        Self {
            project_name,
            dataset_type: None,
            data_types: None,
            sample_count: None,
            drug_count: None,
            created_date: None,
            updated_date: None,
        }
    }
}

async fn all_tables(pool: &SqlitePool) -> Result<Vec<String>> {
    let names: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .fetch_all(pool)
            .await?;
    Ok(names)
}

/// Whether `table` is an omics or drug data table.
pub fn is_data_table(table: &str) -> bool {
    !EXCLUDED_TABLES.contains(&table)
        && !EXCLUDED_FRAGMENTS.iter().any(|f| table.contains(f))
        && table.contains('_')
}

/// Split a data table name into `(project, feature_type)`.
///
/// Mutation tables keep two parts: `gCSI_mutation_gene` is `mutation_gene`.
pub fn split_table_name(table: &str) -> Option<(String, String)> {
    let parts: Vec<&str> = table.split('_').collect();
    if parts.len() < 2 {
        return None;
    }
    let feature_type = if parts.len() >= 3 && parts[1] == "mutation" {
        parts[1..3].join("_")
    } else {
        parts[1].to_string()
    };
    Some((parts[0].to_string(), feature_type))
}

pub async fn list_tables(pool: &SqlitePool, pattern: Option<&Regex>) -> Result<Vec<TableInfo>> {
    let tables: Vec<String> = all_tables(pool)
        .await?
        .into_iter()
        .filter(|t| is_data_table(t))
        .filter(|t| pattern.map_or(true, |re| re.is_match(t)))
        .collect();

    if tables.is_empty() {
        info!("No omics or drug tables found");
        return Ok(Vec::new());
    }

    let projects = if table_exists(pool, "projects").await? {
        list_projects_table(pool).await?
    } else {
        Vec::new()
    };

    let mut result = Vec::with_capacity(tables.len());
    for table in tables {
        let Some((project, feature_type)) = split_table_name(&table) else {
            continue;
        };

        let count_sql = format!("SELECT COUNT(*) FROM {}", quote_ident(&table));
        let feature_count: i64 = match sqlx::query_scalar(&count_sql).fetch_one(pool).await {
            Ok(n) => n,
            Err(e) => {
                warn!("Error getting info for table {}: {}", table, e);
                continue;
            }
        };
        let columns = table_columns(pool, &table).await?;
        let sample_count = columns.iter().filter(|c| *c != "feature_id").count();

        let meta = projects.iter().find(|p| p.project_name == project);
        result.push(TableInfo {
            table_name: table,
            project,
            feature_type,
            feature_count,
            sample_count,
            created_date: meta.and_then(|p| p.created_date.clone()),
            updated_date: meta.and_then(|p| p.updated_date.clone()),
        });
    }

    Ok(result)
}

async fn list_projects_table(pool: &SqlitePool) -> Result<Vec<ProjectInfo>> {
    let rows = sqlx::query(
        r#"
        SELECT project_name, dataset_type, data_types, sample_count, drug_count,
               created_date, updated_date
        FROM projects
        ORDER BY project_name
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| ProjectInfo {
            project_name: row.get("project_name"),
            dataset_type: row.get("dataset_type"),
            data_types: row.get("data_types"),
            sample_count: row.get("sample_count"),
            drug_count: row.get("drug_count"),
            created_date: row.get("created_date"),
            updated_date: row.get("updated_date"),
        })
        .collect())
}

/// Projects inferred from `<project>_<type>` table names.
fn infer_projects(tables: &[String]) -> BTreeSet<String> {
    tables
        .iter()
        .filter(|t| !EXCLUDED_TABLES.contains(&t.as_str()) && !t.ends_with("_raw"))
        .filter_map(|t| split_table_name(t).map(|(project, _)| project))
        .collect()
}

/// Projects from the `projects` table, or inferred from table names when
/// that table does not exist.
pub async fn list_projects(pool: &SqlitePool) -> Result<Vec<ProjectInfo>> {
    if table_exists(pool, "projects").await? {
        return list_projects_table(pool).await;
    }

    let projects: Vec<ProjectInfo> = infer_projects(&all_tables(pool).await?)
        .into_iter()
        .map(ProjectInfo::named)
        .collect();
    if projects.is_empty() {
        info!("No projects found in database");
    }
    Ok(projects)
}

/// Data types recorded or inferred for `project`.
pub async fn project_data_types(pool: &SqlitePool, project: &str) -> Result<Vec<String>> {
    if table_exists(pool, "projects").await? {
        let data_types: Option<Option<String>> =
            sqlx::query_scalar("SELECT data_types FROM projects WHERE project_name = ?")
                .bind(project)
                .fetch_optional(pool)
                .await?;
        return match data_types {
            Some(Some(list)) if !list.is_empty() => {
                Ok(list.split(',').map(str::to_string).collect())
            }
            Some(_) => Ok(Vec::new()),
            None => {
                warn!("Project '{}' not found", project);
                Ok(Vec::new())
            }
        };
    }

    let prefix = format!("{}_", project);
    let types: BTreeSet<String> = all_tables(pool)
        .await?
        .iter()
        .filter(|t| t.starts_with(&prefix) && !t.ends_with("_raw"))
        .map(|t| t[prefix.len()..].to_string())
        .collect();
    if types.is_empty() {
        warn!("Project '{}' not found", project);
    }
    Ok(types.into_iter().collect())
}

/// Data types for a project from its table names: raw, dose and viability
/// tables are skipped, and `drug_dose` is added when dose-response tables
/// exist.
fn derive_data_types(project: &str, tables: &[String]) -> Vec<String> {
    let prefix = format!("{}_", project);
    let project_tables: Vec<&String> = tables
        .iter()
        .filter(|t| t.starts_with(&prefix) && !t.ends_with("_raw"))
        .collect();

    let mut types: BTreeSet<String> = project_tables
        .iter()
        .filter(|t| !EXCLUDED_FRAGMENTS.iter().any(|f| t.contains(f)))
        .map(|t| t[prefix.len()..].to_string())
        .collect();

    let dose = format!("{}drug_dose", prefix);
    let viability = format!("{}drug_viability", prefix);
    if project_tables.iter().any(|t| **t == dose || **t == viability) {
        types.insert("drug_dose".to_string());
    }
    types.into_iter().collect()
}

/// Recompute and upsert `projects` rows. Returns the number of projects
/// added or updated.
pub async fn update_projects(
    pool: &SqlitePool,
    project: Option<&str>,
    dataset_type: Option<&str>,
) -> Result<usize> {
    let tables = all_tables(pool).await?;

    let names: Vec<String> = match project {
        Some(p) => vec![p.to_string()],
        None => infer_projects(&tables).into_iter().collect(),
    };
    if names.is_empty() {
        info!("No projects found in database");
        return Ok(0);
    }

    if !tables.iter().any(|t| t == "projects") {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS projects (
                project_name TEXT PRIMARY KEY,
                dataset_type TEXT,
                data_types TEXT,
                sample_count INTEGER,
                drug_count INTEGER,
                created_date TEXT,
                updated_date TEXT
            )
            "#,
        )
        .execute(pool)
        .await?;
        info!("Created projects table");
    }

    let has_sample_anno = tables.iter().any(|t| t == "sample_anno");
    let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let mut added = 0usize;
    let mut updated = 0usize;

    for name in &names {
        let data_types = derive_data_types(name, &tables);
        if data_types.is_empty() {
            warn!("No tables found for project '{}'", name);
            continue;
        }

        let mut sample_count = 0i64;
        let mut current_type = dataset_type.map(str::to_string);
        if has_sample_anno {
            sample_count = sqlx::query_scalar(
                "SELECT COUNT(DISTINCT SampleID) FROM sample_anno WHERE ProjectID = ?",
            )
            .bind(name)
            .fetch_one(pool)
            .await?;
            if current_type.is_none() {
                current_type = sqlx::query_scalar::<_, Option<String>>(
                    "SELECT DataType FROM sample_anno WHERE ProjectID = ? AND DataType IS NOT NULL LIMIT 1",
                )
                .bind(name)
                .fetch_optional(pool)
                .await?
                .flatten();
            }
        }

        let drug_table = format!("{}_drug", name);
        let drug_count: i64 = if tables.contains(&drug_table) {
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", quote_ident(&drug_table)))
                .fetch_one(pool)
                .await?
        } else {
            0
        };

        let data_types_str = data_types.join(",");
        let exists: bool =
            sqlx::query_scalar("SELECT COUNT(*) > 0 FROM projects WHERE project_name = ?")
                .bind(name)
                .fetch_one(pool)
                .await?;

        if exists {
            sqlx::query(
                r#"
                UPDATE projects SET
                    dataset_type = ?,
                    data_types = ?,
                    sample_count = ?,
                    drug_count = ?,
                    updated_date = ?
                WHERE project_name = ?
                "#,
            )
            .bind(&current_type)
            .bind(&data_types_str)
            .bind(sample_count)
            .bind(drug_count)
            .bind(&now)
            .bind(name)
            .execute(pool)
            .await?;
            info!(
                "Updated project '{}' with {} data types ({}), {} samples, {} drugs",
                name,
                data_types.len(),
                data_types_str,
                sample_count,
                drug_count
            );
            updated += 1;
        } else {
            sqlx::query(
                r#"
                INSERT INTO projects (project_name, dataset_type, data_types,
                                      sample_count, drug_count, created_date, updated_date)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(name)
            .bind(&current_type)
            .bind(&data_types_str)
            .bind(sample_count)
            .bind(drug_count)
            .bind(&now)
            .bind(&now)
            .execute(pool)
            .await?;
            info!(
                "Added new project '{}' with {} data types ({}), {} samples, {} drugs",
                name,
                data_types.len(),
                data_types_str,
                sample_count,
                drug_count
            );
            added += 1;
        }
    }

    if added + updated > 0 {
        info!(
            "Project metadata update complete: {} projects added, {} projects updated",
            added, updated
        );
    } else {
        info!("No projects were added or updated");
    }

    Ok(added + updated)
}

/// Print the table listing for `droma tables`.
pub async fn run_tables(config: &Config, pattern: Option<&str>) -> Result<()> {
    let pattern = pattern
        .map(Regex::new)
        .transpose()
        .context("Invalid --pattern regex")?;

    let pool = db::connect(config).await?;
    let tables = list_tables(&pool, pattern.as_ref()).await?;
    pool.close().await;

    if tables.is_empty() {
        println!("No omics or drug tables found.");
        return Ok(());
    }

    println!(
        "{:<32} {:<12} {:<16} {:>10} {:>8}  {}",
        "TABLE", "PROJECT", "FEATURE TYPE", "FEATURES", "SAMPLES", "UPDATED"
    );
    for t in &tables {
        println!(
            "{:<32} {:<12} {:<16} {:>10} {:>8}  {}",
            t.table_name,
            t.project,
            t.feature_type,
            t.feature_count,
            t.sample_count,
            t.updated_date.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

/// `droma projects`: refresh project metadata when asked, then list.
pub async fn run_projects(
    config: &Config,
    update: bool,
    project: Option<&str>,
    dataset_type: Option<&str>,
) -> Result<()> {
    let pool = db::connect(config).await?;

    if update {
        let n = update_projects(&pool, project, dataset_type).await?;
        println!("Updated {} project(s).", n);
    }

    if let (Some(p), false) = (project, update) {
        let types = project_data_types(&pool, p).await?;
        pool.close().await;
        println!("{}: {}", p, types.join(", "));
        return Ok(());
    }

    let projects = list_projects(&pool).await?;
    pool.close().await;

    if projects.is_empty() {
        println!("No projects found.");
        return Ok(());
    }

    println!(
        "{:<16} {:<12} {:>8} {:>8}  {}",
        "PROJECT", "DATASET", "SAMPLES", "DRUGS", "DATA TYPES"
    );
    for p in &projects {
        println!(
            "{:<16} {:<12} {:>8} {:>8}  {}",
            p.project_name,
            p.dataset_type.as_deref().unwrap_or("-"),
            p.sample_count.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string()),
            p.drug_count.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string()),
            p.data_types.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_is_data_table() {
        assert!(is_data_table("gCSI_mRNA"));
        assert!(is_data_table("CCLE_mutation_gene"));
        assert!(!is_data_table("sample_anno"));
        assert!(!is_data_table("gCSI_mRNA_raw"));
        assert!(!is_data_table("gCSI_drug_dose"));
        assert!(!is_data_table("gCSI_drug_viability"));
        assert!(!is_data_table("metadata"));
    }

    #[test]
    fn test_split_table_name() {
        assert_eq!(
            split_table_name("gCSI_mRNA"),
            Some(("gCSI".to_string(), "mRNA".to_string()))
        );
        assert_eq!(
            split_table_name("CCLE_mutation_site"),
            Some(("CCLE".to_string(), "mutation_site".to_string()))
        );
        assert_eq!(
            split_table_name("CCLE_cnv_extra"),
            Some(("CCLE".to_string(), "cnv".to_string()))
        );
        assert_eq!(split_table_name("projects"), None);
    }

    #[test]
    fn test_infer_projects_skips_annotation_and_backups() {
        let tables = names(&["sample_anno", "drug_anno", "gCSI_mRNA", "gCSI_cnv", "CCLE_drug", "CTRP_mRNA_raw"]);
        let projects: Vec<String> = infer_projects(&tables).into_iter().collect();
        assert_eq!(projects, vec!["CCLE", "gCSI"]);
    }

    #[test]
    fn test_derive_data_types_adds_drug_dose() {
        let tables = names(&[
            "gCSI_mRNA",
            "gCSI_drug",
            "gCSI_drug_raw",
            "gCSI_drug_viability",
            "gCSIX_mRNA",
        ]);
        assert_eq!(
            derive_data_types("gCSI", &tables),
            vec!["drug", "drug_dose", "mRNA"]
        );
    }
}

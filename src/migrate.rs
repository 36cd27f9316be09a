use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect_or_create(config).await?;
    create_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create the annotation and project tables on an open pool. Idempotent.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // Sample annotation
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sample_anno (
            SampleID TEXT NOT NULL,
            PatientID TEXT,
            ProjectID TEXT,
            HarmonizedIdentifier TEXT,
            TumorType TEXT,
            MolecularSubtype TEXT,
            Gender TEXT,
            Age TEXT,
            FullEthnicity TEXT,
            SimpleEthnicity TEXT,
            TNMstage TEXT,
            Primary_Metastasis TEXT,
            DataType TEXT,
            ProjectRawName TEXT,
            AlternateName TEXT,
            IndexID TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Drug annotation
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS drug_anno (
            DrugName TEXT NOT NULL,
            ProjectID TEXT,
            "Harmonized ID (Pubchem ID)" TEXT,
            "Source for Clinical Information" TEXT,
            "Clinical Phase" TEXT,
            MOA TEXT,
            Targets TEXT,
            ProjectRawName TEXT,
            IndexID TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Project catalog
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

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_sample_anno_id_project ON sample_anno(SampleID, ProjectID)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_drug_anno_name_project ON drug_anno(DrugName, ProjectID)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

//! Store PostgreSQL/PostGIS

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::BytesMut;
use deadpool_postgres::Pool;
use futures::SinkExt;
use geo::Geometry;
use geozero::wkt::WktWriter;
use geozero::GeozeroGeometry;
use tracing::{debug, info, warn};

use super::NeighborhoodStore;
use crate::model::Neighborhood;

/// Colonnes alimentées par COPY, dans l'ordre des lignes CSV
const COPY_COLUMNS: &str = "state, county, city, name, region_id, geom";

/// Table `schema.table` d'une base PostGIS
#[derive(Clone)]
pub struct PostgresStore {
    pool: Pool,
    schema: String,
    table: String,
    srid: u32,
}

impl PostgresStore {
    /// Les identifiants doivent avoir été validés (`config::validate_identifier`)
    pub fn new(pool: Pool, schema: impl Into<String>, table: impl Into<String>, srid: u32) -> Self {
        Self {
            pool,
            schema: schema.into(),
            table: table.into(),
            srid,
        }
    }

    fn qualified(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }

    /// Crée le schéma, l'extension PostGIS, la table et son index spatial
    pub async fn ensure_table(&self) -> Result<()> {
        let client = self.pool.get().await?;

        client
            .execute(&format!("CREATE SCHEMA IF NOT EXISTS {}", self.schema), &[])
            .await
            .context("Failed to create schema")?;

        // Peut nécessiter des droits superuser: on accepte une extension déjà installée
        if let Err(e) = client
            .execute("CREATE EXTENSION IF NOT EXISTS postgis", &[])
            .await
        {
            warn!("CREATE EXTENSION postgis failed (will check if already installed): {e}");
            let exists = client
                .query_opt("SELECT 1 FROM pg_extension WHERE extname = 'postgis'", &[])
                .await
                .context("Failed to check pg_extension")?
                .is_some();
            if !exists {
                anyhow::bail!("PostGIS extension is not installed and could not be created: {e}");
            }
        }

        let sql = create_table_sql(&self.qualified(), self.srid);
        client
            .execute(&sql, &[])
            .await
            .with_context(|| format!("Failed to create table {}", self.qualified()))?;

        client
            .execute(
                &format!(
                    "CREATE INDEX IF NOT EXISTS idx_{}_{}_geom ON {} USING GIST (geom)",
                    self.schema,
                    self.table,
                    self.qualified()
                ),
                &[],
            )
            .await
            .with_context(|| format!("Failed to create geometry index on {}", self.qualified()))?;

        info!("Table {} ready", self.qualified());
        Ok(())
    }
}

#[async_trait]
impl NeighborhoodStore for PostgresStore {
    async fn clear(&self) -> Result<u64> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute(&format!("DELETE FROM {}", self.qualified()), &[])
            .await
            .with_context(|| format!("Failed to clear {}", self.qualified()))?;

        info!(deleted, "Cleared {}", self.qualified());
        Ok(deleted)
    }

    async fn insert(&self, records: &[Neighborhood]) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        // Lignes construites avant d'ouvrir la transaction
        let ewkt_prefix = format!("SRID={};", self.srid);
        let mut buf = BytesMut::with_capacity(records.len() * 512);
        let mut wkt_buf = Vec::new();
        for record in records {
            write_copy_row(&mut buf, record, ewkt_prefix.as_bytes(), &mut wkt_buf)?;
        }

        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let copy_sql = format!(
            "COPY {} ({}) FROM STDIN WITH (FORMAT csv, DELIMITER '|', QUOTE '\"', ESCAPE '\"', NULL '')",
            self.qualified(),
            COPY_COLUMNS
        );
        let copy_in = tx.copy_in(&copy_sql).await?;
        let mut pinned = std::pin::pin!(copy_in);

        pinned
            .as_mut()
            .send(buf.freeze())
            .await
            .context("Failed to send COPY data")?;
        let rows = pinned
            .as_mut()
            .finish()
            .await
            .with_context(|| format!("COPY into {} failed", self.qualified()))?;

        tx.commit().await.context("Failed to commit transaction")?;

        debug!(rows, "Inserted into {}", self.qualified());
        Ok(rows)
    }

    async fn count(&self) -> Result<u64> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(&format!("SELECT COUNT(*) FROM {}", self.qualified()), &[])
            .await
            .with_context(|| format!("Failed to count {}", self.qualified()))?;
        let count: i64 = row.get(0);
        Ok(count as u64)
    }
}

/// DDL de la table; `region_id` couvre toute la plage i64 acceptée par le mapping
fn create_table_sql(qualified: &str, srid: u32) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            id BIGSERIAL PRIMARY KEY,
            state VARCHAR(2) NOT NULL,
            county VARCHAR(43) NOT NULL,
            city VARCHAR(64) NOT NULL,
            name VARCHAR(64) NOT NULL,
            region_id BIGINT,
            geom geometry(MultiPolygon, {}) NOT NULL
        )
        "#,
        qualified, srid
    )
}

/// Ajoute une ligne `state|county|city|name|region_id|geom` au tampon COPY
fn write_copy_row(
    buf: &mut BytesMut,
    record: &Neighborhood,
    ewkt_prefix: &[u8],
    wkt_buf: &mut Vec<u8>,
) -> Result<()> {
    for value in [&record.state, &record.county, &record.city, &record.name] {
        push_csv_text_field(buf, value);
        buf.extend_from_slice(b"|");
    }

    // NULL '' : champ vide non quoté
    if let Some(region_id) = record.region_id {
        buf.extend_from_slice(region_id.to_string().as_bytes());
    }
    buf.extend_from_slice(b"|");

    wkt_buf.clear();
    {
        let mut writer = WktWriter::new(&mut *wkt_buf);
        Geometry::MultiPolygon(record.geom.clone())
            .process_geom(&mut writer)
            .with_context(|| format!("Failed to convert geometry for {}", record.name))?;
    }
    buf.extend_from_slice(b"\"");
    buf.extend_from_slice(ewkt_prefix);
    buf.extend_from_slice(wkt_buf);
    buf.extend_from_slice(b"\"\n");

    Ok(())
}

fn push_csv_text_field(buf: &mut BytesMut, value: &str) {
    buf.extend_from_slice(b"\"");
    for b in value.as_bytes() {
        match *b {
            b'"' => buf.extend_from_slice(b"\"\""),
            b'\n' | b'\r' => buf.extend_from_slice(b" "),
            _ => buf.extend_from_slice(&[*b]),
        }
    }
    buf.extend_from_slice(b"\"");
}

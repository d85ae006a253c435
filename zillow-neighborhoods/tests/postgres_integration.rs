//! Tests d'intégration PostgreSQL/PostGIS
//!
//! Ces tests nécessitent une base PostGIS disponible.
//! Configuration via variables d'environnement:
//! - PGHOST, PGPORT, PGUSER, PGPASSWORD, PGDATABASE
//!
//! Exécution:
//! ```bash
//! docker run -d --name postgis-test -e POSTGRES_PASSWORD=test -p 5432:5432 postgis/postgis
//! PGPASSWORD=test PGDATABASE=postgres cargo test --test postgres_integration -- --ignored
//! ```

use anyhow::Result;
use geo::{polygon, MultiPolygon};

use zillow_neighborhoods::store::pool::{connect, DatabaseConfig, SslMode};
use zillow_neighborhoods::{Neighborhood, NeighborhoodStore, PostgresStore};

const SCHEMA: &str = "zillow_test";

fn neighborhood(name: &str, region_id: Option<i64>) -> Neighborhood {
    Neighborhood {
        state: "DE".into(),
        county: "New Castle".into(),
        city: "Wilmington".into(),
        name: name.into(),
        region_id,
        geom: MultiPolygon::new(vec![polygon![
            (x: -75.56, y: 39.75),
            (x: -75.55, y: 39.75),
            (x: -75.55, y: 39.76),
            (x: -75.56, y: 39.76),
            (x: -75.56, y: 39.75)
        ]]),
    }
}

async fn setup_store(table: &str) -> Result<PostgresStore> {
    let pool = connect(&DatabaseConfig::from_env()).await?;

    let client = pool.get().await?;
    client
        .batch_execute(&format!("DROP TABLE IF EXISTS {}.{}", SCHEMA, table))
        .await
        .ok();
    drop(client);

    let store = PostgresStore::new(pool, SCHEMA, table, 4269);
    store.ensure_table().await?;
    Ok(store)
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_insert_count_clear() -> Result<()> {
    let store = setup_store("neighborhoods_roundtrip").await?;

    let inserted = store
        .insert(&[
            neighborhood("Trolley Square", Some(270001)),
            neighborhood("The \"Flats\" | Riverside", None),
        ])
        .await?;
    assert_eq!(inserted, 2);
    assert_eq!(store.count().await?, 2);

    // Une seconde création de table est sans effet
    store.ensure_table().await?;
    assert_eq!(store.count().await?, 2);

    assert_eq!(store.clear().await?, 2);
    assert_eq!(store.count().await?, 0);
    Ok(())
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_geometry_and_nulls_stored() -> Result<()> {
    let store = setup_store("neighborhoods_geom").await?;
    store
        .insert(&[
            neighborhood("Forty Acres", None),
            neighborhood("Woodbrook", Some(3_000_000_000)),
        ])
        .await?;

    let pool = connect(&DatabaseConfig::from_env()).await?;
    let client = pool.get().await?;
    let row = client
        .query_one(
            &format!(
                "SELECT name, region_id, ST_SRID(geom), GeometryType(geom) FROM {}.neighborhoods_geom WHERE region_id IS NULL",
                SCHEMA
            ),
            &[],
        )
        .await?;

    let name: String = row.get(0);
    let region_id: Option<i64> = row.get(1);
    let srid: i32 = row.get(2);
    let geometry_type: String = row.get(3);
    assert_eq!(name, "Forty Acres");
    assert_eq!(region_id, None);
    assert_eq!(srid, 4269);
    assert_eq!(geometry_type, "MULTIPOLYGON");

    let large: i64 = client
        .query_one(
            &format!(
                "SELECT region_id FROM {}.neighborhoods_geom WHERE name = 'Woodbrook'",
                SCHEMA
            ),
            &[],
        )
        .await?
        .get(0);
    assert_eq!(large, 3_000_000_000);
    Ok(())
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_failed_batch_inserts_nothing() -> Result<()> {
    let store = setup_store("neighborhoods_atomic").await?;

    let mut too_long = neighborhood("Pilottown", Some(1));
    too_long.state = "DEL".into();

    let result = store
        .insert(&[neighborhood("Woodbrook", Some(2)), too_long])
        .await;
    assert!(result.is_err());
    assert_eq!(store.count().await?, 0);
    Ok(())
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_prefer_falls_back_to_plain_connection() -> Result<()> {
    // L'image postgis/postgis n'active pas TLS
    let config = DatabaseConfig {
        ssl_mode: SslMode::Prefer,
        ..DatabaseConfig::from_env()
    };
    let pool = connect(&config).await?;
    let client = pool.get().await?;
    let ssl: bool = client
        .query_one("SELECT ssl FROM pg_stat_ssl WHERE pid = pg_backend_pid()", &[])
        .await?
        .get(0);
    assert!(!ssl);
    Ok(())
}

use super::catalog::{CatalogError, CatalogSource};
use crate::models::{PropertyRecord, PropertyType};
use async_trait::async_trait;
use sqlx::mysql::{MySqlPoolOptions, MySqlRow};
use sqlx::{MySqlPool, Row};
use std::time::Duration;

const SELECT_PROPERTIES: &str = r#"
    SELECT
        CAST(id AS SIGNED) AS id,
        CAST(titulo AS CHAR) AS titulo,
        CAST(descripcion AS CHAR) AS descripcion,
        CAST(tipo AS CHAR) AS tipo,
        CAST(precio AS DOUBLE) AS precio,
        CAST(habitaciones AS SIGNED) AS habitaciones,
        CAST(banos AS DOUBLE) AS banos,
        CAST(area_m2 AS DOUBLE) AS area_m2,
        CAST(ubicacion AS CHAR) AS ubicacion,
        DATE_FORMAT(fecha_publicacion, '%Y-%m-%d') AS fecha_publicacion,
        CAST(imagen_url AS CHAR) AS imagen_url
    FROM propiedades
    ORDER BY fecha_publicacion DESC
"#;

/// MySQL reader for the `propiedades` table
pub struct MysqlCatalog {
    pool: MySqlPool,
}

impl MysqlCatalog {
    pub async fn new(database_url: &str, max_connections: u32, acquire_timeout: Duration) -> Result<Self, CatalogError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
    ) -> Result<Self, CatalogError> {
        tracing::info!("Connecting to MySQL listing database");

        Self::new(
            url,
            max_connections.unwrap_or(5),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
        )
        .await
    }

    /// Every listing, newest first
    ///
    /// Rows whose type cannot be recognised are skipped with a warning.
    pub async fn fetch_properties(&self) -> Result<Vec<PropertyRecord>, CatalogError> {
        let rows = sqlx::query(SELECT_PROPERTIES).fetch_all(&self.pool).await?;

        let mut properties = Vec::with_capacity(rows.len());
        for row in &rows {
            match row_to_property(row) {
                Ok(property) => properties.push(property),
                Err(e) => tracing::warn!("Skipping listing row: {}", e),
            }
        }

        tracing::debug!("Loaded {} listings from MySQL", properties.len());
        Ok(properties)
    }

    /// Health check
    pub async fn health_check(&self) -> Result<(), CatalogError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl CatalogSource for MysqlCatalog {
    async fn load_properties(&self) -> Result<Vec<PropertyRecord>, CatalogError> {
        self.fetch_properties().await
    }

    fn name(&self) -> &'static str {
        "database"
    }
}

fn row_to_property(row: &MySqlRow) -> Result<PropertyRecord, CatalogError> {
    let id: i64 = row.try_get("id")?;
    let tipo: Option<String> = row.try_get("tipo")?;
    let property_type = tipo
        .as_deref()
        .and_then(PropertyType::from_word)
        .ok_or_else(|| CatalogError::InvalidFormat(format!("listing {} has unknown type {:?}", id, tipo)))?;

    Ok(PropertyRecord {
        id,
        title: row.try_get::<Option<String>, _>("titulo")?.unwrap_or_default(),
        description: row.try_get::<Option<String>, _>("descripcion")?.unwrap_or_default(),
        property_type,
        price: row.try_get::<Option<f64>, _>("precio")?.unwrap_or(0.0),
        rooms: row
            .try_get::<Option<i64>, _>("habitaciones")?
            .map(|r| r.clamp(0, u32::MAX as i64) as u32)
            .unwrap_or(0),
        bathrooms: row.try_get::<Option<f64>, _>("banos")?.unwrap_or(0.0),
        area_m2: row.try_get::<Option<f64>, _>("area_m2")?.unwrap_or(0.0),
        location: row.try_get::<Option<String>, _>("ubicacion")?.unwrap_or_default(),
        published_on: row.try_get("fecha_publicacion")?,
        image_url: row.try_get("imagen_url")?,
    })
}

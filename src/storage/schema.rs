//! Database schema for harvested vehicle records

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per detail page, keyed by its URL
CREATE TABLE IF NOT EXISTS cars (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    title TEXT,
    price_usd REAL CHECK (price_usd IS NULL OR price_usd >= 0),
    odometer INTEGER CHECK (odometer IS NULL OR odometer >= 0),
    seller_name TEXT,
    phone_number TEXT,
    image_url TEXT,
    image_count INTEGER CHECK (image_count IS NULL OR image_count >= 0),
    plate_number TEXT,
    vin TEXT,
    discovered_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cars_discovered_at ON cars(discovered_at);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

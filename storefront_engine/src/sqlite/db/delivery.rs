use sqlx::SqliteConnection;

use crate::db_types::{DeliveryStation, NewDeliveryStation, NewShippingZone, ShippingZone};

pub async fn fetch_active_stations(conn: &mut SqliteConnection) -> Result<Vec<DeliveryStation>, sqlx::Error> {
    let stations =
        sqlx::query_as("SELECT * FROM delivery_stations WHERE is_active ORDER BY county, name").fetch_all(conn).await?;
    Ok(stations)
}

pub async fn fetch_active_zones(conn: &mut SqliteConnection) -> Result<Vec<ShippingZone>, sqlx::Error> {
    let zones = sqlx::query_as("SELECT * FROM shipping_zones WHERE is_active ORDER BY name").fetch_all(conn).await?;
    Ok(zones)
}

pub async fn fetch_station(id: i64, conn: &mut SqliteConnection) -> Result<Option<DeliveryStation>, sqlx::Error> {
    let station = sqlx::query_as("SELECT * FROM delivery_stations WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(station)
}

pub async fn fetch_zone(id: i64, conn: &mut SqliteConnection) -> Result<Option<ShippingZone>, sqlx::Error> {
    let zone = sqlx::query_as("SELECT * FROM shipping_zones WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(zone)
}

pub async fn insert_station(
    station: NewDeliveryStation,
    conn: &mut SqliteConnection,
) -> Result<DeliveryStation, sqlx::Error> {
    let station = sqlx::query_as(
        r#"
            INSERT INTO delivery_stations (name, county, address, delivery_fee, phone_number)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(station.name)
    .bind(station.county)
    .bind(station.address)
    .bind(station.delivery_fee)
    .bind(station.phone_number)
    .fetch_one(conn)
    .await?;
    Ok(station)
}

pub async fn insert_zone(zone: NewShippingZone, conn: &mut SqliteConnection) -> Result<ShippingZone, sqlx::Error> {
    let zone = sqlx::query_as(
        r#"
            INSERT INTO shipping_zones (name, shipping_cost, estimated_delivery_days)
            VALUES ($1, $2, $3)
            RETURNING *;
        "#,
    )
    .bind(zone.name)
    .bind(zone.shipping_cost)
    .bind(zone.estimated_delivery_days)
    .fetch_one(conn)
    .await?;
    Ok(zone)
}

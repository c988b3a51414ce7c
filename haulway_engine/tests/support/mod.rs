#![allow(dead_code)]
use chrono::{DateTime, Duration, Utc};
use haulway_engine::{
    db_types::{BaggageType, NewDeal, NewParcel, Transport},
    SqliteDatabase,
};
use hw_common::{GeoPoint, Money};
use log::*;
use sqlx::{migrate, migrate::MigrateDatabase, Sqlite};

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    run_migrations(url).await;
}

pub fn random_db_path() -> String {
    let _ = std::fs::create_dir_all("../data");
    format!("sqlite://../data/test_haulway_{}.db", rand::random::<u64>())
}

pub async fn run_migrations(url: &str) {
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    migrate!("./src/sqlite/migrations").run(db.pool()).await.expect("Error running DB migrations");
    info!("🚀️ Migrations complete");
}

pub async fn create_database(url: &str) {
    if let Err(e) = Sqlite::drop_database(url).await {
        warn!("Error dropping database {url}: {e:?}");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    info!("Created Sqlite database {url}");
}

pub fn rome() -> GeoPoint {
    GeoPoint::new(41.9028, 12.4964)
}

pub fn milan() -> GeoPoint {
    GeoPoint::new(45.4642, 9.1900)
}

pub fn naples() -> GeoPoint {
    GeoPoint::new(40.8518, 14.2681)
}

/// A Rome to Milan van deal departing at `start`.
pub fn deal_fixture(transporter_id: &str, start: DateTime<Utc>) -> NewDeal {
    NewDeal {
        transporter_id: transporter_id.to_string(),
        description: Some("Weekly run up the A1".to_string()),
        transport: Transport::Van,
        baggage_types: vec![BaggageType::SmallBox, BaggageType::Suitcase],
        address_from: "Rome".to_string(),
        address_to: "Milan".to_string(),
        location_from: rome(),
        location_to: milan(),
        start_date: start,
        end_date: Some(start + Duration::hours(8)),
    }
}

/// A small parcel waiting in Rome, bound for Milan.
pub fn parcel_fixture(client_id: &str) -> NewParcel {
    NewParcel {
        client_id: client_id.to_string(),
        description: Some("Box of books".to_string()),
        baggage_types: vec![BaggageType::SmallBox],
        address_from: "Rome".to_string(),
        address_to: "Milan".to_string(),
        location_from: rome(),
        location_to: milan(),
        departure_date: Utc::now() + Duration::days(2),
        declared_value: Money::from_units(45),
    }
}

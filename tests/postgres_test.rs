//! Integration tests against a live PostgreSQL server.
//!
//! Set TEST_POSTGRES_URL (e.g. `postgres://user:pw@localhost/db`) to run them.

use db_query_gateway::db::Registry;
use db_query_gateway::models::DatabaseDescriptor;

fn postgres_registry() -> Option<Registry> {
    let url = match std::env::var("TEST_POSTGRES_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: TEST_POSTGRES_URL not set");
            return None;
        }
    };
    let mut registry = Registry::new();
    registry
        .add_database(&DatabaseDescriptor::parse(&url).unwrap())
        .unwrap();
    Some(registry)
}

#[tokio::test]
async fn test_postgres_unmapped_types_render_as_text() {
    let Some(registry) = postgres_registry() else {
        return;
    };

    let rows = registry
        .execute(
            0,
            "SELECT INTERVAL '1 day 2 hours' AS span, \
                    TIMETZ '10:30:00+02' AS at, \
                    INET '10.0.0.1/8' AS net, \
                    ARRAY[1, 2, 3] AS nums, \
                    'pg_class'::regclass::oid AS class_oid, \
                    NULL::interval AS missing",
        )
        .await
        .unwrap();

    let row = &rows[0];
    assert_eq!(row["span"], "1 day 02:00:00");
    assert_eq!(row["at"], "10:30:00+02");
    assert_eq!(row["net"], "10.0.0.1/8");
    assert_eq!(row["nums"], "{1,2,3}");
    assert_eq!(row["class_oid"], "1259");
    assert!(row["missing"].is_null());

    registry.close_all().await;
}

#[tokio::test]
async fn test_postgres_enum_renders_label() {
    let Some(registry) = postgres_registry() else {
        return;
    };

    registry
        .execute(0, "DROP TYPE IF EXISTS gateway_mood")
        .await
        .unwrap();
    registry
        .execute(0, "CREATE TYPE gateway_mood AS ENUM ('sad', 'happy')")
        .await
        .unwrap();
    let rows = registry
        .execute(0, "SELECT 'happy'::gateway_mood AS mood")
        .await
        .unwrap();
    assert_eq!(rows[0]["mood"], "happy");

    registry
        .execute(0, "DROP TYPE gateway_mood")
        .await
        .unwrap();
    registry.close_all().await;
}

use std::collections::HashMap;

use cypher_bolt::bolt::{connected_to, current_route, ModelRouting, PoolRegistry, RouteContext, Router};
use cypher_bolt::config::{DriverConfig, EndpointConfig};

fn test_config() -> DriverConfig {
    let mut endpoints = HashMap::new();
    endpoints.insert(
        "primary".to_string(),
        EndpointConfig {
            adapter: "bolt".to_string(),
            host: "127.0.0.1".to_string(),
            port: 7687,
            username: None,
            password: None,
            database: None,
            ssl: false,
            ssc: false,
            options: HashMap::new(),
        },
    );
    DriverConfig::from_map(endpoints)
}

#[test]
fn router_resolves_a_routed_pool_for_the_active_connected_to_scope() {
    let routing = ModelRouting::new().route("writing", "primary");
    let router = Router::new(PoolRegistry::new(), test_config(), 4);

    assert_eq!(current_route(), RouteContext::default());
    let pool = router.pool_for(&routing).unwrap();
    assert_eq!(pool.max_size(), 4);
}

#[tokio::test]
async fn unmapped_db_key_surfaces_unknown_db_key() {
    let routing = ModelRouting::new(); // no routes at all
    let router = Router::new(PoolRegistry::new(), test_config(), 4);

    connected_to("writing", "default", async {
        let err = router.pool_for(&routing).unwrap_err();
        assert!(matches!(err, cypher_bolt::Error::UnknownDbKey(_)));
    })
    .await;
}

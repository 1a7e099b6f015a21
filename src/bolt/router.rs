//! Logical `(role, shard)` -> physical pool routing (§4.9 Router, C10).
//!
//! The task-local `connected_to` stack mirrors the pack's `QueryContext`
//! pattern (`genezhang-clickgraph/src/server/query_context.rs`:
//! `tokio::task_local!` + `RefCell` + `.scope()`), generalized from "one
//! scope per request" to "a stack of scopes per nested `connected_to` call",
//! since routing context can nest (§4.9).

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use crate::bolt::pool::Pool;
use crate::config::DriverConfig;
use crate::error::Error;
use crate::url::Endpoint;
use crate::Result;

/// A logical role (`writing`, `reading`, or a collaborator-defined name) and
/// an optional shard within it (§3 Router, §4.9).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteContext {
    pub role: String,
    pub shard: String,
}

impl Default for RouteContext {
    fn default() -> Self {
        Self { role: "writing".to_string(), shard: "default".to_string() }
    }
}

tokio::task_local! {
    static ROUTE_STACK: RefCell<Vec<RouteContext>>;
}

/// Push `(role, shard)` onto the current task's routing stack for the
/// duration of `body`, restoring whatever was there before on every exit
/// path — normal return, panic unwind, or the future being dropped under
/// cancellation (§4.9, §5).
pub async fn connected_to<F, R>(role: impl Into<String>, shard: impl Into<String>, body: F) -> R
where
    F: Future<Output = R>,
{
    let ctx = RouteContext { role: role.into(), shard: shard.into() };
    match ROUTE_STACK.try_with(|stack| stack.borrow_mut().push(ctx.clone())) {
        Ok(()) => {
            let _guard = PopOnDrop;
            body.await
        }
        Err(_) => ROUTE_STACK.scope(RefCell::new(vec![ctx]), async move {
            let _guard = PopOnDrop;
            body.await
        }).await,
    }
}

/// Pops exactly one frame off `ROUTE_STACK` when dropped, regardless of
/// whether the enclosing future ran to completion, panicked, or was
/// cancelled mid-poll (§5 `connected_to` "restoring on every exit path").
struct PopOnDrop;

impl Drop for PopOnDrop {
    fn drop(&mut self) {
        let _ = ROUTE_STACK.try_with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// The current task's `(role, shard)`, defaulting to `(writing, default)`
/// when no `connected_to` scope is active (§4.9 step 1).
pub fn current_route() -> RouteContext {
    ROUTE_STACK
        .try_with(|stack| stack.borrow().last().cloned())
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// A `role -> db_key` mapping, or a `role -> { shard -> db_key }` mapping
/// with an optional `default` shard fallback (§3 Router `role_map`).
#[derive(Debug, Clone)]
pub enum RoleTarget {
    Direct(String),
    Sharded(HashMap<String, String>),
}

/// An immutable routing descriptor owned by a collaborator (a model class in
/// the external OGM), passed by value into the `Router` rather than kept as
/// process-wide class state (§9 Design Notes).
#[derive(Debug, Clone, Default)]
pub struct ModelRouting {
    pub role_map: HashMap<String, RoleTarget>,
}

impl ModelRouting {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, role: impl Into<String>, db_key: impl Into<String>) -> Self {
        self.role_map.insert(role.into(), RoleTarget::Direct(db_key.into()));
        self
    }

    pub fn shard(mut self, role: impl Into<String>, shard: impl Into<String>, db_key: impl Into<String>) -> Self {
        let role = role.into();
        match self.role_map.entry(role).or_insert_with(|| RoleTarget::Sharded(HashMap::new())) {
            RoleTarget::Sharded(map) => {
                map.insert(shard.into(), db_key.into());
            }
            RoleTarget::Direct(_) => {}
        }
        self
    }

    /// Resolve `(role, shard)` to a `db_key` with the fallback chain from
    /// §4.9 step 2: direct role mapping; else shard-table lookup with a
    /// `default` shard fallback for an unknown shard; else fall back to the
    /// `writing` role's mapping.
    fn resolve(&self, route: &RouteContext) -> Option<String> {
        if let Some(key) = self.resolve_role(&route.role, &route.shard) {
            return Some(key);
        }
        if route.role != "writing" {
            return self.resolve_role("writing", &route.shard);
        }
        None
    }

    fn resolve_role(&self, role: &str, shard: &str) -> Option<String> {
        match self.role_map.get(role)? {
            RoleTarget::Direct(db_key) => Some(db_key.clone()),
            RoleTarget::Sharded(map) => map.get(shard).or_else(|| map.get("default")).cloned(),
        }
    }
}

/// Process-wide `db_key -> Pool` registry. Mutation is insert-only: once a
/// pool exists for a `db_key` it is never replaced or removed (§3 Router,
/// §5 "mutation is guarded and may only add pools, never mutate an existing
/// one").
#[derive(Clone, Default)]
pub struct PoolRegistry {
    pools: Arc<RwLock<HashMap<String, Pool>>>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the pool for `db_key`, creating it on first use from `config`.
    pub fn get_or_create(&self, db_key: &str, config: &DriverConfig, default_pool_size: usize) -> Result<Pool> {
        if let Some(pool) = self.pools.read().expect("pool registry lock poisoned").get(db_key) {
            return Ok(pool.clone());
        }
        let endpoint_cfg = config.for_key(db_key)?.ok_or_else(|| Error::UnknownDbKey(db_key.to_string()))?;
        let endpoint = Endpoint {
            family: if endpoint_cfg.adapter.eq_ignore_ascii_case("memgraph") {
                crate::url::Family::Memgraph
            } else {
                crate::url::Family::Neo4j
            },
            host: endpoint_cfg.host.clone(),
            port: endpoint_cfg.port,
            username: endpoint_cfg.username.clone(),
            password: endpoint_cfg.password.clone(),
            database: endpoint_cfg.database.clone(),
            secure: endpoint_cfg.secure(),
            verify_cert: endpoint_cfg.verify_cert(),
            options: endpoint_cfg.options.clone(),
        };
        let pool = Pool::new(endpoint, "cypher-bolt-rs", default_pool_size);

        let mut pools = self.pools.write().expect("pool registry lock poisoned");
        Ok(pools.entry(db_key.to_string()).or_insert(pool).clone())
    }
}

/// Maps a collaborator's [`ModelRouting`] onto the process-wide pool
/// registry, resolving the ambient `connected_to` context at lookup time
/// (§4.9).
pub struct Router {
    registry: PoolRegistry,
    config: DriverConfig,
    default_pool_size: usize,
}

impl Router {
    pub fn new(registry: PoolRegistry, config: DriverConfig, default_pool_size: usize) -> Self {
        Self { registry, config, default_pool_size }
    }

    /// Resolve the pool for `routing` under the currently active
    /// `connected_to` scope (§4.9 steps 1-3).
    pub fn pool_for(&self, routing: &ModelRouting) -> Result<Pool> {
        let route = current_route();
        let db_key = routing
            .resolve(&route)
            .ok_or_else(|| Error::UnknownDbKey(format!("{}/{}", route.role, route.shard)))?;
        self.registry.get_or_create(&db_key, &self.config, self.default_pool_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn direct_role_resolves() {
        let routing = ModelRouting::new().route("writing", "primary");
        let route = RouteContext { role: "writing".into(), shard: "default".into() };
        assert_eq!(routing.resolve(&route), Some("primary".to_string()));
    }

    #[test]
    fn unmapped_role_falls_back_to_writing() {
        let routing = ModelRouting::new().route("writing", "primary");
        let route = RouteContext { role: "reading".into(), shard: "default".into() };
        assert_eq!(routing.resolve(&route), Some("primary".to_string()));
    }

    #[test]
    fn unknown_shard_falls_back_to_default_shard() {
        let routing = ModelRouting::new().shard("writing", "default", "shard0").shard("writing", "eu", "shard1");
        let route = RouteContext { role: "writing".into(), shard: "unknown".into() };
        assert_eq!(routing.resolve(&route), Some("shard0".to_string()));
    }

    #[tokio::test]
    async fn connected_to_nests_and_restores() {
        assert_eq!(current_route(), RouteContext::default());
        connected_to("reading", "eu", async {
            assert_eq!(current_route(), RouteContext { role: "reading".into(), shard: "eu".into() });
            connected_to("writing", "us", async {
                assert_eq!(current_route(), RouteContext { role: "writing".into(), shard: "us".into() });
            })
            .await;
            assert_eq!(current_route(), RouteContext { role: "reading".into(), shard: "eu".into() });
        })
        .await;
        assert_eq!(current_route(), RouteContext::default());
    }

    #[tokio::test]
    async fn connected_to_restores_when_the_body_future_is_dropped_mid_poll() {
        connected_to("writing", "default", async {
            assert_eq!(current_route(), RouteContext::default());
            let inner = connected_to("reading", "eu", std::future::pending::<()>());
            tokio::select! {
                _ = inner => unreachable!("pending future never completes"),
                _ = tokio::time::sleep(Duration::from_millis(1)) => {}
            }
            assert_eq!(current_route(), RouteContext::default());
        })
        .await;
    }
}

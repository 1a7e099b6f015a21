//! User-facing `execute`/`reset`/`transaction` surface (§4.10 Session /
//! Adapter, C11).
//!
//! A `Session` owns one `Connection` borrowed from the router-selected pool
//! for its whole lifetime — not a fresh borrow per call — so that a FAILURE
//! on one `execute` is recoverable by the next `execute` on the *same*
//! session via RESET (§8 scenario 6), rather than silently masked by always
//! handing back a different connection.

use std::time::{Duration, Instant};

use indexmap::IndexMap;
use tokio::sync::Mutex;

use crate::bolt::connection::ConnectionState;
use crate::bolt::pool::Checkout;
use crate::bolt::router::{ModelRouting, Router};
use crate::bolt::telemetry;
use crate::error::Error;
use crate::qb::value::{NodeRef, PathRef, RelationshipRef, Value};
use crate::Result;

/// A decoded result row, positionally aligned with [`Rows::fields`].
#[derive(Debug, Clone, Default)]
pub struct Row {
    pub values: Vec<Value>,
}

impl Row {
    /// Look up a value by column name (§3 `Rows`/`Row`).
    pub fn get<'a>(&'a self, fields: &[String], name: &str) -> Option<&'a Value> {
        let idx = fields.iter().position(|f| f == name)?;
        self.values.get(idx)
    }
}

/// The decoded result of `Session::execute`: column names plus the rows,
/// modeled after the teacher's `QueryResult`/`ResultRow` pair.
#[derive(Debug, Clone, Default)]
pub struct Rows {
    pub fields: Vec<String>,
    pub rows: Vec<Row>,
}

impl Rows {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn decode_record(fields: &[String], values: Vec<Value>) -> Row {
    let _ = fields;
    Row { values }
}

/// A live session bound to one connection, obtained from [`Router::session`]
/// (§1 `connection(role, shard) -> Session`).
pub struct Session {
    pool: crate::bolt::pool::Pool,
    acquire_timeout: Duration,
    checkout: Mutex<Option<Checkout>>,
}

impl Session {
    pub(crate) fn new(pool: crate::bolt::pool::Pool, acquire_timeout: Duration) -> Self {
        Self { pool, acquire_timeout, checkout: Mutex::new(None) }
    }

    async fn ensure_connection<'a>(&self, slot: &'a mut Option<Checkout>) -> Result<&'a mut Checkout> {
        if slot.is_none() {
            *slot = Some(self.pool.acquire(self.acquire_timeout).await?);
        }
        let checkout = slot.as_mut().expect("just populated");
        if checkout.get().state == ConnectionState::Failed {
            let started = Instant::now();
            let result = checkout.get_mut().reset().await;
            telemetry::connection_reset(started.elapsed(), result.is_ok());
            result?;
        }
        Ok(checkout)
    }

    /// Run `cypher` with `parameters`, streaming all records before
    /// returning (§4.10 `execute`).
    pub async fn execute(&self, cypher: &str, parameters: IndexMap<String, Value>, context: &str) -> Result<Rows> {
        let mut slot = self.checkout.lock().await;
        let started = Instant::now();
        telemetry::query_start(cypher, context, &parameters);

        let checkout = self.ensure_connection(&mut slot).await?;
        let conn = checkout.get_mut();
        let run_meta = conn.run(cypher, parameters, IndexMap::new()).await?;
        let fields = match run_meta.get("fields") {
            Some(Value::List(items)) => items
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };

        let mut rows = Vec::new();
        loop {
            let (records, meta) = conn.pull(1000, None).await?;
            rows.extend(records.into_iter().map(|r| decode_record(&fields, r)));
            let has_more = matches!(meta.get("has_more"), Some(Value::Bool(true)));
            if !has_more {
                break;
            }
        }

        telemetry::query_end(context, started.elapsed(), rows.len());
        Ok(Rows { fields, rows })
    }

    /// RESET the session's connection regardless of its current state.
    /// Idempotent: a repeated call on an already-`Ready` connection
    /// succeeds (§8 Reset idempotence).
    pub async fn reset(&self) -> Result<bool> {
        let mut slot = self.checkout.lock().await;
        let Some(checkout) = slot.as_mut() else {
            return Ok(false);
        };
        let started = Instant::now();
        let result = checkout.get_mut().reset().await;
        telemetry::connection_reset(started.elapsed(), result.is_ok());
        Ok(result.is_ok())
    }

    /// `BEGIN`, run `work` against a [`TxSession`], then `COMMIT` on normal
    /// return or `ROLLBACK` on error (§4.10 `transaction`).
    pub async fn transaction<F, Fut, T>(&self, work: F) -> Result<T>
    where
        F: FnOnce(TxSession<'_>) -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut slot = self.checkout.lock().await;
        let checkout = self.ensure_connection(&mut slot).await?;
        checkout.get_mut().begin(IndexMap::new()).await?;

        let tx = TxSession { checkout };
        let outcome = work(tx).await;

        let checkout = slot.as_mut().expect("populated by ensure_connection above");
        match outcome {
            Ok(value) => {
                if checkout.get().state == ConnectionState::TxReady {
                    checkout.get_mut().commit().await?;
                    Ok(value)
                } else {
                    Err(Error::TransactionAborted("connection left the transaction mid-flight".into()))
                }
            }
            Err(e) => {
                if checkout.get().state == ConnectionState::TxReady {
                    checkout.get_mut().rollback().await.ok();
                    Err(e)
                } else {
                    Err(Error::TransactionAborted(e.to_string()))
                }
            }
        }
    }

    /// Refuse to run unless `confirm == "yes, really"`. Repeatedly
    /// `DETACH DELETE`s up to `batch` entities at a time until a batch
    /// deletes nothing (§4.10 `wipe_database`).
    pub async fn wipe_database(&self, confirm: &str, batch: i64) -> Result<u64> {
        if confirm != "yes, really" {
            return Err(Error::ProtocolViolation(
                "wipe_database refused: pass confirm=\"yes, really\"".into(),
            ));
        }
        let cypher = format!("MATCH (n) WITH n LIMIT {batch} DETACH DELETE n RETURN count(n) AS deleted");
        let mut total = 0u64;
        loop {
            let result = self.execute(&cypher, IndexMap::new(), "WipeDB").await?;
            let deleted = result
                .rows
                .first()
                .and_then(|r| r.get(&result.fields, "deleted"))
                .and_then(|v| match v {
                    Value::Int(n) => Some(*n as u64),
                    _ => None,
                })
                .unwrap_or(0);
            telemetry::wipe_db_batch(deleted);
            total += deleted;
            if deleted == 0 {
                break;
            }
        }
        Ok(total)
    }
}

/// A connection scoped to one open transaction; the only surface a
/// `transaction` closure sees (§4.10).
pub struct TxSession<'a> {
    checkout: &'a mut Checkout,
}

impl TxSession<'_> {
    pub async fn execute(&mut self, cypher: &str, parameters: IndexMap<String, Value>) -> Result<Rows> {
        let conn = self.checkout.get_mut();
        let run_meta = conn.run(cypher, parameters, IndexMap::new()).await?;
        let fields: Vec<String> = match run_meta.get("fields") {
            Some(Value::List(items)) => items
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        let mut rows = Vec::new();
        loop {
            let (records, meta) = conn.pull(1000, None).await?;
            rows.extend(records.into_iter().map(|r| decode_record(&fields, r)));
            if !matches!(meta.get("has_more"), Some(Value::Bool(true))) {
                break;
            }
        }
        Ok(Rows { fields, rows })
    }
}

/// A connection bound to a `Router` via a [`ModelRouting`] descriptor —
/// constructed once per collaborator (e.g. once per OGM model class) and
/// used to open [`Session`]s (§1, §4.9).
pub struct RoutedConnection<'r> {
    router: &'r Router,
    routing: ModelRouting,
    acquire_timeout: Duration,
}

impl<'r> RoutedConnection<'r> {
    pub fn new(router: &'r Router, routing: ModelRouting) -> Self {
        Self { router, routing, acquire_timeout: Duration::from_secs(10) }
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// `connection(role, shard) -> Session` (§1): resolve the pool for the
    /// currently active `connected_to` context and hand back a fresh
    /// `Session` bound to it.
    pub fn session(&self) -> Result<Session> {
        let pool = self.router.pool_for(&self.routing)?;
        Ok(Session::new(pool, self.acquire_timeout))
    }
}

/// Re-hydrate a `NodeRef`/`RelationshipRef`/`PathRef` out of a generic
/// decoded `Value`, for callers that stored rows generically. Provided for
/// parity with the teacher's `Row::get::<Node>` pattern in `lib.rs`'s doc
/// example.
pub fn as_node(value: &Value) -> Option<&NodeRef> {
    match value {
        Value::Node(n) => Some(n),
        _ => None,
    }
}

pub fn as_relationship(value: &Value) -> Option<&RelationshipRef> {
    match value {
        Value::Relationship(r) => Some(r),
        _ => None,
    }
}

pub fn as_path(value: &Value) -> Option<&PathRef> {
    match value {
        Value::Path(p) => Some(p),
        _ => None,
    }
}

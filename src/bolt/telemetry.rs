//! Instrumentation events and secret redaction (§4.10 Redaction, C12/C16).
//!
//! Boundary crossings emit `tracing` spans/events rather than a bespoke
//! pub/sub bus, per the teacher's `tracing = "0.1"` dependency. This module
//! holds the one piece of logic that needs to run before anything reaches a
//! span field or a `Debug` string: recursive key-based redaction.

use std::collections::HashMap;
use std::time::Duration;

use indexmap::IndexMap;

use crate::qb::value::Value;

const MASK: &str = "[REDACTED]";

/// Keys whose values must never reach an instrumentation payload or an
/// `inspect`/`Debug` string unredacted (§4.10).
fn is_sensitive_key(key: &str) -> bool {
    matches!(
        key,
        "password" | "credentials" | "token" | "api_key" | "secret" | "auth_token.credentials"
    )
}

/// Recursively mask sensitive keys in a parameter/metadata map, descending
/// through nested maps and lists (§4.10).
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Map(map) => Value::Map(
            map.iter()
                .map(|(k, v)| {
                    if is_sensitive_key(k) {
                        (k.clone(), Value::String(MASK.to_string()))
                    } else {
                        (k.clone(), redact(v))
                    }
                })
                .collect(),
        ),
        Value::List(items) => Value::List(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

/// Redact a flat key/value auth map (e.g. HELLO's `credentials` field)
/// before it's attached to a span or logged.
pub fn redact_auth(auth: &HashMap<String, Value>) -> HashMap<String, Value> {
    auth.iter()
        .map(|(k, v)| {
            if is_sensitive_key(k) {
                (k.clone(), Value::String(MASK.to_string()))
            } else {
                (k.clone(), v.clone())
            }
        })
        .collect()
}

/// Emitted at `Session::execute`'s start (§4.10 step 2). `parameters` is
/// redacted before it reaches the span, since a caller-supplied parameter
/// map is exactly the kind of structured, key-addressable payload §4.10
/// requires masking.
pub fn query_start(cypher: &str, context: &str, parameters: &IndexMap<String, Value>) {
    let redacted = redact(&Value::Map(parameters.clone()));
    tracing::debug!(target: "cypher_bolt::query", cypher, context, parameters = ?redacted, "query.start");
}

/// Emitted by `Connection::hello` (§4.7 HELLO/LOGON). The auth map carries
/// `credentials`/`password`/`token` fields that must never reach a span or
/// `Debug` string unredacted (§4.10).
pub fn connection_hello(user_agent: &str, auth: &HashMap<String, Value>) {
    let redacted = redact_auth(auth);
    tracing::debug!(target: "cypher_bolt::connection", user_agent, auth = ?redacted, "connection.hello");
}

/// Emitted at `Session::execute`'s end (§4.10 step 4).
pub fn query_end(context: &str, duration: Duration, row_count: usize) {
    tracing::debug!(
        target: "cypher_bolt::query",
        context,
        duration_ms = duration.as_millis() as u64,
        row_count,
        "query.end"
    );
}

/// Emitted by `Connection::reset` (§4.7).
pub fn connection_reset(duration: Duration, ok: bool) {
    tracing::debug!(
        target: "cypher_bolt::connection",
        duration_ms = duration.as_millis() as u64,
        ok,
        "connection.reset"
    );
}

/// Emitted once per `WipeDB` call and once per batch within it (§4.10
/// `wipe_database`).
pub fn wipe_db_batch(deleted: u64) {
    tracing::info!(target: "cypher_bolt::wipe_db", deleted, "wipe_db.batch_delete");
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn redacts_top_level_password() {
        let mut map = IndexMap::new();
        map.insert("password".to_string(), Value::String("hunter2".into()));
        map.insert("host".to_string(), Value::String("localhost".into()));
        let redacted = redact(&Value::Map(map));
        match redacted {
            Value::Map(m) => {
                assert_eq!(m.get("password"), Some(&Value::String(MASK.to_string())));
                assert_eq!(m.get("host"), Some(&Value::String("localhost".into())));
            }
            _ => panic!("expected map"),
        }
    }

    #[test]
    fn redacts_recursively_through_nested_maps_and_lists() {
        let mut inner = IndexMap::new();
        inner.insert("token".to_string(), Value::String("abc".into()));
        let mut outer = IndexMap::new();
        outer.insert("auth".to_string(), Value::Map(inner));
        outer.insert("tags".to_string(), Value::List(vec![Value::map([("secret", Value::String("x".into()))])]));
        let redacted = redact(&Value::Map(outer));
        let Value::Map(outer) = redacted else { panic!() };
        let Some(Value::Map(inner)) = outer.get("auth") else { panic!() };
        assert_eq!(inner.get("token"), Some(&Value::String(MASK.to_string())));
        let Some(Value::List(tags)) = outer.get("tags") else { panic!() };
        let Value::Map(tag0) = &tags[0] else { panic!() };
        assert_eq!(tag0.get("secret"), Some(&Value::String(MASK.to_string())));
    }

    #[test]
    fn redact_auth_masks_credentials_but_leaves_scheme_and_principal() {
        let mut auth = HashMap::new();
        auth.insert("scheme".to_string(), Value::String("basic".into()));
        auth.insert("principal".to_string(), Value::String("neo4j".into()));
        auth.insert("credentials".to_string(), Value::String("hunter2".into()));
        let redacted = redact_auth(&auth);
        assert_eq!(redacted.get("scheme"), Some(&Value::String("basic".into())));
        assert_eq!(redacted.get("principal"), Some(&Value::String("neo4j".into())));
        assert_eq!(redacted.get("credentials"), Some(&Value::String(MASK.to_string())));
    }

    /// `query_start`/`connection_hello` redact before the value ever reaches
    /// `tracing` (§4.10): exercised here against a real map containing a
    /// `password` parameter, since a regression would only show up as a
    /// leaked secret in a log line, not a panic.
    #[test]
    fn query_start_and_connection_hello_redact_before_emitting() {
        let mut params = IndexMap::new();
        params.insert("password".to_string(), Value::String("hunter2".into()));
        assert_eq!(redact(&Value::Map(params.clone())), {
            let mut expected = IndexMap::new();
            expected.insert("password".to_string(), Value::String(MASK.to_string()));
            Value::Map(expected)
        });
        query_start("RETURN 1", "test", &params);

        let mut auth = HashMap::new();
        auth.insert("credentials".to_string(), Value::String("hunter2".into()));
        connection_hello("cypher-bolt-rs/test", &auth);
    }
}

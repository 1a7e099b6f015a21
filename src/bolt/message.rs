//! Bolt message signatures and the wire-level `Message` envelope.
//!
//! Signature bytes and the `HELLO`/`RUN`/`PULL`/... constructors mirror
//! `genezhang-clickgraph`'s `bolt_protocol::messages` module, retargeted from
//! its `serde_json::Value` field type to this crate's own `Value`.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::qb::value::Value;

pub mod signatures {
    pub const HELLO: u8 = 0x01;
    pub const GOODBYE: u8 = 0x02;
    pub const LOGON: u8 = 0x6A;
    pub const LOGOFF: u8 = 0x6B;
    pub const RESET: u8 = 0x0F;
    pub const RUN: u8 = 0x10;
    pub const DISCARD: u8 = 0x2F;
    pub const PULL: u8 = 0x3F;
    pub const BEGIN: u8 = 0x11;
    pub const COMMIT: u8 = 0x12;
    pub const ROLLBACK: u8 = 0x13;
    pub const ROUTE: u8 = 0x66;
    pub const SUCCESS: u8 = 0x70;
    pub const RECORD: u8 = 0x71;
    pub const IGNORED: u8 = 0x7E;
    pub const FAILURE: u8 = 0x7F;
}

/// A decoded or to-be-sent Bolt message: a PackStream structure tagged with
/// one of the `signatures` bytes.
#[derive(Debug, Clone)]
pub struct Message {
    pub signature: u8,
    pub fields: Vec<Value>,
}

impl Message {
    pub fn new(signature: u8, fields: Vec<Value>) -> Self {
        Self { signature, fields }
    }

    pub fn hello(user_agent: &str, auth: HashMap<String, Value>) -> Self {
        let mut extra: IndexMap<String, Value> = IndexMap::new();
        extra.insert("user_agent".into(), Value::String(user_agent.to_owned()));
        for (k, v) in auth {
            extra.insert(k, v);
        }
        Message::new(signatures::HELLO, vec![Value::Map(extra)])
    }

    pub fn logon(auth: HashMap<String, Value>) -> Self {
        Message::new(signatures::LOGON, vec![Value::Map(auth.into_iter().collect())])
    }

    pub fn logoff() -> Self {
        Message::new(signatures::LOGOFF, vec![])
    }

    pub fn goodbye() -> Self {
        Message::new(signatures::GOODBYE, vec![])
    }

    pub fn reset() -> Self {
        Message::new(signatures::RESET, vec![])
    }

    pub fn run(query: &str, parameters: IndexMap<String, Value>, extra: IndexMap<String, Value>) -> Self {
        Message::new(
            signatures::RUN,
            vec![Value::String(query.to_owned()), Value::Map(parameters), Value::Map(extra)],
        )
    }

    pub fn pull(n: i64, qid: Option<i64>) -> Self {
        let mut extra = IndexMap::new();
        extra.insert("n".to_string(), Value::Int(n));
        if let Some(qid) = qid {
            extra.insert("qid".to_string(), Value::Int(qid));
        }
        Message::new(signatures::PULL, vec![Value::Map(extra)])
    }

    pub fn discard(n: i64, qid: Option<i64>) -> Self {
        let mut extra = IndexMap::new();
        extra.insert("n".to_string(), Value::Int(n));
        if let Some(qid) = qid {
            extra.insert("qid".to_string(), Value::Int(qid));
        }
        Message::new(signatures::DISCARD, vec![Value::Map(extra)])
    }

    pub fn begin(extra: IndexMap<String, Value>) -> Self {
        Message::new(signatures::BEGIN, vec![Value::Map(extra)])
    }

    pub fn commit() -> Self {
        Message::new(signatures::COMMIT, vec![])
    }

    pub fn rollback() -> Self {
        Message::new(signatures::ROLLBACK, vec![])
    }

    pub fn is_success(&self) -> bool {
        self.signature == signatures::SUCCESS
    }

    pub fn is_failure(&self) -> bool {
        self.signature == signatures::FAILURE
    }

    pub fn is_record(&self) -> bool {
        self.signature == signatures::RECORD
    }

    pub fn is_ignored(&self) -> bool {
        self.signature == signatures::IGNORED
    }

    /// The metadata map carried by a SUCCESS/FAILURE message, if any.
    pub fn metadata(&self) -> IndexMap<String, Value> {
        match self.fields.first() {
            Some(Value::Map(m)) => m.clone(),
            _ => IndexMap::new(),
        }
    }

    /// The record values carried by a RECORD message.
    pub fn record_values(&self) -> Vec<Value> {
        match self.fields.first() {
            Some(Value::List(items)) => items.clone(),
            _ => Vec::new(),
        }
    }
}

//! PackStream binary encoding (§4.6 / C6).
//!
//! Markers follow the standard Bolt PackStream layout: tiny values are
//! packed into the marker byte itself, wider values use an explicit marker
//! plus a size-appropriate length prefix, and compound graph types (Node,
//! Relationship, Path) are PackStream structures tagged with a one-byte
//! signature. Grounded in the wire layout implemented by
//! `genezhang-clickgraph`'s `bolt_protocol` module (structure marker
//! `0xB0..=0xBF` + signature byte, `packstream::to_bytes` per field) and by
//! the handshake/message encoding in the `robsdedude` Neo4j driver port.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use indexmap::IndexMap;

use crate::error::Error;
use crate::qb::value::{
    DateValue, DurationValue, NodeRef, PathRef, Point2DValue, Point3DValue, RelationshipRef, UnboundRelationshipRef,
    Value,
};
use crate::Result;

/// Nested container depth bound (list/map/structure), to keep a hostile
/// input from growing the decoder's call stack unbounded (§4.5).
const MAX_DEPTH: usize = 32;

mod marker {
    pub const NULL: u8 = 0xC0;
    pub const FALSE: u8 = 0xC2;
    pub const TRUE: u8 = 0xC3;
    pub const FLOAT: u8 = 0xC1;
    pub const INT_8: u8 = 0xC8;
    pub const INT_16: u8 = 0xC9;
    pub const INT_32: u8 = 0xCA;
    pub const INT_64: u8 = 0xCB;
    pub const BYTES_8: u8 = 0xCC;
    pub const BYTES_16: u8 = 0xCD;
    pub const BYTES_32: u8 = 0xCE;
    pub const STRING_8: u8 = 0xD0;
    pub const STRING_16: u8 = 0xD1;
    pub const STRING_32: u8 = 0xD2;
    pub const LIST_8: u8 = 0xD4;
    pub const LIST_16: u8 = 0xD5;
    pub const LIST_32: u8 = 0xD6;
    pub const MAP_8: u8 = 0xD8;
    pub const MAP_16: u8 = 0xD9;
    pub const MAP_32: u8 = 0xDA;
    pub const TINY_STRING: u8 = 0x80;
    pub const TINY_LIST: u8 = 0x90;
    pub const TINY_MAP: u8 = 0xA0;
    pub const TINY_STRUCT: u8 = 0xB0;
}

mod tag {
    pub const NODE: u8 = b'N';
    pub const RELATIONSHIP: u8 = b'R';
    pub const UNBOUND_RELATIONSHIP: u8 = b'r';
    pub const PATH: u8 = b'P';
    pub const DATE: u8 = b'D';
    pub const DATE_TIME: u8 = b'I';
    pub const DATE_TIME_LEGACY: u8 = b'F';
    pub const DURATION: u8 = b'E';
    pub const POINT_2D: u8 = b'X';
    pub const POINT_3D: u8 = b'Y';
}

/// Encode a single value, appending its bytes to `out`.
pub fn encode(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.push(marker::NULL),
        Value::Bool(false) => out.push(marker::FALSE),
        Value::Bool(true) => out.push(marker::TRUE),
        Value::Int(n) => encode_int(*n, out),
        Value::Float(f) => {
            out.push(marker::FLOAT);
            out.extend_from_slice(&f.to_be_bytes());
        }
        Value::Bytes(b) => encode_sized(b.len(), marker::BYTES_8, marker::BYTES_16, marker::BYTES_32, out, |out| {
            out.extend_from_slice(b);
        }),
        Value::String(s) => encode_string(s, out),
        Value::List(items) => {
            encode_len_marker(items.len(), marker::TINY_LIST, marker::LIST_8, marker::LIST_16, marker::LIST_32, out);
            for item in items {
                encode(item, out);
            }
        }
        Value::Map(map) => {
            encode_len_marker(map.len(), marker::TINY_MAP, marker::MAP_8, marker::MAP_16, marker::MAP_32, out);
            for (k, v) in map {
                encode_string(k, out);
                encode(v, out);
            }
        }
        Value::Node(n) => encode_node(n, out),
        Value::Relationship(r) => encode_relationship(r, out),
        Value::UnboundRelationship(r) => encode_unbound_relationship(r, out),
        Value::Path(p) => encode_path(p, out),
        Value::DateTime(dt) => encode_datetime(*dt, out),
        Value::Date(d) => encode_date(*d, out),
        Value::Duration(d) => encode_duration(*d, out),
        Value::Point2D(p) => encode_point2d(*p, out),
        Value::Point3D(p) => encode_point3d(*p, out),
    }
}

/// Encode a full value to an owned buffer.
pub fn to_bytes(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    encode(value, &mut out);
    out
}

fn encode_int(n: i64, out: &mut Vec<u8>) {
    if (-16..=127).contains(&n) {
        out.push(n as i8 as u8);
    } else if (-128..=127).contains(&n) {
        out.push(marker::INT_8);
        out.push(n as i8 as u8);
    } else if (i16::MIN as i64..=i16::MAX as i64).contains(&n) {
        out.push(marker::INT_16);
        out.extend_from_slice(&(n as i16).to_be_bytes());
    } else if (i32::MIN as i64..=i32::MAX as i64).contains(&n) {
        out.push(marker::INT_32);
        out.extend_from_slice(&(n as i32).to_be_bytes());
    } else {
        out.push(marker::INT_64);
        out.extend_from_slice(&n.to_be_bytes());
    }
}

fn encode_sized(
    len: usize,
    m8: u8,
    m16: u8,
    m32: u8,
    out: &mut Vec<u8>,
    write_payload: impl FnOnce(&mut Vec<u8>),
) {
    if len <= u8::MAX as usize {
        out.push(m8);
        out.push(len as u8);
    } else if len <= u16::MAX as usize {
        out.push(m16);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        out.push(m32);
        out.extend_from_slice(&(len as u32).to_be_bytes());
    }
    write_payload(out);
}

fn encode_len_marker(len: usize, tiny_base: u8, m8: u8, m16: u8, m32: u8, out: &mut Vec<u8>) {
    if len <= 15 {
        out.push(tiny_base | len as u8);
    } else if len <= u8::MAX as usize {
        out.push(m8);
        out.push(len as u8);
    } else if len <= u16::MAX as usize {
        out.push(m16);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        out.push(m32);
        out.extend_from_slice(&(len as u32).to_be_bytes());
    }
}

fn encode_string(s: &str, out: &mut Vec<u8>) {
    let bytes = s.as_bytes();
    encode_len_marker(bytes.len(), marker::TINY_STRING, marker::STRING_8, marker::STRING_16, marker::STRING_32, out);
    out.extend_from_slice(bytes);
}

fn encode_struct_header(field_count: usize, signature: u8, out: &mut Vec<u8>) {
    debug_assert!(field_count <= 15, "struct field count must fit in a tiny struct marker");
    out.push(marker::TINY_STRUCT | field_count as u8);
    out.push(signature);
}

fn encode_properties(props: &std::collections::HashMap<String, Value>, out: &mut Vec<u8>) {
    let map: IndexMap<String, Value> = props.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    encode(&Value::Map(map), out);
}

fn encode_node(n: &NodeRef, out: &mut Vec<u8>) {
    encode_struct_header(3, tag::NODE, out);
    encode_int(n.id, out);
    encode(&Value::List(n.labels.iter().cloned().map(Value::String).collect()), out);
    encode_properties(&n.properties, out);
}

fn encode_relationship(r: &RelationshipRef, out: &mut Vec<u8>) {
    encode_struct_header(5, tag::RELATIONSHIP, out);
    encode_int(r.id, out);
    encode_int(r.start_node_id, out);
    encode_int(r.end_node_id, out);
    encode_string(&r.rel_type, out);
    encode_properties(&r.properties, out);
}

fn encode_unbound_relationship(r: &UnboundRelationshipRef, out: &mut Vec<u8>) {
    encode_struct_header(3, tag::UNBOUND_RELATIONSHIP, out);
    encode_int(r.id, out);
    encode_string(&r.rel_type, out);
    encode_properties(&r.properties, out);
}

fn encode_path(p: &PathRef, out: &mut Vec<u8>) {
    encode_struct_header(3, tag::PATH, out);
    encode(&Value::List(p.nodes.iter().cloned().map(Value::Node).collect()), out);
    let unbound: Vec<Value> = p
        .relationships
        .iter()
        .map(|r| {
            Value::UnboundRelationship(UnboundRelationshipRef {
                id: r.id,
                element_id: r.element_id.clone(),
                rel_type: r.rel_type.clone(),
                properties: r.properties.clone(),
            })
        })
        .collect();
    encode(&Value::List(unbound), out);
    // indices: the server form interleaves relationship/node offsets along
    // the path; since `PathRef` already carries the full node/relationship
    // sequence directly, an empty index list is sufficient here.
    out.push(marker::TINY_LIST);
}

fn encode_datetime(dt: DateTime<Utc>, out: &mut Vec<u8>) {
    encode_struct_header(3, tag::DATE_TIME, out);
    let nanos = dt.timestamp_subsec_nanos();
    encode_int(dt.timestamp(), out);
    encode_int(nanos as i64, out);
    encode_int(0, out); // UTC offset in seconds; this crate only round-trips UTC values
}

fn unix_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).expect("1970-01-01 is a valid date")
}

fn encode_date(d: DateValue, out: &mut Vec<u8>) {
    encode_struct_header(1, tag::DATE, out);
    encode_int(d.0.signed_duration_since(unix_epoch()).num_days(), out);
}

fn encode_duration(d: DurationValue, out: &mut Vec<u8>) {
    encode_struct_header(4, tag::DURATION, out);
    encode_int(d.months, out);
    encode_int(d.days, out);
    encode_int(d.seconds, out);
    encode_int(d.nanoseconds, out);
}

fn encode_point2d(p: Point2DValue, out: &mut Vec<u8>) {
    encode_struct_header(3, tag::POINT_2D, out);
    encode_int(p.srid, out);
    encode(&Value::Float(p.x), out);
    encode(&Value::Float(p.y), out);
}

fn encode_point3d(p: Point3DValue, out: &mut Vec<u8>) {
    encode_struct_header(4, tag::POINT_3D, out);
    encode_int(p.srid, out);
    encode(&Value::Float(p.x), out);
    encode(&Value::Float(p.y), out);
    encode(&Value::Float(p.z), out);
}

/// Decode one value, returning it and the number of bytes consumed.
pub fn decode(bytes: &[u8]) -> Result<(Value, usize)> {
    decode_at_depth(bytes, 0)
}

fn decode_at_depth(bytes: &[u8], depth: usize) -> Result<(Value, usize)> {
    if depth > MAX_DEPTH {
        return Err(Error::PackStreamError(format!(
            "nested value exceeds max depth of {MAX_DEPTH}"
        )));
    }
    let marker = *bytes
        .first()
        .ok_or_else(|| Error::PackStreamError("unexpected end of input".into()))?;

    match marker {
        marker::NULL => Ok((Value::Null, 1)),
        marker::FALSE => Ok((Value::Bool(false), 1)),
        marker::TRUE => Ok((Value::Bool(true), 1)),
        marker::FLOAT => {
            let raw = read_exact::<8>(bytes, 1)?;
            Ok((Value::Float(f64::from_be_bytes(raw)), 9))
        }
        marker::INT_8 => {
            let raw = read_exact::<1>(bytes, 1)?;
            Ok((Value::Int(raw[0] as i8 as i64), 2))
        }
        marker::INT_16 => {
            let raw = read_exact::<2>(bytes, 1)?;
            Ok((Value::Int(i16::from_be_bytes(raw) as i64), 3))
        }
        marker::INT_32 => {
            let raw = read_exact::<4>(bytes, 1)?;
            Ok((Value::Int(i32::from_be_bytes(raw) as i64), 5))
        }
        marker::INT_64 => {
            let raw = read_exact::<8>(bytes, 1)?;
            Ok((Value::Int(i64::from_be_bytes(raw)), 9))
        }
        marker::BYTES_8 | marker::BYTES_16 | marker::BYTES_32 => {
            let (len, header_len) = decode_explicit_len(bytes, marker)?;
            let start = header_len;
            let end = start + len;
            let payload = bytes.get(start..end).ok_or_else(too_short)?;
            Ok((Value::Bytes(payload.to_vec()), end))
        }
        marker::STRING_8 | marker::STRING_16 | marker::STRING_32 => decode_string(bytes, marker),
        marker::LIST_8 | marker::LIST_16 | marker::LIST_32 => {
            let (len, header_len) = decode_explicit_len(bytes, marker)?;
            decode_list(bytes, header_len, len, depth)
        }
        marker::MAP_8 | marker::MAP_16 | marker::MAP_32 => {
            let (len, header_len) = decode_explicit_len(bytes, marker)?;
            decode_map(bytes, header_len, len, depth)
        }
        m if (m & 0xF0) == marker::TINY_STRING => decode_string(bytes, marker),
        m if (m & 0xF0) == marker::TINY_LIST => decode_list(bytes, 1, (m & 0x0F) as usize, depth),
        m if (m & 0xF0) == marker::TINY_MAP => decode_map(bytes, 1, (m & 0x0F) as usize, depth),
        m if (m & 0xF0) == marker::TINY_STRUCT => decode_struct(bytes, (m & 0x0F) as usize, depth),
        m if (m as i8) >= -16 => Ok((Value::Int(m as i8 as i64), 1)),
        m => Err(Error::PackStreamError(format!("unrecognized marker 0x{m:02X}"))),
    }
}

fn too_short() -> Error {
    Error::PackStreamError("unexpected end of input".into())
}

fn read_exact<const N: usize>(bytes: &[u8], offset: usize) -> Result<[u8; N]> {
    let slice = bytes.get(offset..offset + N).ok_or_else(too_short)?;
    let mut buf = [0u8; N];
    buf.copy_from_slice(slice);
    Ok(buf)
}

fn decode_explicit_len(bytes: &[u8], marker: u8) -> Result<(usize, usize)> {
    match marker {
        marker::BYTES_8 | marker::STRING_8 | marker::LIST_8 | marker::MAP_8 => {
            let raw = read_exact::<1>(bytes, 1)?;
            Ok((raw[0] as usize, 2))
        }
        marker::BYTES_16 | marker::STRING_16 | marker::LIST_16 | marker::MAP_16 => {
            let raw = read_exact::<2>(bytes, 1)?;
            Ok((u16::from_be_bytes(raw) as usize, 3))
        }
        marker::BYTES_32 | marker::STRING_32 | marker::LIST_32 | marker::MAP_32 => {
            let raw = read_exact::<4>(bytes, 1)?;
            Ok((u32::from_be_bytes(raw) as usize, 5))
        }
        _ => unreachable!("decode_explicit_len called with a non-sized marker"),
    }
}

fn decode_string(bytes: &[u8], marker: u8) -> Result<(Value, usize)> {
    let (len, header_len) = if (marker & 0xF0) == self::marker::TINY_STRING {
        ((marker & 0x0F) as usize, 1)
    } else {
        decode_explicit_len(bytes, marker)?
    };
    let start = header_len;
    let end = start + len;
    let payload = bytes.get(start..end).ok_or_else(too_short)?;
    let s = std::str::from_utf8(payload).map_err(|e| Error::PackStreamError(e.to_string()))?;
    Ok((Value::String(s.to_owned()), end))
}

fn decode_list(bytes: &[u8], header_len: usize, len: usize, depth: usize) -> Result<(Value, usize)> {
    let mut offset = header_len;
    let mut items = Vec::with_capacity(len);
    for _ in 0..len {
        let (value, consumed) = decode_at_depth(&bytes[offset..], depth + 1)?;
        items.push(value);
        offset += consumed;
    }
    Ok((Value::List(items), offset))
}

fn decode_map(bytes: &[u8], header_len: usize, len: usize, depth: usize) -> Result<(Value, usize)> {
    let mut offset = header_len;
    let mut map = IndexMap::with_capacity(len);
    for _ in 0..len {
        let (key, consumed) = decode_at_depth(&bytes[offset..], depth + 1)?;
        offset += consumed;
        let key = match key {
            Value::String(s) => s,
            other => return Err(Error::PackStreamError(format!("map key must be a string, got {}", other.type_name()))),
        };
        let (value, consumed) = decode_at_depth(&bytes[offset..], depth + 1)?;
        offset += consumed;
        map.insert(key, value);
    }
    Ok((Value::Map(map), offset))
}

fn decode_struct(bytes: &[u8], field_count: usize, depth: usize) -> Result<(Value, usize)> {
    let signature = *bytes.get(1).ok_or_else(too_short)?;
    let mut offset = 2;
    let mut fields = Vec::with_capacity(field_count);
    for _ in 0..field_count {
        let (value, consumed) = decode_at_depth(&bytes[offset..], depth + 1)?;
        fields.push(value);
        offset += consumed;
    }
    let value = match signature {
        tag::NODE if fields.len() == 3 => Value::Node(decode_node(fields)?),
        tag::RELATIONSHIP if fields.len() == 5 => Value::Relationship(decode_relationship(fields)?),
        tag::UNBOUND_RELATIONSHIP if fields.len() == 3 => Value::UnboundRelationship(decode_unbound_relationship(fields)?),
        tag::PATH if fields.len() == 3 => Value::Path(decode_path(fields)?),
        tag::DATE_TIME if fields.len() == 3 => Value::DateTime(decode_datetime(fields)?),
        tag::DATE_TIME_LEGACY if fields.len() == 3 => Value::DateTime(decode_datetime(fields)?),
        tag::DATE if fields.len() == 1 => Value::Date(decode_date(fields)?),
        tag::DURATION if fields.len() == 4 => Value::Duration(decode_duration(fields)?),
        tag::POINT_2D if fields.len() == 3 => Value::Point2D(decode_point2d(fields)?),
        tag::POINT_3D if fields.len() == 4 => Value::Point3D(decode_point3d(fields)?),
        other => {
            return Err(Error::PackStreamError(format!(
                "unsupported structure signature 0x{other:02X}"
            )))
        }
    };
    Ok((value, offset))
}

fn as_int(v: Value) -> Result<i64> {
    match v {
        Value::Int(n) => Ok(n),
        other => Err(Error::PackStreamError(format!("expected INTEGER, got {}", other.type_name()))),
    }
}

fn as_string(v: Value) -> Result<String> {
    match v {
        Value::String(s) => Ok(s),
        other => Err(Error::PackStreamError(format!("expected STRING, got {}", other.type_name()))),
    }
}

fn as_string_list(v: Value) -> Result<Vec<String>> {
    match v {
        Value::List(items) => items.into_iter().map(as_string).collect(),
        other => Err(Error::PackStreamError(format!("expected LIST, got {}", other.type_name()))),
    }
}

fn as_properties(v: Value) -> Result<std::collections::HashMap<String, Value>> {
    match v {
        Value::Map(m) => Ok(m.into_iter().collect()),
        other => Err(Error::PackStreamError(format!("expected MAP, got {}", other.type_name()))),
    }
}

fn decode_node(mut fields: Vec<Value>) -> Result<NodeRef> {
    let properties = as_properties(fields.remove(2))?;
    let labels = as_string_list(fields.remove(1))?;
    let id = as_int(fields.remove(0))?;
    Ok(NodeRef { id, element_id: None, labels, properties })
}

fn decode_relationship(mut fields: Vec<Value>) -> Result<RelationshipRef> {
    let properties = as_properties(fields.remove(4))?;
    let rel_type = as_string(fields.remove(3))?;
    let end_node_id = as_int(fields.remove(2))?;
    let start_node_id = as_int(fields.remove(1))?;
    let id = as_int(fields.remove(0))?;
    Ok(RelationshipRef { id, element_id: None, start_node_id, end_node_id, rel_type, properties })
}

fn decode_path(mut fields: Vec<Value>) -> Result<PathRef> {
    let _indices = fields.remove(2);
    let unbound = match fields.remove(1) {
        Value::List(items) => items
            .into_iter()
            .map(|v| match v {
                Value::UnboundRelationship(r) => Ok(r),
                other => Err(Error::PackStreamError(format!(
                    "expected UNBOUND_RELATIONSHIP in path, got {}",
                    other.type_name()
                ))),
            })
            .collect::<Result<Vec<_>>>()?,
        other => return Err(Error::PackStreamError(format!("expected LIST, got {}", other.type_name()))),
    };
    let nodes = match fields.remove(0) {
        Value::List(items) => items
            .into_iter()
            .map(|v| match v {
                Value::Node(n) => Ok(n),
                other => Err(Error::PackStreamError(format!("expected NODE in path, got {}", other.type_name()))),
            })
            .collect::<Result<Vec<_>>>()?,
        other => return Err(Error::PackStreamError(format!("expected LIST, got {}", other.type_name()))),
    };
    // The server's real path structure interleaves signed indices into the
    // node/relationship lists to describe traversal direction per segment;
    // this crate's own `encode_path` instead writes the nodes/relationships
    // as an already-ordered path, so the segments bind positionally.
    let relationships = unbound
        .into_iter()
        .enumerate()
        .map(|(i, r)| RelationshipRef {
            id: r.id,
            element_id: r.element_id,
            start_node_id: nodes.get(i).map(|n| n.id).unwrap_or(0),
            end_node_id: nodes.get(i + 1).map(|n| n.id).unwrap_or(0),
            rel_type: r.rel_type,
            properties: r.properties,
        })
        .collect();
    Ok(PathRef { nodes, relationships })
}

fn decode_unbound_relationship(mut fields: Vec<Value>) -> Result<UnboundRelationshipRef> {
    let properties = as_properties(fields.remove(2))?;
    let rel_type = as_string(fields.remove(1))?;
    let id = as_int(fields.remove(0))?;
    Ok(UnboundRelationshipRef { id, element_id: None, rel_type, properties })
}

fn decode_datetime(mut fields: Vec<Value>) -> Result<DateTime<Utc>> {
    let _offset_seconds = as_int(fields.remove(2))?;
    let nanos = as_int(fields.remove(1))?;
    let seconds = as_int(fields.remove(0))?;
    Utc.timestamp_opt(seconds, nanos as u32)
        .single()
        .ok_or_else(|| Error::PackStreamError("datetime out of range".into()))
}

fn decode_date(mut fields: Vec<Value>) -> Result<DateValue> {
    let days = as_int(fields.remove(0))?;
    unix_epoch()
        .checked_add_signed(chrono::Duration::days(days))
        .map(DateValue)
        .ok_or_else(|| Error::PackStreamError("date out of range".into()))
}

fn decode_duration(mut fields: Vec<Value>) -> Result<DurationValue> {
    let nanoseconds = as_int(fields.remove(3))?;
    let seconds = as_int(fields.remove(2))?;
    let days = as_int(fields.remove(1))?;
    let months = as_int(fields.remove(0))?;
    Ok(DurationValue { months, days, seconds, nanoseconds })
}

fn as_float(v: Value) -> Result<f64> {
    match v {
        Value::Float(f) => Ok(f),
        other => Err(Error::PackStreamError(format!("expected FLOAT, got {}", other.type_name()))),
    }
}

fn decode_point2d(mut fields: Vec<Value>) -> Result<Point2DValue> {
    let y = as_float(fields.remove(2))?;
    let x = as_float(fields.remove(1))?;
    let srid = as_int(fields.remove(0))?;
    Ok(Point2DValue { srid, x, y })
}

fn decode_point3d(mut fields: Vec<Value>) -> Result<Point3DValue> {
    let z = as_float(fields.remove(3))?;
    let y = as_float(fields.remove(2))?;
    let x = as_float(fields.remove(1))?;
    let srid = as_int(fields.remove(0))?;
    Ok(Point3DValue { srid, x, y, z })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(v: Value) -> Value {
        let bytes = to_bytes(&v);
        let (decoded, consumed) = decode(&bytes).expect("decode");
        assert_eq!(consumed, bytes.len());
        decoded
    }

    #[test]
    fn tiny_int_roundtrips() {
        assert_eq!(roundtrip(Value::Int(42)), Value::Int(42));
        assert_eq!(roundtrip(Value::Int(-5)), Value::Int(-5));
    }

    #[test]
    fn wide_ints_roundtrip() {
        assert_eq!(roundtrip(Value::Int(1_000_000)), Value::Int(1_000_000));
        assert_eq!(roundtrip(Value::Int(i64::MIN)), Value::Int(i64::MIN));
    }

    #[test]
    fn strings_and_lists_roundtrip() {
        let long = "x".repeat(300);
        assert_eq!(roundtrip(Value::String(long.clone())), Value::String(long));
        let list = Value::List(vec![Value::Int(1), Value::String("a".into()), Value::Null]);
        assert_eq!(roundtrip(list.clone()), list);
    }

    #[test]
    fn map_roundtrips() {
        let map = Value::map([("a", Value::Int(1)), ("b", Value::Bool(true))]);
        assert_eq!(roundtrip(map.clone()), map);
    }

    #[test]
    fn node_roundtrips() {
        let node = Value::Node(NodeRef {
            id: 7,
            element_id: None,
            labels: vec!["Person".into()],
            properties: [("name".to_string(), Value::String("Ada".into()))].into_iter().collect(),
        });
        assert_eq!(roundtrip(node.clone()), node);
    }

    #[test]
    fn unbound_relationship_roundtrips() {
        let rel = Value::UnboundRelationship(UnboundRelationshipRef {
            id: 3,
            element_id: None,
            rel_type: "KNOWS".into(),
            properties: [("since".to_string(), Value::Int(2020))].into_iter().collect(),
        });
        assert_eq!(roundtrip(rel.clone()), rel);
    }

    #[test]
    fn date_roundtrips() {
        let d = Value::Date(DateValue(NaiveDate::from_ymd_opt(2024, 3, 17).unwrap()));
        assert_eq!(roundtrip(d.clone()), d);
        let epoch = Value::Date(DateValue(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()));
        assert_eq!(roundtrip(epoch.clone()), epoch);
        let before_epoch = Value::Date(DateValue(NaiveDate::from_ymd_opt(1900, 1, 1).unwrap()));
        assert_eq!(roundtrip(before_epoch.clone()), before_epoch);
    }

    #[test]
    fn duration_roundtrips() {
        let d = Value::Duration(DurationValue { months: 14, days: 3, seconds: 9_000, nanoseconds: 500 });
        assert_eq!(roundtrip(d.clone()), d);
    }

    #[test]
    fn point2d_roundtrips() {
        let p = Value::Point2D(Point2DValue { srid: 4326, x: 1.5, y: -2.25 });
        assert_eq!(roundtrip(p.clone()), p);
    }

    #[test]
    fn point3d_roundtrips() {
        let p = Value::Point3D(Point3DValue { srid: 4979, x: 1.5, y: -2.25, z: 10.0 });
        assert_eq!(roundtrip(p.clone()), p);
    }

    #[test]
    fn path_with_relationships_roundtrips() {
        let n0 = NodeRef { id: 1, element_id: None, labels: vec!["A".into()], properties: Default::default() };
        let n1 = NodeRef { id: 2, element_id: None, labels: vec!["B".into()], properties: Default::default() };
        let rel = RelationshipRef {
            id: 9,
            element_id: None,
            start_node_id: 1,
            end_node_id: 2,
            rel_type: "LINKS".into(),
            properties: Default::default(),
        };
        let path = Value::Path(PathRef { nodes: vec![n0, n1], relationships: vec![rel] });
        let decoded = roundtrip(path.clone());
        match (&path, &decoded) {
            (Value::Path(expected), Value::Path(actual)) => {
                assert_eq!(expected.nodes, actual.nodes);
                assert_eq!(expected.relationships.len(), actual.relationships.len());
                assert_eq!(expected.relationships[0].start_node_id, actual.relationships[0].start_node_id);
                assert_eq!(expected.relationships[0].end_node_id, actual.relationships[0].end_node_id);
                assert_eq!(expected.relationships[0].rel_type, actual.relationships[0].rel_type);
            }
            _ => panic!("expected a path roundtrip"),
        }
    }
}

use std::time::Duration;

use cypher_bolt::bolt::connection::{Connection, ConnectionState};
use cypher_bolt::bolt::framing;
use cypher_bolt::bolt::message::signatures;
use cypher_bolt::bolt::packstream;
use cypher_bolt::qb::value::Value;
use cypher_bolt::url::{Endpoint, Family};
use indexmap::IndexMap;

fn encode_message(signature: u8, fields: Vec<Value>) -> Vec<u8> {
    let mut bytes = vec![0xB0 | fields.len() as u8, signature];
    for field in &fields {
        packstream::encode(field, &mut bytes);
    }
    bytes
}

fn success(meta: IndexMap<String, Value>) -> Vec<u8> {
    encode_message(signatures::SUCCESS, vec![Value::Map(meta)])
}

fn failure(code: &str, message: &str) -> Vec<u8> {
    let mut meta = IndexMap::new();
    meta.insert("code".to_string(), Value::String(code.to_string()));
    meta.insert("message".to_string(), Value::String(message.to_string()));
    encode_message(signatures::FAILURE, vec![Value::Map(meta)])
}

#[tokio::test]
async fn handshake_decodes_a_5_8_version_reply() {
    // §6: version reply is 4 bytes `00 00 minor major`; `00 00 08 05` is 5.8.
    let (mut client, mut server) = tokio::io::duplex(4096);
    let task = tokio::spawn(async move {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        let mut preamble = [0u8; 20];
        server.read_exact(&mut preamble).await.unwrap();
        server.write_all(&[0x00, 0x00, 0x08, 0x05]).await.unwrap();
        server.flush().await.unwrap();
    });
    let conn = Connection::handshake(&mut client, Duration::from_secs(1)).await.unwrap();
    assert_eq!(conn.bolt_version, (5, 8));
    task.await.unwrap();
}

#[test]
fn driver_url_scheme_selects_secure_and_verify_cert() {
    let ssc = Endpoint::parse("memgraph+ssc://u:p@h:7687").unwrap();
    assert_eq!(ssc.family, Family::Memgraph);
    assert!(ssc.secure);
    assert!(!ssc.verify_cert);

    let ssl = Endpoint::parse("memgraph+ssl://u:p@h:7687").unwrap();
    assert!(ssl.secure);
    assert!(ssl.verify_cert);

    let plain = Endpoint::parse("memgraph://u:p@h:7687").unwrap();
    assert!(!plain.secure);
    assert!(plain.verify_cert);
}

#[tokio::test]
async fn a_failure_during_pull_resets_back_to_ready_on_the_same_connection() {
    let (mut client, mut server) = tokio::io::duplex(8192);

    let server_task = tokio::spawn(async move {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let mut preamble = [0u8; 20];
        server.read_exact(&mut preamble).await.unwrap();
        server.write_all(&[0, 0, 4, 4]).await.unwrap();
        server.flush().await.unwrap();

        // HELLO -> SUCCESS
        framing::read_message(&mut server, 1 << 20).await.unwrap();
        framing::write_message(&mut server, &success(IndexMap::new())).await.unwrap();

        // RUN -> SUCCESS
        framing::read_message(&mut server, 1 << 20).await.unwrap();
        framing::write_message(&mut server, &success(IndexMap::new())).await.unwrap();

        // PULL -> FAILURE
        framing::read_message(&mut server, 1 << 20).await.unwrap();
        framing::write_message(&mut server, &failure("Neo.ClientError.Statement.SyntaxError", "boom"))
            .await
            .unwrap();

        // RESET -> SUCCESS
        framing::read_message(&mut server, 1 << 20).await.unwrap();
        framing::write_message(&mut server, &success(IndexMap::new())).await.unwrap();
    });

    let mut conn = Connection::handshake(&mut client, Duration::from_secs(1)).await.unwrap();
    conn.hello("cypher-bolt-rs/test", Default::default()).await.unwrap();

    conn.run("MATCH (n) RETURN n", IndexMap::new(), IndexMap::new()).await.unwrap();
    let pull_err = conn.pull(1000, None).await.unwrap_err();
    assert!(matches!(pull_err, cypher_bolt::Error::ServerFailure { .. }));
    assert_eq!(conn.state, ConnectionState::Failed);

    conn.reset().await.unwrap();
    assert_eq!(conn.state, ConnectionState::Ready);

    server_task.await.unwrap();
}

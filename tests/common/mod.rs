//! Scripted in-process server for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;

use iproto_client::protocol::{encode_length_prefix, keys, read_frame, GREETING_SIZE};
use rmpv::Value;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

/// base64 of bytes 0..32.
pub const SALT: &str = "AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8=";

pub const VERSION: &str = "Tarantool 2.11.1 (Binary) 7c8c5a4f-5d6e-4b4c-9d0b-1f2e3d4c5b6a";

/// One request as seen by the server.
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub code: u8,
    pub sync: u32,
    pub body: Option<Value>,
}

impl ReceivedRequest {
    /// Look up an integer key in the body map.
    pub fn body_field(&self, key: u8) -> Option<&Value> {
        self.body
            .as_ref()?
            .as_map()?
            .iter()
            .find(|(k, _)| k.as_u64() == Some(key as u64))
            .map(|(_, v)| v)
    }
}

pub async fn bind() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

pub fn greeting() -> [u8; GREETING_SIZE] {
    let mut raw = [b' '; GREETING_SIZE];
    raw[..VERSION.len()].copy_from_slice(VERSION.as_bytes());
    raw[63] = b'\n';
    raw[64..64 + SALT.len()].copy_from_slice(SALT.as_bytes());
    raw[127] = b'\n';
    raw
}

/// Accept one client and send it the greeting.
pub async fn accept(listener: &TcpListener) -> TcpStream {
    let (mut socket, _) = listener.accept().await.unwrap();
    socket.write_all(&greeting()).await.unwrap();
    socket
}

/// Read one request. `None` once the client has gone away.
pub async fn read_request(socket: &mut TcpStream) -> Option<ReceivedRequest> {
    let frame = read_frame(socket).await.ok()?;
    let mut cursor = &frame[..];

    let header = rmpv::decode::read_value(&mut cursor).unwrap();
    let field = |key: u8| {
        header
            .as_map()
            .unwrap()
            .iter()
            .find(|(k, _)| k.as_u64() == Some(key as u64))
            .and_then(|(_, v)| v.as_u64())
            .unwrap()
    };
    let code = field(keys::CODE) as u8;
    let sync = field(keys::SYNC) as u32;

    let body = if cursor.is_empty() {
        None
    } else {
        Some(rmpv::decode::read_value(&mut cursor).unwrap())
    };

    Some(ReceivedRequest { code, sync, body })
}

async fn write_reply(socket: &mut TcpStream, header: Value, body: Value) {
    let mut payload = Vec::new();
    rmpv::encode::write_value(&mut payload, &header).unwrap();
    rmpv::encode::write_value(&mut payload, &body).unwrap();

    let mut frame = encode_length_prefix(payload.len() as u32).to_vec();
    frame.extend(payload);
    socket.write_all(&frame).await.unwrap();
}

/// Send bytes as they are, framed or not.
pub async fn write_raw(socket: &mut TcpStream, bytes: &[u8]) {
    socket.write_all(bytes).await.unwrap();
}

/// Reply `{data: data}` to request `sync`.
pub async fn write_ok(socket: &mut TcpStream, sync: u32, data: Value) {
    let header = Value::Map(vec![
        (Value::from(keys::CODE), Value::from(0)),
        (Value::from(keys::SYNC), Value::from(sync)),
        (Value::from(keys::SCHEMA_VERSION), Value::from(80)),
    ]);
    let body = Value::Map(vec![(Value::from(keys::DATA), data)]);
    write_reply(socket, header, body).await;
}

/// Reply with a server error to request `sync`.
pub async fn write_error(socket: &mut TcpStream, sync: u32, code: u32, message: &str) {
    let header = Value::Map(vec![
        (Value::from(keys::CODE), Value::from(0x8000 | code)),
        (Value::from(keys::SYNC), Value::from(sync)),
    ]);
    let body = Value::Map(vec![(Value::from(keys::ERROR), Value::from(message))]);
    write_reply(socket, header, body).await;
}

/// Install a test subscriber once; `RUST_LOG` controls the output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

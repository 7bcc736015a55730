//! Ping - connect, fire concurrent requests, close.
//!
//! This demo shows:
//! - Opening a connection with the builder
//! - Sharing one connection between many tasks
//! - Calling a stored function and decoding its result
//!
//! # Running
//!
//! ```text
//! RUST_LOG=iproto_client=debug cargo run --example ping -- 127.0.0.1:3301 guest ""
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use iproto_client::query::{Call, Ping};
use iproto_client::Connection;
use tracing_subscriber::EnvFilter;

const PINGS: usize = 1000;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let addr = args.next().unwrap_or_else(|| "127.0.0.1:3301".to_string());
    let user = args.next();
    let password = args.next().unwrap_or_default();

    let mut builder = Connection::builder().query_timeout(Duration::from_secs(5));
    if let Some(user) = user {
        builder = builder.credentials(user, password);
    }

    let conn = Arc::new(builder.connect(&addr).await?);
    println!("connected to {}: {}", conn.remote_addr(), conn.greeting().version_line());

    let started = Instant::now();
    let tasks: Vec<_> = (0..PINGS)
        .map(|_| {
            let conn = conn.clone();
            tokio::spawn(async move { conn.execute(Ping).await })
        })
        .collect();
    for task in tasks {
        task.await??;
    }
    println!("{} pings in {:?}", PINGS, started.elapsed());

    let reply = conn
        .execute(Call::new("box.info.version", ()))
        .await?
        .into_result()?;
    let (version,): (String,) = reply.decode_data()?;
    println!("server version {}", version);

    conn.close().await;
    Ok(())
}

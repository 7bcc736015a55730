//! Connection builder and lifecycle.
//!
//! [`Connection::connect`] performs the handshake on the calling task:
//! 1. TCP connect
//! 2. Read the 128-byte greeting
//! 3. Authenticate (only when a user name is configured)
//!
//! All three share one deadline. On success the socket is split and four
//! tasks are started: router, writer, reader and a supervisor that waits for
//! the other three and then answers everything still outstanding.
//!
//! # Example
//!
//! ```no_run
//! use iproto_client::query::Call;
//! use iproto_client::Connection;
//! use std::time::Duration;
//!
//! # async fn run() -> iproto_client::Result<()> {
//! let conn = Connection::builder()
//!     .connect_timeout(Duration::from_millis(500))
//!     .credentials("guest", "")
//!     .connect("127.0.0.1:3301/users")
//!     .await?;
//!
//! let reply = conn.execute(Call::new("box.info", ())).await?;
//! println!("{:?}", reply.data);
//!
//! conn.close().await;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, error};

use crate::backpressure::IntakeGate;
use crate::config::{Address, Options, PipelineConfig};
use crate::error::{IprotoError, Result};
use crate::protocol::{decode_response, read_frame, write_frame, Greeting, Response};
use crate::query::{Auth, Query};
use crate::reader::read_loop;
use crate::router::{PendingReply, Request, RequestIdAllocator, Router, RouterRemains};
use crate::shutdown::Shutdown;
use crate::writer::write_loop;

/// Lifecycle state of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepting and routing requests.
    Open,
    /// Shutdown fired, teardown still running.
    Closing,
    /// Every stage stopped and every request answered.
    Closed,
}

/// Builder for configuring and opening a [`Connection`].
#[derive(Debug, Clone, Default)]
pub struct ConnectionBuilder {
    options: Options,
    pipeline: PipelineConfig,
}

impl ConnectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all options at once.
    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Deadline for connect, greeting and authentication together.
    ///
    /// Default: 1 second
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    /// Timeout applied by [`Connection::execute`].
    ///
    /// Default: 1 second
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.options.query_timeout = timeout;
        self
    }

    /// Default space, overriding any `/space` suffix in the address.
    pub fn default_space(mut self, space: impl Into<String>) -> Self {
        self.options.default_space = Some(space.into());
        self
    }

    /// Authenticate with `chap-sha1` during the handshake.
    pub fn credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.options.user = Some(user.into());
        self.options.password = Some(password.into());
        self
    }

    /// Replace all queue sizes at once.
    pub fn pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Submission queue capacity shared by all callers.
    ///
    /// Default: 16
    pub fn submission_capacity(mut self, capacity: usize) -> Self {
        self.pipeline.submission_capacity = capacity;
        self
    }

    /// Router → writer queue capacity.
    ///
    /// Default: 256
    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.pipeline.outbound_capacity = capacity;
        self
    }

    /// Reader → router queue capacity.
    ///
    /// Default: 256
    pub fn response_capacity(mut self, capacity: usize) -> Self {
        self.pipeline.response_capacity = capacity;
        self
    }

    /// Intake pauses above `response_capacity / divisor` queued responses.
    ///
    /// Default: 10
    pub fn backpressure_divisor(mut self, divisor: usize) -> Self {
        self.pipeline.backpressure_divisor = divisor;
        self
    }

    /// Connect to `host:port[/space]` and run the handshake.
    pub async fn connect(self, addr: &str) -> Result<Connection> {
        Connection::open(addr, self.options, self.pipeline).await
    }
}

/// A live, multiplexed connection.
///
/// All methods take `&self`; share it between tasks behind an `Arc`.
/// Dropping it fires shutdown and teardown finishes in the background.
#[derive(Debug)]
pub struct Connection {
    remote_addr: SocketAddr,
    default_space: String,
    query_timeout: Duration,
    greeting: Greeting,
    submissions: mpsc::Sender<Request>,
    shutdown: Shutdown,
    closed: watch::Receiver<bool>,
}

impl Connection {
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::new()
    }

    /// Connect with default queue sizes.
    pub async fn connect(addr: &str, options: Options) -> Result<Self> {
        Self::open(addr, options, PipelineConfig::default()).await
    }

    async fn open(addr: &str, options: Options, pipeline: PipelineConfig) -> Result<Self> {
        let options = options.normalized();
        let address = Address::parse(addr)?;
        let default_space = options
            .default_space
            .clone()
            .or(address.space)
            .unwrap_or_default();

        // the handshake's auth request takes the first id
        let mut ids = RequestIdAllocator::new();

        let deadline = Instant::now() + options.connect_timeout;
        let (stream, greeting) = timeout_at(deadline, handshake(&address.remote, &options, &mut ids))
            .await
            .map_err(|_| IprotoError::ConnectTimeout(options.connect_timeout))??;

        let remote_addr = stream.peer_addr()?;
        debug!(
            remote = %remote_addr,
            space = %default_space,
            version = %greeting.version_line(),
            "connected"
        );

        let (read_half, write_half) = stream.into_split();

        let shutdown = Shutdown::new();
        let (sub_tx, sub_rx) = mpsc::channel(pipeline.submission_capacity.max(1));
        let (out_tx, out_rx) = mpsc::channel(pipeline.outbound_capacity.max(1));
        let (resp_tx, resp_rx) = mpsc::channel(pipeline.response_capacity.max(1));
        let (closed_tx, closed_rx) = watch::channel(false);

        let router = Router::new(
            sub_rx,
            resp_rx,
            out_tx,
            shutdown.clone(),
            ids,
            IntakeGate::from(&pipeline),
            default_space.clone(),
        );

        let router_task = spawn_stage("router", shutdown.clone(), async move {
            Ok(router.run().await)
        });
        let writer_task = spawn_stage(
            "writer",
            shutdown.clone(),
            write_loop(write_half, out_rx, shutdown.clone()),
        );
        let reader_task = spawn_stage(
            "reader",
            shutdown.clone(),
            read_loop(read_half, resp_tx, shutdown.clone()),
        );
        tokio::spawn(supervise(router_task, writer_task, reader_task, closed_tx));

        Ok(Self {
            remote_addr,
            default_space,
            query_timeout: options.query_timeout,
            greeting,
            submissions: sub_tx,
            shutdown,
            closed: closed_rx,
        })
    }

    /// Queue a query and return the handle its reply arrives on.
    ///
    /// Waits while the submission queue is full.
    ///
    /// # Errors
    ///
    /// `ConnectionClosed` if shutdown has fired or fires while waiting.
    pub async fn submit<Q: Query>(&self, query: Q) -> Result<PendingReply> {
        if self.shutdown.is_triggered() {
            return Err(IprotoError::ConnectionClosed);
        }

        let (request, pending) = Request::new(Box::new(query));

        tokio::select! {
            biased;
            _ = self.shutdown.wait() => Err(IprotoError::ConnectionClosed),
            sent = self.submissions.send(request) => match sent {
                Ok(()) => Ok(pending),
                Err(_) => Err(IprotoError::ConnectionClosed),
            },
        }
    }

    /// Submit a query and wait for its reply, bounded by the query timeout.
    ///
    /// A server-side error is part of the returned [`Response`]; use
    /// [`Response::into_result`] to turn it into an `Err`. On timeout the
    /// request stays registered until its reply or shutdown arrives.
    pub async fn execute<Q: Query>(&self, query: Q) -> Result<Response> {
        let limit = self.query_timeout;
        timeout(limit, async { self.submit(query).await?.wait().await })
            .await
            .map_err(|_| IprotoError::Timeout(limit))?
    }

    /// Shut the connection down and wait until teardown is complete.
    ///
    /// Safe to call any number of times from any number of tasks. Every
    /// outstanding request has been answered when this returns.
    pub async fn close(&self) {
        if self.shutdown.trigger() {
            debug!(remote = %self.remote_addr, "close requested");
        }
        let mut closed = self.closed.clone();
        let _ = closed.wait_for(|closed| *closed).await;
    }

    pub fn state(&self) -> ConnectionState {
        if *self.closed.borrow() {
            ConnectionState::Closed
        } else if self.shutdown.is_triggered() {
            ConnectionState::Closing
        } else {
            ConnectionState::Open
        }
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.state() == ConnectionState::Closed
    }

    pub fn greeting(&self) -> &Greeting {
        &self.greeting
    }

    pub fn default_space(&self) -> &str {
        &self.default_space
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// TCP connect, greeting and optional authentication.
async fn handshake(
    remote: &str,
    options: &Options,
    ids: &mut RequestIdAllocator,
) -> Result<(TcpStream, Greeting)> {
    let mut stream = TcpStream::connect(remote).await?;
    stream.set_nodelay(true)?;

    let greeting = Greeting::read(&mut stream).await?;

    if let Some((user, password)) = options.credentials() {
        let auth = Auth::new(user, password, greeting.decoded_salt()?);
        authenticate(&mut stream, &auth, ids.next_id()).await?;
        debug!(user = auth.user(), "authenticated");
    }

    Ok((stream, greeting))
}

/// Send one auth request and check its single reply.
async fn authenticate(stream: &mut TcpStream, auth: &Auth, id: u32) -> Result<()> {
    let frame = auth
        .pack(id, "")
        .map_err(|e| IprotoError::Auth(e.to_string()))?;
    write_frame(stream, &frame).await?;

    let body = read_frame(stream).await?;
    let response = decode_response(&body)?;

    if response.sync != id {
        return Err(IprotoError::Auth(format!(
            "reply for request {} while waiting for {}",
            response.sync, id
        )));
    }
    if let Some(err) = response.error {
        return Err(IprotoError::Auth(err.to_string()));
    }
    Ok(())
}

/// Fires shutdown when a stage task ends, including by panic.
struct TriggerOnExit(Shutdown);

impl Drop for TriggerOnExit {
    fn drop(&mut self) {
        self.0.trigger();
    }
}

fn spawn_stage<T, F>(name: &'static str, shutdown: Shutdown, stage: F) -> JoinHandle<Option<T>>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    tokio::spawn(async move {
        let _guard = TriggerOnExit(shutdown);
        match stage.await {
            Ok(value) => Some(value),
            Err(e) => {
                error!(stage = name, error = %e, "stage failed");
                None
            }
        }
    })
}

/// Wait for all stages, then answer everything left and mark the connection closed.
async fn supervise(
    router: JoinHandle<Option<RouterRemains>>,
    writer: JoinHandle<Option<()>>,
    reader: JoinHandle<Option<()>>,
    closed: watch::Sender<bool>,
) {
    let (router, writer, reader) = tokio::join!(router, writer, reader);

    for (name, joined) in [("writer", writer.err()), ("reader", reader.err())] {
        if let Some(e) = joined {
            error!(stage = name, error = %e, "stage panicked");
        }
    }

    match router {
        Ok(Some(remains)) => {
            let failed = remains.fail_all();
            debug!(failed, "outstanding requests failed");
        }
        // dropping the router's state drops every reply slot, which its
        // waiters observe as ConnectionClosed
        Ok(None) => {}
        Err(e) => error!(stage = "router", error = %e, "stage panicked"),
    }

    closed.send_replace(true);
    debug!("connection closed");
}

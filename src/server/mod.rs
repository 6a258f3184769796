// src/server/mod.rs
// TCP front end: accept loop with a bounded connection limiter, one
// thread per connection decoding consecutive JSON requests off the
// stream and writing newline-terminated JSON responses back.

pub mod dispatch;
pub mod wire;

use std::io::{self, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use crossbeam::channel;

use crate::storage::Engine;
use wire::{Request, Response};

const MAX_CONNECTIONS: usize = 100;
const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

pub struct TcpServer {
    listener: TcpListener,
    timeout: Duration,
    max_connections: usize,
}

impl TcpServer {
    pub fn bind(addr: &str) -> io::Result<TcpServer> {
        Ok(TcpServer {
            listener: TcpListener::bind(addr)?,
            timeout: IDLE_TIMEOUT,
            max_connections: MAX_CONNECTIONS,
        })
    }

    /// The bound address; useful when binding port 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever. Each connection gets its own thread;
    /// a bounded token channel caps how many run at once, so accepts
    /// block once the cap is reached.
    pub fn run(self, engine: Engine) -> io::Result<()> {
        log::info!("server running on {}", self.listener.local_addr()?);

        let (slots, tokens) = channel::bounded::<()>(self.max_connections);

        for stream in self.listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    log::warn!("conn error: {}", e);
                    continue;
                }
            };

            if slots.send(()).is_err() {
                break;
            }

            let engine = engine.clone();
            let tokens = tokens.clone();
            let timeout = self.timeout;
            thread::spawn(move || {
                handle_connection(&engine, stream, timeout);
                let _ = tokens.recv();
            });
        }

        Ok(())
    }
}

fn handle_connection(engine: &Engine, stream: TcpStream, timeout: Duration) {
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    log::info!("client connected: {}", peer);

    // Socket timeouts apply to every subsequent read and write, which
    // gives each syscall the rolling inactivity deadline.
    if let Err(e) = stream
        .set_read_timeout(Some(timeout))
        .and_then(|_| stream.set_write_timeout(Some(timeout)))
    {
        log::warn!("cannot set deadline for {}: {}", peer, e);
        return;
    }

    let reader = match stream.try_clone() {
        Ok(clone) => BufReader::new(clone),
        Err(e) => {
            log::warn!("cannot clone stream for {}: {}", peer, e);
            return;
        }
    };
    let mut writer = stream;

    let mut requests = serde_json::Deserializer::from_reader(reader).into_iter::<Request>();
    loop {
        match requests.next() {
            None => {
                log::info!("client disconnected: {}", peer);
                return;
            }
            Some(Err(e)) => {
                if e.is_eof() {
                    log::info!("client disconnected: {}", peer);
                } else {
                    log::warn!("decode error from {}: {}", peer, e);
                }
                return;
            }
            Some(Ok(request)) => {
                let response = dispatch::handle_request(engine, &request);
                if let Err(e) = write_response(&mut writer, &response) {
                    log::warn!("encode error to {}: {}", peer, e);
                    return;
                }
            }
        }
    }
}

fn write_response(writer: &mut TcpStream, response: &Response) -> io::Result<()> {
    let mut payload = serde_json::to_vec(response)?;
    payload.push(b'\n');
    writer.write_all(&payload)?;
    writer.flush()
}

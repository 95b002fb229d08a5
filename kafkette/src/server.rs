//! TCP listener
//!
//! Accepts connections until told to stop and gives each one its own tokio
//! task. Connection tasks share nothing, so there is no locking anywhere.

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::{debug, info, warn};

use crate::connection::Connection;

/// A bound listener ready to accept Kafka clients
pub struct Server {
    listener: TcpListener,
    max_frame_bytes: usize,
}

impl Server {
    /// Binds the listening socket
    ///
    /// # Arguments
    /// * `addr` - Listen address, e.g. "0.0.0.0:9092"
    /// * `max_frame_bytes` - Largest request payload a connection accepts
    pub async fn bind<A: ToSocketAddrs>(addr: A, max_frame_bytes: usize) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            max_frame_bytes,
        })
    }

    /// Address the listener is bound to (useful when binding port 0)
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever
    pub async fn run(self) {
        self.run_until(std::future::pending()).await
    }

    /// Accepts connections until `shutdown` completes
    ///
    /// Accept errors are logged and the loop keeps going. Connections already
    /// running when `shutdown` fires are left to finish on their own.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        match self.listener.local_addr() {
            Ok(addr) => info!("Listening for Kafka clients on {}", addr),
            Err(e) => warn!("Listening, but local address is unavailable: {}", e),
        }

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((socket, addr)) => {
                        info!("Accepted connection from {}", addr);
                        tokio::spawn(serve_connection(socket, addr, self.max_frame_bytes));
                    }
                    Err(e) => {
                        warn!("Error accepting connection: {}", e);
                    }
                },
            }
        }
    }
}

async fn serve_connection(socket: TcpStream, addr: SocketAddr, max_frame_bytes: usize) {
    if let Err(e) = socket.set_nodelay(true) {
        debug!("Could not set TCP_NODELAY for {}: {}", addr, e);
    }

    let mut connection = Connection::new(socket, addr.to_string(), max_frame_bytes);
    match connection.run().await {
        Ok(()) => info!(
            "Connection from {} closed after {} requests",
            addr,
            connection.requests_handled()
        ),
        Err(e) => warn!(
            "Closing connection from {} after {} requests ({} error): {}",
            addr,
            connection.requests_handled(),
            e.kind(),
            e
        ),
    }
}

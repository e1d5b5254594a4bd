//! In-process connector for tests and simulations.
//!
//! [`MemoryConnector::pair`] returns a connector and a [`MemoryListener`].
//! Every successful `connect` hands the listener a [`MemoryPeer`]: the
//! server's end of that connection. Dropping a peer (or calling
//! [`MemoryPeer::hang_up`]) looks like the server closing the socket, and
//! [`MemoryConnector::refuse_next`] makes the next connects fail, so
//! reconnect behavior can be driven deterministically without sockets.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use tokio::sync::{Mutex, mpsc};

use crate::{Connection, ConnectionId, Connector, TransportError};

struct Shared {
    accepted: mpsc::UnboundedSender<MemoryPeer>,
    refuse: AtomicU32,
    next_id: AtomicU64,
}

/// A [`Connector`] whose connections terminate in a [`MemoryListener`].
#[derive(Clone)]
pub struct MemoryConnector {
    shared: Arc<Shared>,
}

impl MemoryConnector {
    /// Creates a connector and the listener that receives its connections.
    pub fn pair() -> (Self, MemoryListener) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Self {
            shared: Arc::new(Shared {
                accepted: tx,
                refuse: AtomicU32::new(0),
                next_id: AtomicU64::new(1),
            }),
        };
        (connector, MemoryListener { accepted: rx })
    }

    /// Makes the next `count` connection attempts fail.
    pub fn refuse_next(&self, count: u32) {
        self.shared.refuse.store(count, Ordering::SeqCst);
    }
}

impl Connector for MemoryConnector {
    type Connection = MemoryConnection;

    async fn connect(
        &self,
        endpoint: &str,
    ) -> Result<Self::Connection, TransportError> {
        let refused = self
            .shared
            .refuse
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(TransportError::ConnectFailed {
                endpoint: endpoint.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "refused by memory listener",
                ),
            });
        }

        let id = ConnectionId::new(
            self.shared.next_id.fetch_add(1, Ordering::Relaxed),
        );
        let (to_client, inbound) = mpsc::unbounded_channel();
        let (outbound, from_client) = mpsc::unbounded_channel();

        let peer = MemoryPeer {
            id,
            to_client,
            from_client,
        };
        self.shared.accepted.send(peer).map_err(|_| {
            TransportError::ConnectFailed {
                endpoint: endpoint.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "memory listener dropped",
                ),
            }
        })?;

        Ok(MemoryConnection {
            id,
            inbound: Mutex::new(inbound),
            outbound: Mutex::new(Some(outbound)),
        })
    }
}

/// Receives the server ends of connections made by a [`MemoryConnector`].
pub struct MemoryListener {
    accepted: mpsc::UnboundedReceiver<MemoryPeer>,
}

impl MemoryListener {
    /// Waits for the next connection. `None` once every connector is gone.
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.accepted.recv().await
    }
}

/// The server's end of one in-memory connection.
pub struct MemoryPeer {
    id: ConnectionId,
    to_client: mpsc::UnboundedSender<Vec<u8>>,
    from_client: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl MemoryPeer {
    /// The id the client side sees for this connection.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Pushes one frame to the client. Returns `false` if it hung up.
    pub fn send(&self, frame: impl Into<Vec<u8>>) -> bool {
        self.to_client.send(frame.into()).is_ok()
    }

    /// Waits for the next frame from the client. `None` once it closed.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.from_client.recv().await
    }

    /// Returns a frame the client already sent, without waiting.
    pub fn try_recv(&mut self) -> Option<Vec<u8>> {
        self.from_client.try_recv().ok()
    }

    /// Closes the connection from the server side.
    pub fn hang_up(self) {}
}

/// The client's end of one in-memory connection.
pub struct MemoryConnection {
    id: ConnectionId,
    inbound: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    outbound: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
}

impl Connection for MemoryConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let outbound = self.outbound.lock().await;
        let sent = outbound
            .as_ref()
            .is_some_and(|tx| tx.send(data.to_vec()).is_ok());
        if sent {
            Ok(())
        } else {
            Err(TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "memory peer hung up",
            )))
        }
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.inbound.lock().await.recv().await)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.outbound.lock().await.take();
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

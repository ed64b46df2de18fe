//! Common test utilities
//!
//! Builds a full relay (registry, session store, router, gateway) over
//! the in-memory store and provides a lightweight client abstraction
//! that talks to the router the way the socket reader loop does.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use uuid::Uuid;

use vigia::backend::auth::{CloseAuthorizer, TokenVerifier};
use vigia::backend::chat::{ChatSessionStore, MessageRouter};
use vigia::backend::realtime::{BroadcastEngine, RealtimeGateway};
use vigia::backend::registry::{Connection, ConnectionRegistry};
use vigia::backend::store::memory::MemoryStore;
use vigia::shared::frame::{ClientFrame, ServerFrame};
use vigia::shared::types::MessageKind;

pub const TEST_SECRET: &str = "integration-test-secret";

/// A fully wired relay over the in-memory store
pub struct Relay {
    pub registry: Arc<ConnectionRegistry>,
    pub sessions: Arc<ChatSessionStore>,
    pub store: Arc<MemoryStore>,
    pub router: Arc<MessageRouter>,
    pub gateway: RealtimeGateway,
    pub verifier: TokenVerifier,
}

impl Relay {
    pub fn new() -> Self {
        Self::with_policy(CloseAuthorizer::OwnerOnly)
    }

    pub fn with_policy(policy: CloseAuthorizer) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let store = Arc::new(MemoryStore::new());
        let sessions = Arc::new(ChatSessionStore::new(store.clone()));
        let broadcast = BroadcastEngine::new(registry.clone());
        let verifier = TokenVerifier::new(TEST_SECRET);
        let router = Arc::new(MessageRouter::new(
            registry.clone(),
            sessions.clone(),
            store.clone(),
            broadcast.clone(),
            verifier.clone(),
            policy,
            Duration::from_secs(2),
        ));
        let gateway = RealtimeGateway::new(router.clone(), store.clone(), broadcast);

        Self {
            registry,
            sessions,
            store,
            router,
            gateway,
            verifier,
        }
    }

    /// Register a raw, unauthenticated connection
    pub fn connect(&self) -> TestClient {
        let (tx, rx) = mpsc::unbounded_channel();
        TestClient {
            conn: self.registry.register(tx),
            rx,
        }
    }

    /// Register, authenticate and assert the handshake
    pub async fn connect_as(&self, user_id: Uuid) -> TestClient {
        self.connect_with_role(user_id, None).await
    }

    pub async fn connect_with_role(&self, user_id: Uuid, role: Option<&str>) -> TestClient {
        let mut client = self.connect();
        let token = self
            .verifier
            .issue(user_id, role.map(str::to_string))
            .expect("token issuance");
        self.router
            .handle_frame(&client.conn, ClientFrame::Authenticate { token })
            .await;
        match client.next() {
            ServerFrame::Authenticated { user_id: id } => assert_eq!(id, user_id),
            other => panic!("Expected AUTHENTICATED, got {:?}", other),
        }
        client
    }
}

/// One simulated client connection
pub struct TestClient {
    pub conn: Arc<Connection>,
    rx: mpsc::UnboundedReceiver<String>,
}

impl TestClient {
    /// Next queued frame; panics when none is waiting
    pub fn next(&mut self) -> ServerFrame {
        let json = self.rx.try_recv().expect("expected a queued frame");
        serde_json::from_str(&json).expect("frame should parse")
    }

    /// Next queued frame, or `None` when the queue is empty
    pub fn try_next(&mut self) -> Option<ServerFrame> {
        self.rx
            .try_recv()
            .ok()
            .map(|json| serde_json::from_str(&json).expect("frame should parse"))
    }

    /// Whether the outbound queue is empty
    pub fn is_silent(&mut self) -> bool {
        self.rx.try_recv().is_err()
    }

    /// Drop the receiving side, simulating an abrupt disconnect
    pub fn break_transport(self) -> Arc<Connection> {
        self.conn
    }

    pub async fn join(&mut self, relay: &Relay, chat_id: Uuid) {
        relay
            .router
            .handle_frame(&self.conn, ClientFrame::Join { chat_id })
            .await;
        match self.next() {
            ServerFrame::RoomJoined { chat_id: id } => assert_eq!(id, chat_id),
            other => panic!("Expected ROOM_JOINED, got {:?}", other),
        }
    }

    pub async fn send_text(&mut self, relay: &Relay, chat_id: Uuid, content: &str) {
        relay
            .router
            .handle_frame(
                &self.conn,
                ClientFrame::SendMessage {
                    chat_id,
                    content: content.to_string(),
                    kind: MessageKind::Text,
                },
            )
            .await;
    }

    pub async fn close_session(&mut self, relay: &Relay, chat_id: Uuid) {
        relay
            .router
            .handle_frame(&self.conn, ClientFrame::CloseSession { chat_id })
            .await;
    }
}

//! `QuizServer` builder and server loop.
//!
//! This is the entry point for running a flagquiz server. It ties together
//! all the layers: transport → protocol → room registry → handlers, plus
//! the HTTP room API and the abandoned-room sweeper.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use flagquiz_protocol::JsonCodec;
use flagquiz_room::{RegistryConfig, RoomRegistry};
use flagquiz_transport::{Connection, Transport, WebSocketConnection, WebSocketTransport};
use tokio::net::TcpListener;

use crate::handler::{ServerState, handle_incoming};
use crate::http::{HttpState, router};
use crate::{FlagQuizError, GameSettings, QuestionBank};

/// Default time a created room may stay empty before it is swept.
pub const DEFAULT_ABANDONED_ROOM_TTL: Duration = Duration::from_secs(5 * 60);

/// Builder for configuring and starting a flagquiz server.
///
/// # Example
///
/// ```rust,no_run
/// use flagquiz::prelude::*;
///
/// # async fn run() -> Result<(), FlagQuizError> {
/// let server = QuizServer::builder()
///     .bind("0.0.0.0:8081")
///     .http("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct QuizServerBuilder {
    bind_addr: String,
    http_addr: Option<String>,
    registry_config: RegistryConfig,
    game_settings: GameSettings,
    questions: Option<QuestionBank>,
    abandoned_room_ttl: Duration,
}

impl QuizServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8081".to_string(),
            http_addr: None,
            registry_config: RegistryConfig::default(),
            game_settings: GameSettings::default(),
            questions: None,
            abandoned_room_ttl: DEFAULT_ABANDONED_ROOM_TTL,
        }
    }

    /// Sets the WebSocket listen address.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Serves the HTTP room API on this address. Without it, rooms can
    /// only be created through [`QuizServer::registry`].
    pub fn http(mut self, addr: &str) -> Self {
        self.http_addr = Some(addr.to_string());
        self
    }

    pub fn registry_config(mut self, config: RegistryConfig) -> Self {
        self.registry_config = config;
        self
    }

    pub fn game_settings(mut self, settings: GameSettings) -> Self {
        self.game_settings = settings;
        self
    }

    /// Replaces the bundled country list.
    pub fn question_bank(mut self, questions: QuestionBank) -> Self {
        self.questions = Some(questions);
        self
    }

    pub fn abandoned_room_ttl(mut self, ttl: Duration) -> Self {
        self.abandoned_room_ttl = ttl;
        self
    }

    /// Binds the listeners.
    pub async fn build(self) -> Result<QuizServer, FlagQuizError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let http_listener = match &self.http_addr {
            Some(addr) => Some(TcpListener::bind(addr).await?),
            None => None,
        };
        let questions = match self.questions {
            Some(bank) => bank,
            None => QuestionBank::builtin()?,
        };

        let state = Arc::new(ServerState {
            registry: Arc::new(RoomRegistry::new(self.registry_config)),
            codec: JsonCodec,
            settings: self.game_settings,
        });

        Ok(QuizServer {
            transport,
            http_listener,
            state,
            questions: Arc::new(questions),
            abandoned_room_ttl: self.abandoned_room_ttl,
        })
    }
}

impl Default for QuizServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound flagquiz server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct QuizServer {
    transport: WebSocketTransport,
    http_listener: Option<TcpListener>,
    state: Arc<ServerState<WebSocketConnection>>,
    questions: Arc<QuestionBank>,
    abandoned_room_ttl: Duration,
}

impl QuizServer {
    /// Creates a new builder.
    pub fn builder() -> QuizServerBuilder {
        QuizServerBuilder::new()
    }

    /// Returns the WebSocket listen address.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns the HTTP listen address, if the HTTP API is enabled.
    pub fn http_addr(&self) -> Option<std::io::Result<SocketAddr>> {
        self.http_listener.as_ref().map(TcpListener::local_addr)
    }

    /// The room registry, shared with every handler.
    pub fn registry(&self) -> Arc<RoomRegistry<WebSocketConnection>> {
        Arc::clone(&self.state.registry)
    }

    /// Runs the server.
    ///
    /// Starts the HTTP API and the sweeper, then accepts sockets and
    /// spawns a handler task for each. The WebSocket upgrade runs inside
    /// that task, never in the accept loop. Runs until the
    /// process is terminated.
    pub async fn run(mut self) -> Result<(), FlagQuizError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "flagquiz server running");

        tokio::spawn(sweep_abandoned_rooms(
            Arc::clone(&self.state.registry),
            self.abandoned_room_ttl,
        ));

        if let Some(listener) = self.http_listener.take() {
            let app = router(Arc::new(HttpState {
                registry: Arc::clone(&self.state.registry),
                questions: Arc::clone(&self.questions),
            }));
            tracing::info!(addr = ?listener.local_addr().ok(), "http api listening");
            tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, app).await {
                    tracing::error!(error = %e, "http server stopped");
                }
            });
        }

        loop {
            match self.transport.accept().await {
                Ok(pending) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_incoming(pending, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Periodically removes rooms that were created but never joined.
async fn sweep_abandoned_rooms<C: Connection>(registry: Arc<RoomRegistry<C>>, ttl: Duration) {
    let period = (ttl / 2).max(Duration::from_millis(10));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let removed = registry.sweep_abandoned(ttl).await;
        if !removed.is_empty() {
            tracing::info!(count = removed.len(), "swept abandoned rooms");
        }
    }
}

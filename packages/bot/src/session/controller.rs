//! Connection lifecycle: host failover, join negotiation, event dispatch.

use std::{collections::VecDeque, future::Future, pin::Pin, sync::Arc};

use tokio::time::Instant;

use crate::config::{ConfigError, SessionConfig};
use crate::infrastructure::dto::socketio::{EditUpdate, LobbyAnnouncement, events};
use crate::infrastructure::transport::{
    Connection, ConnectionEvent, Connector, Outbound, TransportError,
};

use super::{JoinNegotiator, JoinStep, RoomSession, SessionError, SessionState, policy};

/// What woke the event loop
enum Wake {
    Shutdown,
    Event(Option<ConnectionEvent>),
    JoinDeadline,
}

/// Owns the connection and walks the candidate hosts until one of them
/// gets us into the room, then feeds room events to [`RoomSession`].
pub struct SessionController<C: Connector> {
    connector: C,
    config: Arc<SessionConfig>,
    state: SessionState,
    room: RoomSession,
    negotiator: JoinNegotiator,
}

impl<C: Connector> SessionController<C> {
    /// Create a controller for a validated `config`
    pub fn new(connector: C, config: SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let room = RoomSession::new(Arc::new(config));
        Ok(Self::with_room(connector, room))
    }

    /// Create a controller around an existing room session
    pub fn with_room(connector: C, room: RoomSession) -> Self {
        let config = room.config().clone();
        let negotiator =
            JoinNegotiator::new(config.join_requests.clone(), config.join_retry_interval);
        Self {
            connector,
            config,
            state: SessionState::Disconnected,
            room,
            negotiator,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn room(&self) -> &RoomSession {
        &self.room
    }

    /// Run until `shutdown` resolves or every host has failed.
    ///
    /// Hosts are tried in order. A host is dropped after a transport error,
    /// a lost connection or an unanswered join, and the next one is tried.
    /// A host we were already in the room on is dialled again with backoff
    /// first, see [`policy::next_reconnect_attempt`].
    pub async fn run<S>(&mut self, shutdown: S) -> Result<(), SessionError>
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut hosts: VecDeque<String> = self.config.hosts.iter().cloned().collect();
        let mut reconnect = 0;

        while let Some(host) = hosts.front().cloned() {
            if reconnect > 0 {
                let delay = policy::reconnect_delay(
                    self.config.reconnect_delay,
                    self.config.max_reconnect_delay,
                    reconnect,
                );
                tracing::info!(
                    "Reconnecting to {} in {:?} (attempt {}/{})",
                    host,
                    delay,
                    reconnect,
                    self.config.reconnect_attempts
                );
                let interrupted = tokio::select! {
                    biased;
                    _ = shutdown.as_mut() => true,
                    _ = tokio::time::sleep(delay) => false,
                };
                if interrupted {
                    tracing::info!("Shutdown requested while waiting to reconnect");
                    self.set_state(SessionState::Disconnected);
                    return Ok(());
                }
            }

            self.set_state(SessionState::Connecting(host.clone()));

            let connected = tokio::select! {
                biased;
                _ = shutdown.as_mut() => None,
                result = self.connector.connect(&host) => Some(result),
            };
            let Some(connected) = connected else {
                tracing::info!("Shutdown requested while connecting to {}", host);
                self.set_state(SessionState::Disconnected);
                return Ok(());
            };

            let (result, was_joined) = match connected {
                Ok(mut connection) => {
                    self.room.clear_roster();
                    let result = self
                        .drive(&host, connection.as_mut(), shutdown.as_mut())
                        .await;
                    let was_joined = self.state.is_joined();
                    self.room.abandon_output();
                    self.negotiator.reset();
                    connection.close().await;
                    (result, was_joined)
                }
                Err(source) => {
                    let error = SessionError::Transport {
                        host: host.clone(),
                        source,
                    };
                    (Err(error), false)
                }
            };

            let Err(e) = result else {
                tracing::info!("Disconnected from {}", host);
                self.set_state(SessionState::Disconnected);
                return Ok(());
            };

            match policy::next_reconnect_attempt(
                &e,
                was_joined,
                reconnect,
                self.config.reconnect_attempts,
            ) {
                Some(attempt) => {
                    tracing::warn!("{}; reconnecting to the same host", e);
                    reconnect = attempt;
                }
                None => {
                    tracing::warn!("{}; trying next host", e);
                    hosts.pop_front();
                    reconnect = 0;
                }
            }
        }

        self.set_state(SessionState::Disconnected);
        tracing::error!("Exhausted all {} hosts", self.config.hosts.len());
        Err(SessionError::HostsExhausted)
    }

    /// Event loop for one connection. `Ok(())` means shutdown was requested.
    async fn drive<S>(
        &mut self,
        host: &str,
        connection: &mut dyn Connection,
        mut shutdown: Pin<&mut S>,
    ) -> Result<(), SessionError>
    where
        S: Future<Output = ()>,
    {
        let outbound = connection.outbound();

        loop {
            let deadline = self.negotiator.deadline();
            let wake = tokio::select! {
                biased;
                _ = shutdown.as_mut() => Wake::Shutdown,
                event = connection.next_event() => Wake::Event(event),
                _ = join_deadline(deadline) => Wake::JoinDeadline,
            };

            match wake {
                Wake::Shutdown => {
                    tracing::info!("Shutting down; clearing our text");
                    self.room.abandon_output();
                    outbound.emit(events::CHAT_UPDATE, &EditUpdate::full_replace(""));
                    return Ok(());
                }
                Wake::Event(Some(event)) => self.handle_event(host, event, &outbound)?,
                Wake::Event(None) => {
                    return Err(SessionError::ConnectionLost {
                        host: host.to_string(),
                    });
                }
                Wake::JoinDeadline => {
                    let step = self.negotiator.on_deadline(Instant::now());
                    self.apply_join_step(host, step, &outbound)?;
                }
            }
        }
    }

    fn handle_event(
        &mut self,
        host: &str,
        event: ConnectionEvent,
        outbound: &Outbound,
    ) -> Result<(), SessionError> {
        match event {
            ConnectionEvent::Connected => {
                if !matches!(self.state, SessionState::Connecting(_)) {
                    tracing::debug!("Ignoring repeated connect on {}", host);
                    return Ok(());
                }
                tracing::info!("Connected to {}; announcing in lobby", host);
                outbound.emit(
                    events::JOIN_LOBBY,
                    &LobbyAnnouncement {
                        username: self.config.username.clone(),
                        location: self.config.location.clone(),
                        guest_id: self.config.guest_id.clone(),
                    },
                );
                let step = self.negotiator.start(Instant::now());
                self.apply_join_step(host, step, outbound)
            }
            ConnectionEvent::ConnectError(reason) => Err(SessionError::Transport {
                host: host.to_string(),
                source: TransportError::Rejected(reason),
            }),
            ConnectionEvent::ServerError(message) => {
                tracing::warn!("Server error: {}", message);
                Ok(())
            }
            ConnectionEvent::Notice(message) => {
                tracing::info!("Notice: {}", message);
                Ok(())
            }
            ConnectionEvent::RoomJoined(payload) => {
                if self.negotiator.confirm() {
                    tracing::info!("Joined room {} on {}", self.config.room_id, host);
                    self.set_state(SessionState::Joined(host.to_string()));
                    self.room.on_room_joined(payload, outbound);
                } else {
                    tracing::debug!(
                        "Ignoring join confirmation ({:?})",
                        self.negotiator.status()
                    );
                }
                Ok(())
            }
            other if !self.state.is_joined() => {
                tracing::debug!("Not in the room yet; dropping {:?}", other);
                Ok(())
            }
            ConnectionEvent::UserJoined(user) => {
                self.room.on_user_joined(user);
                Ok(())
            }
            ConnectionEvent::UserLeft(identity) => {
                self.room.on_user_left(&identity);
                Ok(())
            }
            ConnectionEvent::ChatUpdate(payload) => {
                self.room.on_chat_update(payload, outbound);
                Ok(())
            }
        }
    }

    fn apply_join_step(
        &mut self,
        host: &str,
        step: JoinStep,
        outbound: &Outbound,
    ) -> Result<(), SessionError> {
        match step {
            JoinStep::Send { attempt, request } => {
                tracing::info!(
                    "Join attempt {}/{}: '{}' {}",
                    attempt,
                    self.config.join_requests.len(),
                    request.event,
                    request.payload
                );
                outbound.send(&request.event, request.payload);
                self.set_state(SessionState::AwaitingJoin {
                    host: host.to_string(),
                    attempt,
                });
                Ok(())
            }
            JoinStep::Exhausted { attempts } => Err(SessionError::JoinExhausted {
                host: host.to_string(),
                attempts,
            }),
            JoinStep::Idle => Ok(()),
        }
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            tracing::debug!("Session state: {} -> {}", self.state, state);
            self.state = state;
        }
    }
}

/// Resolves at the join retry deadline, or never when there is none
async fn join_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

//! Gateway session
//!
//! Owns the WebSocket lifecycle: connect → Hello → Identify/Resume →
//! dispatch loop → close → reconnect. All mutable session state lives on
//! this task; the public surface talks to it through a command channel
//! and listens on the event bus.

mod backoff;
mod heartbeat;
mod state;

pub use backoff::Backoff;
pub use heartbeat::{Heartbeat, WatchdogVerdict, ACK_DEADLINE, MAX_MISSED_ACKS};
pub use state::{DeferredDispatch, GuildRecord, SessionSnapshot, SessionState};

use std::collections::HashMap;
use std::sync::Arc;

use accord_cache::{keys, CachePool};
use accord_core::{Snowflake, User, VoiceState};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep_until, Duration, Instant};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};

use crate::chunker::{ChunkerAction, MemberChunker};
use crate::dispatch::{handlers, Dispatcher, HandlerOutcome};
use crate::error::{GatewayError, VoiceJoinError};
use crate::events::{lifecycle, names, EventBus};
use crate::protocol::{
    codec, CloseCode, GatewayPacket, GuildMembersChunk, HelloPayload, OpCode, ReadyPayload,
    VoiceServerUpdatePayload,
};
use crate::rest::{websocket_url, Encoding, RestClient};
use crate::voice::{PendingVoiceJoin, VoiceClient, VoiceClientTable};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsReader = SplitStream<WsStream>;
type WsSink = SplitSink<WsStream, Message>;

/// Timeout for receiving Hello after the socket opens
const HELLO_TIMEOUT: Duration = Duration::from_secs(30);

/// Commands from the public surface into the session task
#[derive(Debug)]
pub(crate) enum Command {
    UpdatePresence {
        game: Option<String>,
        idle_since: Option<u64>,
    },
    JoinVoice {
        channel_id: Snowflake,
        self_mute: bool,
        self_deaf: bool,
        reply: oneshot::Sender<Result<Arc<VoiceClient>, VoiceJoinError>>,
    },
    LeaveVoice {
        guild_id: Snowflake,
    },
}

/// Items the writer task consumes
#[derive(Debug)]
enum Outbound {
    Packet(GatewayPacket),
    /// Send a close frame and stop writing
    Close(u16),
}

/// How the event loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopEnd {
    /// Transport gone or server asked us to move; reconnect
    Reconnect,
}

/// Static session configuration
#[derive(Debug, Clone)]
pub(crate) struct SessionConfig {
    pub token: String,
    pub shard: Option<(u16, u16)>,
    pub encoding: Encoding,
    pub load_all_members: bool,
}

/// The gateway session task
pub(crate) struct Session {
    config: SessionConfig,
    state: SessionState,
    dispatcher: Dispatcher,
    bus: EventBus,
    cache: Arc<dyn CachePool>,
    rest: RestClient,
    chunker: MemberChunker,
    voice_clients: Arc<VoiceClientTable>,
    pending_voice: HashMap<Snowflake, PendingVoiceJoin>,
    commands_rx: mpsc::Receiver<Command>,
    commands_tx: mpsc::Sender<Command>,
    me_tx: watch::Sender<Option<User>>,
}

impl Session {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        config: SessionConfig,
        dispatcher: Dispatcher,
        bus: EventBus,
        cache: Arc<dyn CachePool>,
        voice_clients: Arc<VoiceClientTable>,
        commands_tx: mpsc::Sender<Command>,
        commands_rx: mpsc::Receiver<Command>,
        me_tx: watch::Sender<Option<User>>,
    ) -> Self {
        let rest = RestClient::new(config.token.clone());
        let chunker = MemberChunker::new(config.load_all_members);
        Self {
            config,
            state: SessionState::new(),
            dispatcher,
            bus,
            cache,
            rest,
            chunker,
            voice_clients,
            pending_voice: HashMap::new(),
            commands_rx,
            commands_tx,
            me_tx,
        }
    }

    /// Run until a terminal error
    ///
    /// Transient failures reconnect with capped full-jitter backoff; only
    /// token invalidity returns.
    pub(crate) async fn run(&mut self) -> Result<(), GatewayError> {
        let mut backoff = Backoff::default();
        loop {
            match self.connect_and_run(&mut backoff).await {
                Ok(LoopEnd::Reconnect) => {}
                Err(GatewayError::InvalidToken) => {
                    self.cancel_pending_voice();
                    return Err(GatewayError::InvalidToken);
                }
                Err(e) => {
                    warn!(error = %e, "Gateway connection error");
                }
            }

            self.state.begin_reconnect();
            let delay = backoff.next_delay();
            info!(
                delay_ms = delay.as_millis() as u64,
                attempt = self.state.reconnect_count,
                "Reconnecting after backoff"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Single connection attempt: discover, connect, handshake, run
    async fn connect_and_run(&mut self, backoff: &mut Backoff) -> Result<LoopEnd, GatewayError> {
        let base = self.rest.gateway_url_or_default().await;
        let url = websocket_url(&base, self.config.encoding);
        info!(url = %url, "Connecting to gateway");

        let (ws, _response) = connect_async(&url).await?;
        let (ws_sink, mut reader) = ws.split();

        let hello = self.wait_for_hello(&mut reader).await?;
        debug!(interval_ms = hello.heartbeat_interval, "Hello received");
        if let Some(trace_data) = &hello.trace {
            self.bus.emit(lifecycle::TRACE, trace_data.clone());
        }

        let (outbound_tx, outbound_rx) = mpsc::channel::<Outbound>(64);
        let mut writer_handle = spawn_writer(ws_sink, outbound_rx);

        // Handshake choice: RESUME iff reconnecting with a session id
        let auth = if self.state.should_resume() {
            info!(
                session_id = self.state.session_id.as_deref().unwrap_or(""),
                seq = self.state.seq.unwrap_or(0),
                "Resuming session"
            );
            GatewayPacket::resume(
                &self.config.token,
                self.state.session_id.as_deref().unwrap_or(""),
                self.state.seq.unwrap_or(0),
            )
        } else {
            info!("Identifying");
            GatewayPacket::identify(&self.config.token, self.config.shard)
        };
        if outbound_tx.send(Outbound::Packet(auth)).await.is_err() {
            return Err(GatewayError::Protocol("writer channel closed".to_string()));
        }

        // Arm the heartbeat schedule and send one immediate beat
        let mut heartbeat = Heartbeat::new(hello.heartbeat_interval);
        self.send_heartbeat(&mut heartbeat, &outbound_tx).await;

        let result = self
            .event_loop(&mut reader, &outbound_tx, &mut heartbeat, backoff)
            .await;

        // Let the writer drain, then stop it
        drop(outbound_tx);
        tokio::select! {
            _ = &mut writer_handle => {}
            () = tokio::time::sleep(Duration::from_secs(2)) => {
                writer_handle.abort();
            }
        }

        result
    }

    /// Wait for the Hello frame that opens every connection
    async fn wait_for_hello(&mut self, reader: &mut WsReader) -> Result<HelloPayload, GatewayError> {
        let hello_fut = async {
            loop {
                match reader.next().await {
                    Some(Ok(Message::Close(frame))) => {
                        let code = frame.as_ref().map_or(1000, |f| f.code.into());
                        self.check_close_code(code)?;
                        return Err(GatewayError::Closed(code));
                    }
                    Some(Ok(message)) => {
                        let Some(packet) = codec::decode(&message)? else {
                            continue;
                        };
                        if packet.opcode() == Some(OpCode::Hello) {
                            let data = packet.d.ok_or_else(|| {
                                GatewayError::Protocol("Hello missing data".to_string())
                            })?;
                            return Ok(serde_json::from_value(data)?);
                        }
                        debug!(op = packet.op, "Frame before Hello ignored");
                    }
                    Some(Err(e)) => return Err(e.into()),
                    None => {
                        return Err(GatewayError::Protocol(
                            "connection closed before Hello".to_string(),
                        ))
                    }
                }
            }
        };

        tokio::time::timeout(HELLO_TIMEOUT, hello_fut)
            .await
            .map_err(|_| GatewayError::HelloTimeout)?
    }

    /// The dispatch loop: frames, heartbeats, watchdog, chunker pacing,
    /// voice-join timeouts, and public commands
    async fn event_loop(
        &mut self,
        reader: &mut WsReader,
        outbound: &mpsc::Sender<Outbound>,
        heartbeat: &mut Heartbeat,
        backoff: &mut Backoff,
    ) -> Result<LoopEnd, GatewayError> {
        let mut next_beat = Instant::now() + heartbeat.interval();

        loop {
            let watchdog = heartbeat.watchdog_deadline();
            let chunk_deadline = self.chunker.next_deadline();
            let voice_deadline = self.pending_voice.values().map(|j| j.deadline).min();
            let now = Instant::now();

            tokio::select! {
                biased;

                maybe_message = reader.next() => {
                    match maybe_message {
                        Some(Ok(Message::Close(frame))) => {
                            let code = frame.as_ref().map_or(1000, |f| f.code.into());
                            self.check_close_code(code)?;
                            warn!(code, "Gateway connection closed");
                            return Ok(LoopEnd::Reconnect);
                        }
                        Some(Ok(message)) => {
                            let packet = match codec::decode(&message) {
                                Ok(Some(packet)) => packet,
                                Ok(None) => continue,
                                Err(e) => {
                                    warn!(error = %e, "Failed to decode frame");
                                    continue;
                                }
                            };
                            if let Some(end) = self
                                .handle_packet(packet, outbound, heartbeat, backoff)
                                .await
                            {
                                return Ok(end);
                            }
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "WebSocket read error");
                            return Ok(LoopEnd::Reconnect);
                        }
                        None => {
                            warn!("WebSocket stream ended");
                            return Ok(LoopEnd::Reconnect);
                        }
                    }
                }

                () = sleep_until(next_beat) => {
                    self.send_heartbeat(heartbeat, outbound).await;
                    next_beat += heartbeat.interval();
                }

                () = sleep_until(watchdog.unwrap_or(now)), if watchdog.is_some() => {
                    match heartbeat.on_watchdog_fired() {
                        WatchdogVerdict::Resend => {
                            warn!("Heartbeat ACK missed; re-sending");
                            self.send_heartbeat(heartbeat, outbound).await;
                        }
                        WatchdogVerdict::Reconnect => {
                            warn!("Heartbeat ACKs exhausted; connection presumed dead");
                            return Ok(LoopEnd::Reconnect);
                        }
                    }
                }

                () = sleep_until(chunk_deadline.unwrap_or(now)), if chunk_deadline.is_some() => {
                    let poll_now = Instant::now();
                    match self.chunker.poll(&mut self.state, poll_now) {
                        ChunkerAction::Send(guild_ids) => {
                            debug!(count = guild_ids.len(), "Requesting member chunk");
                            let packet = GatewayPacket::request_guild_members(&guild_ids);
                            let _ = outbound.send(Outbound::Packet(packet)).await;
                        }
                        ChunkerAction::Ready => self.ready(),
                        ChunkerAction::None => {}
                    }
                }

                () = sleep_until(voice_deadline.unwrap_or(now)), if voice_deadline.is_some() => {
                    self.expire_voice_joins(Instant::now());
                }

                maybe_command = self.commands_rx.recv() => {
                    match maybe_command {
                        Some(command) => self.handle_command(command, outbound).await,
                        // All public handles dropped; nothing left to serve
                        None => return Ok(LoopEnd::Reconnect),
                    }
                }
            }
        }
    }

    /// Handle one decoded inbound packet
    ///
    /// Returns `Some` when the event loop should end.
    async fn handle_packet(
        &mut self,
        packet: GatewayPacket,
        outbound: &mpsc::Sender<Outbound>,
        heartbeat: &mut Heartbeat,
        backoff: &mut Backoff,
    ) -> Option<LoopEnd> {
        self.bus.emit(
            lifecycle::RAW,
            serde_json::to_value(&packet).unwrap_or_default(),
        );

        match packet.opcode() {
            Some(OpCode::Dispatch) => {
                self.handle_dispatch(packet, backoff);
                None
            }
            Some(OpCode::Heartbeat) => {
                // Server-requested beat; the periodic schedule is untouched
                let beat = GatewayPacket::heartbeat(self.state.seq);
                let _ = outbound.send(Outbound::Packet(beat)).await;
                None
            }
            Some(OpCode::Reconnect) => {
                info!("Server requested reconnect");
                let _ = outbound.send(Outbound::Close(CloseCode::Normal.as_u16())).await;
                Some(LoopEnd::Reconnect)
            }
            Some(OpCode::InvalidSession) => {
                // Force a fresh identify on this connection, never a resume
                info!("Session invalidated; re-identifying");
                self.state.session_id = None;
                let identify = GatewayPacket::identify(&self.config.token, self.config.shard);
                let _ = outbound.send(Outbound::Packet(identify)).await;
                None
            }
            Some(OpCode::Hello) => {
                warn!("Unexpected Hello mid-session");
                None
            }
            Some(OpCode::HeartbeatAck) => {
                if let Some(rtt) = heartbeat.on_ack(Instant::now()) {
                    self.bus.emit(
                        lifecycle::HEARTBEAT_ACK,
                        json!({ "rtt_ms": rtt.as_millis() as u64 }),
                    );
                }
                None
            }
            _ => {
                debug!(op = packet.op, "Unknown opcode ignored");
                None
            }
        }
    }

    /// Route an op=0 dispatch frame
    fn handle_dispatch(&mut self, packet: GatewayPacket, backoff: &mut Backoff) {
        let name = packet.t.unwrap_or_default();
        let data = packet.d.unwrap_or(Value::Null);

        // Sequence update precedes handler dispatch for the same frame
        self.state.observe_sequence(packet.s);
        backoff.reset();

        let was_reconnecting = self.state.reconnecting;
        if was_reconnecting {
            self.state.reconnecting = false;
            info!(event = %name, "First dispatch after reconnect");
            self.bus.emit(lifecycle::RECONNECTED, Value::Null);
        }

        self.dispatcher
            .dispatch(&mut self.state, self.cache.as_ref(), &self.bus, &name, data.clone());

        // Protocol-internal handlers; never deferred
        match name.as_str() {
            names::READY => self.handle_ready(&data, was_reconnecting),
            names::RESUMED => debug!("Session resumed"),
            names::GUILD_CREATE => self.handle_guild_create(&data),
            names::GUILD_MEMBERS_CHUNK => self.handle_members_chunk(&data),
            names::VOICE_STATE_UPDATE => self.handle_voice_state(&data),
            names::VOICE_SERVER_UPDATE => self.handle_voice_server(&data),
            _ => {}
        }
    }

    /// READY bootstrap
    fn handle_ready(&mut self, data: &Value, was_reconnecting: bool) {
        if was_reconnecting {
            // The cached view is kept across a resume
            debug!("READY after reconnect; keeping cached view");
            return;
        }

        let ready: ReadyPayload = match serde_json::from_value(data.clone()) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Malformed READY payload");
                return;
            }
        };

        if let Some(trace_data) = &ready.trace {
            self.bus.emit(lifecycle::TRACE, trace_data.clone());
        }

        self.state.session_id = Some(ready.session_id.clone());
        self.cache.put(
            &keys::user(ready.user.id),
            serde_json::to_value(&ready.user).unwrap_or_default(),
        );
        self.me_tx.send_replace(Some(ready.user.clone()));
        self.state.me = Some(ready.user);

        for private in ready.private_channels {
            if let Some(recipient) = private.recipient() {
                self.cache.put(
                    &keys::private_channel(recipient.id),
                    serde_json::to_value(&private).unwrap_or_default(),
                );
            }
            self.state.private_channels.insert(private.id, private);
        }

        for guild_data in &ready.guilds {
            match handlers::guild_create(&mut self.state, self.cache.as_ref(), guild_data) {
                HandlerOutcome::Notify(note) => {
                    if let Ok(guild_id) =
                        serde_json::from_value::<Snowflake>(note["guild_id"].clone())
                    {
                        self.state.unavailable.insert(guild_id);
                    }
                }
                HandlerOutcome::Failure(error) => {
                    warn!(error = %error, "Guild stub rejected during bootstrap");
                }
                HandlerOutcome::Success(_) => {}
            }
        }

        info!(
            session_id = self.state.session_id.as_deref().unwrap_or(""),
            guilds = ready.guilds.len(),
            unavailable = self.state.unavailable.len(),
            "Session established (READY)"
        );

        if self.state.unavailable.is_empty() {
            self.after_bootstrap();
        }
    }

    /// Track unavailable-guild arrivals during bootstrap
    fn handle_guild_create(&mut self, data: &Value) {
        if self.state.emitted_ready {
            return;
        }
        let Some(guild_id) = data
            .get("id")
            .and_then(|v| serde_json::from_value::<Snowflake>(v.clone()).ok())
        else {
            return;
        };

        if self.state.unavailable.remove(&guild_id) && self.state.unavailable.is_empty() {
            self.after_bootstrap();
        }
    }

    /// All guilds are online; either chunk members or declare ready
    fn after_bootstrap(&mut self) {
        if self.chunker.enabled() {
            self.chunker.activate(Instant::now());
        } else {
            self.ready();
        }
    }

    /// Hydrate a member-chunk response and advance the backfill
    fn handle_members_chunk(&mut self, data: &Value) {
        let chunk: GuildMembersChunk = match serde_json::from_value(data.clone()) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Malformed GUILD_MEMBERS_CHUNK payload");
                return;
            }
        };

        let Some(record) = self.state.guilds.get_mut(&chunk.guild_id) else {
            debug!(guild_id = %chunk.guild_id, "Member chunk for unknown guild");
            return;
        };

        for mut member in chunk.members {
            if record.members.contains_key(&member.user.id) {
                continue;
            }
            member.guild_id = Some(chunk.guild_id);
            self.cache.put(
                &keys::guild_member(chunk.guild_id, member.user.id),
                serde_json::to_value(&member).unwrap_or_default(),
            );
            self.cache.put(
                &keys::user(member.user.id),
                serde_json::to_value(&member.user).unwrap_or_default(),
            );
            record.members.insert(member.user.id, member);
        }

        trace!(
            guild_id = %chunk.guild_id,
            members = record.members.len(),
            expected = record.member_count,
            "Member chunk applied"
        );

        if record.members_complete() {
            self.state.large_sent.remove(&chunk.guild_id);
            if self.chunker.is_active()
                && self.state.large_sent.is_empty()
                && self.state.large_guilds.is_empty()
            {
                self.ready();
            }
        }
    }

    /// VOICE_STATE_UPDATE half of a pending voice join
    fn handle_voice_state(&mut self, data: &Value) {
        let Ok(voice_state) = serde_json::from_value::<VoiceState>(data.clone()) else {
            return;
        };
        let Some(me) = &self.state.me else { return };
        if voice_state.user_id != me.id {
            return;
        }
        let Some(guild_id) = voice_state.guild_id else {
            return;
        };

        if let Some(join) = self.pending_voice.get_mut(&guild_id) {
            join.observe_state(voice_state.session_id.clone());
            self.try_complete_voice(guild_id);
        }
    }

    /// VOICE_SERVER_UPDATE half of a pending voice join
    fn handle_voice_server(&mut self, data: &Value) {
        let update: VoiceServerUpdatePayload = match serde_json::from_value(data.clone()) {
            Ok(u) => u,
            Err(e) => {
                warn!(error = %e, "Malformed VOICE_SERVER_UPDATE payload");
                return;
            }
        };
        // A null endpoint means the voice server is still allocating;
        // a later update carries the real one
        let Some(endpoint) = update.endpoint else {
            return;
        };

        if let Some(join) = self.pending_voice.get_mut(&update.guild_id) {
            join.observe_server(endpoint, update.token);
            self.try_complete_voice(update.guild_id);
        }
    }

    /// Resolve a join once both halves are in
    fn try_complete_voice(&mut self, guild_id: Snowflake) {
        let complete = self
            .pending_voice
            .get(&guild_id)
            .is_some_and(PendingVoiceJoin::is_complete);
        if !complete {
            return;
        }

        if let Some(join) = self.pending_voice.remove(&guild_id) {
            if let Some(client) = join.complete(self.commands_tx.clone()) {
                info!(guild_id = %guild_id, "Voice session established");
                self.voice_clients.insert(guild_id, client);
            }
        }
    }

    /// Reject joins whose deadline has passed
    fn expire_voice_joins(&mut self, now: Instant) {
        let expired: Vec<Snowflake> = self
            .pending_voice
            .iter()
            .filter(|(_, join)| join.deadline <= now)
            .map(|(guild_id, _)| *guild_id)
            .collect();

        for guild_id in expired {
            if let Some(join) = self.pending_voice.remove(&guild_id) {
                warn!(guild_id = %guild_id, "Voice join timed out");
                join.reject(VoiceJoinError::Timeout);
            }
        }
    }

    /// Reject every in-flight join; used on terminal shutdown
    fn cancel_pending_voice(&mut self) {
        for (_, join) in self.pending_voice.drain() {
            join.reject(VoiceJoinError::Cancelled);
        }
    }

    /// Emit `ready` at most once, then drain the deferred queue in order
    fn ready(&mut self) {
        if self.state.emitted_ready {
            return;
        }
        self.state.emitted_ready = true;

        let snapshot = self.state.snapshot();
        info!(guilds = snapshot.guild_ids.len(), "Ready");
        self.bus
            .emit_with_snapshot(lifecycle::READY, Value::Null, snapshot);
        self.dispatcher
            .drain_deferred(&mut self.state, self.cache.as_ref(), &self.bus);
    }

    /// Send a heartbeat and arm the ACK watchdog
    async fn send_heartbeat(&mut self, heartbeat: &mut Heartbeat, outbound: &mpsc::Sender<Outbound>) {
        let seq = self.state.seq;
        debug!(seq = seq.unwrap_or(0), "Sending heartbeat");
        if outbound
            .send(Outbound::Packet(GatewayPacket::heartbeat(seq)))
            .await
            .is_err()
        {
            return;
        }
        heartbeat.on_send(Instant::now());
        self.bus.emit(lifecycle::HEARTBEAT, json!({ "seq": seq }));
    }

    /// Terminal close codes become errors; everything else reconnects
    fn check_close_code(&mut self, code: u16) -> Result<(), GatewayError> {
        if CloseCode::is_fatal(code) {
            error!(code, "Gateway rejected the token");
            let err = GatewayError::InvalidToken;
            self.bus
                .emit(lifecycle::ERROR, json!({ "message": err.to_string() }));
            return Err(err);
        }
        Ok(())
    }

    /// Serve one public command
    async fn handle_command(&mut self, command: Command, outbound: &mpsc::Sender<Outbound>) {
        match command {
            Command::UpdatePresence { game, idle_since } => {
                let packet = GatewayPacket::presence_update(game.as_deref(), idle_since);
                let _ = outbound.send(Outbound::Packet(packet)).await;
            }
            Command::JoinVoice {
                channel_id,
                self_mute,
                self_deaf,
                reply,
            } => match self.validate_voice_join(channel_id) {
                Err(e) => {
                    let _ = reply.send(Err(e));
                }
                Ok((guild_id, bitrate)) => {
                    let join = PendingVoiceJoin::new(
                        guild_id,
                        channel_id,
                        self_mute,
                        self_deaf,
                        bitrate,
                        reply,
                        Instant::now(),
                    );
                    let packet = GatewayPacket::voice_state_update(
                        join.guild_id,
                        Some(join.channel_id),
                        join.self_mute,
                        join.self_deaf,
                    );
                    self.pending_voice.insert(guild_id, join);
                    let _ = outbound.send(Outbound::Packet(packet)).await;
                }
            },
            Command::LeaveVoice { guild_id } => {
                if self.voice_clients.remove(&guild_id).is_some() {
                    info!(guild_id = %guild_id, "Leaving voice channel");
                    let packet = GatewayPacket::voice_state_update(guild_id, None, false, false);
                    let _ = outbound.send(Outbound::Packet(packet)).await;
                }
            }
        }
    }

    /// Check a join attempt against the channel index and voice table
    fn validate_voice_join(
        &self,
        channel_id: Snowflake,
    ) -> Result<(Snowflake, Option<u32>), VoiceJoinError> {
        let Some((guild_id, channel)) = self.state.find_channel(channel_id) else {
            return Err(VoiceJoinError::UnknownChannel(channel_id));
        };
        if !channel.is_voice() {
            return Err(VoiceJoinError::NotVoiceChannel(channel_id));
        }
        if self.voice_clients.contains_key(&guild_id) || self.pending_voice.contains_key(&guild_id)
        {
            return Err(VoiceJoinError::AlreadyConnected(guild_id));
        }
        Ok((guild_id, channel.bitrate))
    }
}

/// Writer task: owns the sink half of the socket
fn spawn_writer(sink: WsSink, outbound_rx: mpsc::Receiver<Outbound>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(drain_outbound(sink, outbound_rx))
}

/// Drain queued sends onto the socket
///
/// Runs until the queue closes, a close frame goes out, or the sink
/// rejects a write. The sink is shut down on every exit path.
async fn drain_outbound(mut sink: WsSink, mut queue: mpsc::Receiver<Outbound>) {
    loop {
        let item = match queue.recv().await {
            Some(item) => item,
            None => break,
        };

        match item {
            Outbound::Packet(packet) => {
                let message = match codec::encode(&packet) {
                    Ok(m) => m,
                    Err(e) => {
                        error!(error = %e, "Dropping unencodable outbound packet");
                        continue;
                    }
                };
                if let Err(e) = sink.send(message).await {
                    debug!(error = %e, "Socket rejected a write; stopping outbound drain");
                    break;
                }
            }
            Outbound::Close(code) => {
                let frame = CloseFrame {
                    code: code.into(),
                    reason: "redirect".into(),
                };
                let _ = sink.send(Message::Close(Some(frame))).await;
                break;
            }
        }
    }
    let _ = sink.close().await;
}

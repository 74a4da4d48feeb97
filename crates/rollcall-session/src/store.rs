//! The session store: owns the single active session and its timers.
//!
//! The store runs as one Tokio task (actor) holding the session slot.
//! Callers talk to it through a cloneable [`SessionStore`] handle over an
//! mpsc channel; every start, stop, rotation, expiry, read, and scan
//! check is serialized through that one task. There is no lock.
//!
//! # Lifecycle
//!
//! ```text
//! start() ──→ [Live: token T0] ──(period)──→ [Live: T1] ──→ … ──→ expiry
//!    │              │                                              │
//!    │              └──(stop / superseding start)──→ [Empty] ←─────┘
//!    └── tears down any previous session first
//! ```
//!
//! # Timer ordering
//!
//! The actor's `select!` is biased: a due expiry is committed before a
//! due rotation, and both before the next command. Each command also
//! settles any timer event already due at the current instant before it
//! runs. A scan therefore never sees a token older than the last
//! rotation that has logically occurred, nor a session past its expiry.
//! Timers live inside the slot, so clearing the slot cancels them and
//! nothing from a discarded session can fire.

use std::future;

use chrono::Utc;
use rollcall_protocol::{ClassId, QrImageEncoder, SessionId};
use rollcall_tick::{TickConfig, TickInfo, TickScheduler};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};

use crate::verifier::{AttendanceConfirmation, ScanAttempt, check_scan};
use crate::{Session, SessionConfig, SessionError, TokenSource};

/// Command channel size for the store actor.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Commands sent to the store actor. Each carries a reply channel.
enum StoreCommand {
    Start {
        class_id: ClassId,
        reply: oneshot::Sender<Result<Session, SessionError>>,
    },
    Stop {
        session_id: SessionId,
        reply: oneshot::Sender<bool>,
    },
    GetActive {
        reply: oneshot::Sender<Option<Session>>,
    },
    Verify {
        scan: ScanAttempt,
        reply: oneshot::Sender<Result<AttendanceConfirmation, SessionError>>,
    },
    Shutdown,
}

/// Handle to the running store actor.
///
/// Construct once at startup with [`SessionStore::spawn`] and hand clones
/// to request handlers. Cheap to clone: it's an `mpsc::Sender` wrapper.
#[derive(Clone)]
pub struct SessionStore {
    sender: mpsc::Sender<StoreCommand>,
}

impl SessionStore {
    /// Spawns the store actor on the current Tokio runtime.
    ///
    /// # Errors
    /// Returns [`SessionError::InvalidConfig`] if the rotation period
    /// does not fit inside the lifetime.
    pub fn spawn<T, E>(
        config: SessionConfig,
        tokens: T,
        encoder: E,
    ) -> Result<Self, SessionError>
    where
        T: TokenSource,
        E: QrImageEncoder,
    {
        config.validate()?;
        let (sender, receiver) = mpsc::channel(DEFAULT_CHANNEL_SIZE);
        let actor = StoreActor {
            config,
            tokens,
            encoder,
            live: None,
            receiver,
        };
        tokio::spawn(actor.run());
        Ok(Self { sender })
    }

    /// Starts a session for `class_id`, silently replacing any active one.
    ///
    /// # Errors
    /// - [`SessionError::InvalidClass`]: `class_id` is not positive
    /// - [`SessionError::Render`]: the QR payload could not be rendered
    /// - [`SessionError::Unavailable`]: the store is gone
    pub async fn start(&self, class_id: ClassId) -> Result<Session, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(StoreCommand::Start { class_id, reply }).await?;
        rx.await.map_err(|_| SessionError::Unavailable)?
    }

    /// Stops the session if `session_id` names the active one.
    ///
    /// Returns `true` if a session was stopped. A mismatch or an empty
    /// slot is not an error.
    pub async fn stop(&self, session_id: SessionId) -> Result<bool, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(StoreCommand::Stop { session_id, reply }).await?;
        rx.await.map_err(|_| SessionError::Unavailable)
    }

    /// Returns the active session, or `None` if nothing is live.
    ///
    /// An expired session still sitting in the slot is torn down here.
    pub async fn get_active(&self) -> Result<Option<Session>, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(StoreCommand::GetActive { reply }).await?;
        rx.await.map_err(|_| SessionError::Unavailable)
    }

    /// Checks a scan inside the actor. Public entry point is
    /// [`AttendanceVerifier`](crate::AttendanceVerifier).
    pub(crate) async fn submit_scan(
        &self,
        scan: ScanAttempt,
    ) -> Result<AttendanceConfirmation, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(StoreCommand::Verify { scan, reply }).await?;
        rx.await.map_err(|_| SessionError::Unavailable)?
    }

    /// Stops the actor. The active session, if any, is discarded and
    /// every later call fails with [`SessionError::Unavailable`].
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.send(StoreCommand::Shutdown).await
    }

    async fn send(&self, cmd: StoreCommand) -> Result<(), SessionError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| SessionError::Unavailable)
    }
}

/// The occupied session slot: the session plus its rotation timer.
struct Live {
    session: Session,
    rotation: TickScheduler,
}

/// The internal store state. Runs inside a Tokio task.
struct StoreActor<T: TokenSource, E: QrImageEncoder> {
    config: SessionConfig,
    tokens: T,
    encoder: E,
    live: Option<Live>,
    receiver: mpsc::Receiver<StoreCommand>,
}

impl<T: TokenSource, E: QrImageEncoder> StoreActor<T, E> {
    /// Runs the actor loop until shutdown or until every handle is dropped.
    async fn run(mut self) {
        tracing::info!(
            lifetime_ms = self.config.lifetime.as_millis() as u64,
            rotation_ms = self.config.rotation_period.as_millis() as u64,
            "session store started"
        );

        loop {
            let deadline = self.live.as_ref().map(|l| l.session.expires_at);

            tokio::select! {
                biased;

                () = sleep_until_opt(deadline) => {
                    self.expire();
                }
                info = next_rotation(self.live.as_mut()) => {
                    self.rotate(info);
                }
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle(cmd) {
                        break;
                    }
                }
            }
        }

        if let Some(live) = self.live.take() {
            tracing::info!(
                session_id = %live.session.session_id,
                "discarding active session on store shutdown"
            );
        }
        tracing::info!("session store stopped");
    }

    /// Handles one command. Returns `false` when the actor should stop.
    fn handle(&mut self, cmd: StoreCommand) -> bool {
        self.settle(Instant::now());

        match cmd {
            StoreCommand::Start { class_id, reply } => {
                let _ = reply.send(self.handle_start(class_id));
            }
            StoreCommand::Stop { session_id, reply } => {
                let _ = reply.send(self.handle_stop(&session_id));
            }
            StoreCommand::GetActive { reply } => {
                let _ = reply.send(self.handle_get_active());
            }
            StoreCommand::Verify { scan, reply } => {
                let _ = reply.send(self.handle_verify(&scan));
            }
            StoreCommand::Shutdown => {
                tracing::info!("session store shutting down");
                return false;
            }
        }
        true
    }

    fn handle_start(&mut self, class_id: ClassId) -> Result<Session, SessionError> {
        if !class_id.is_valid() {
            return Err(SessionError::InvalidClass(class_id));
        }

        if let Some(prev) = self.live.take() {
            tracing::info!(
                session_id = %prev.session.session_id,
                class_id = %prev.session.class_id,
                "superseding active session"
            );
        }

        let expires_at_wall = chrono::Duration::from_std(self.config.lifetime)
            .ok()
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| {
                SessionError::InvalidConfig(format!(
                    "lifetime {:?} overflows the wall clock",
                    self.config.lifetime
                ))
            })?;
        let created_at = Instant::now();
        let mut session = Session {
            session_id: self.tokens.session_id(),
            class_id,
            current_token: self.tokens.rotation_token(),
            qr_payload: String::new(),
            rotation: 0,
            created_at,
            expires_at: created_at + self.config.lifetime,
            expires_at_wall,
        };
        session.qr_payload = self.encoder.encode(&session.payload())?;

        let rotation = TickScheduler::starting_at(
            TickConfig {
                period: self.config.rotation_period,
                policy: self.config.rotation_policy,
            },
            created_at,
        );

        tracing::info!(
            session_id = %session.session_id,
            %class_id,
            rotation_ms = rotation.period().as_millis() as u64,
            policy = ?rotation.policy(),
            "session started"
        );

        self.live = Some(Live {
            session: session.clone(),
            rotation,
        });
        Ok(session)
    }

    fn handle_stop(&mut self, session_id: &SessionId) -> bool {
        let is_active = self
            .live
            .as_ref()
            .map(|l| l.session.session_id == *session_id);
        match is_active {
            Some(true) => {
                if let Some(live) = self.live.take() {
                    tracing::info!(
                        %session_id,
                        rotations = live.rotation.tick_count(),
                        remaining_ms = live.session.remaining_at(Instant::now()).as_millis() as u64,
                        "session stopped"
                    );
                }
                true
            }
            Some(false) => {
                tracing::debug!(%session_id, "stop ignored: not the active session");
                false
            }
            None => {
                tracing::debug!(%session_id, "stop ignored: no active session");
                false
            }
        }
    }

    fn handle_get_active(&self) -> Option<Session> {
        self.live.as_ref().map(|l| l.session.clone())
    }

    fn handle_verify(&self, scan: &ScanAttempt) -> Result<AttendanceConfirmation, SessionError> {
        let result = check_scan(
            self.live.as_ref().map(|l| &l.session),
            scan,
            Instant::now(),
        );

        match &result {
            Ok(_) => tracing::info!(
                session_id = %scan.session_id,
                student_id = %scan.student_id,
                "scan verified"
            ),
            Err(e) => tracing::debug!(
                session_id = %scan.session_id,
                student_id = %scan.student_id,
                reason = e.code(),
                "scan rejected"
            ),
        }
        result
    }

    /// Expiry timer fired.
    fn expire(&mut self) {
        if let Some(live) = self.live.take() {
            let metrics = live.rotation.metrics();
            tracing::info!(
                session_id = %live.session.session_id,
                rotations = live.rotation.tick_count(),
                overruns = metrics.total_overruns,
                skipped = metrics.total_skipped,
                "session expired"
            );
        }
    }

    /// Commits every timer event due at `now`, expiry before rotation.
    ///
    /// Run before each command so a read or scan never races a timer
    /// wakeup that hasn't been delivered yet.
    fn settle(&mut self, now: Instant) {
        self.expire_if_due(now);
        while let Some(info) = self
            .live
            .as_mut()
            .and_then(|l| l.rotation.fire_if_due(now))
        {
            self.rotate(info);
        }
    }

    /// Lazy expiry.
    fn expire_if_due(&mut self, now: Instant) {
        let due = self
            .live
            .as_ref()
            .is_some_and(|l| !l.session.is_live_at(now));
        if due {
            self.expire();
        }
    }

    /// Rotation timer fired: mint a new token and re-render the QR.
    fn rotate(&mut self, info: TickInfo) {
        let Some(live) = self.live.as_mut() else {
            return;
        };
        let session = &mut live.session;
        session.current_token = self.tokens.rotation_token();
        session.rotation = info.tick;

        match self.encoder.encode(&session.payload()) {
            Ok(image) => {
                session.qr_payload = image;
                tracing::debug!(
                    session_id = %session.session_id,
                    rotation = info.tick,
                    overrun = info.overrun,
                    "token rotated"
                );
            }
            Err(e) => {
                // The old image still shows the retired token.
                tracing::error!(
                    session_id = %session.session_id,
                    error = %e,
                    "qr render failed during rotation, ending session"
                );
                self.live = None;
            }
        }
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}

async fn next_rotation(live: Option<&mut Live>) -> TickInfo {
    match live {
        Some(live) => live.rotation.wait_for_tick().await,
        None => future::pending().await,
    }
}

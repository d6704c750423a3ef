//! Client loop that drives (creator) or follows (viewer) one game's clock.
//!
//! Ticking, poll results and user commands are branches of a single `select!`, so the
//! engine is only ever touched by the session task. Fetches run on spawned tasks and
//! pushes on a dedicated writer task; no branch awaits the network.

use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use thiserror::Error;
use tokio::{
    sync::{mpsc, watch},
    task::{JoinError, JoinHandle},
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    clock::{
        authority::{self, Role},
        display::{Availability, LiveClock, TimerDisplay},
        drift,
        engine::{ClockEngine, ClockPhase, TickOutcome},
        gate::{ClockChange, DEFAULT_PERSIST_EVERY_TICKS, PersistenceGate},
        polling::PollingPolicy,
        structure::BlindStructure,
        sync::{GameRecord, SyncError, TimerSync},
        timer::TimerState,
    },
    dao::models::TournamentStatus,
};

const COMMAND_BUFFER: usize = 16;

/// Outcome of a spawned fetch, tagged with the game it was issued for.
type FetchResult = (Uuid, Result<GameRecord, SyncError>);

/// Snapshot queued for the writer task.
#[derive(Debug)]
struct PendingWrite {
    game_id: Uuid,
    identity: Option<String>,
    change: ClockChange,
    snapshot: TimerState,
}

/// Source of wall-clock time used to stamp and age snapshots.
pub trait WallClock: Send + Sync {
    /// Current wall-clock instant.
    fn now(&self) -> SystemTime;
}

/// [`WallClock`] backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemWallClock;

impl WallClock for SystemWallClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// User intents delivered to a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockCommand {
    /// Pause or resume the clock (creator only).
    TogglePause,
    /// Flush the current game and follow another one.
    SwitchGame(Uuid),
    /// Flush and stop the session.
    Shutdown,
}

/// Settings of one clock session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Game to follow.
    pub game_id: Uuid,
    /// Identity of the local user, if signed in.
    pub identity: Option<String>,
    /// Fetch cadence per tournament status.
    pub polling: PollingPolicy,
    /// Steady ticks between two creator writes.
    pub persist_every_ticks: u32,
    /// Countdown step.
    pub tick_period: Duration,
}

impl SessionConfig {
    /// Default cadence for `game_id` as `identity`.
    pub fn new(game_id: Uuid, identity: Option<String>) -> Self {
        Self {
            game_id,
            identity,
            polling: PollingPolicy::default(),
            persist_every_ticks: DEFAULT_PERSIST_EVERY_TICKS,
            tick_period: Duration::from_secs(1),
        }
    }
}

/// Returned when a command is sent to a session that already stopped.
#[derive(Debug, Error)]
#[error("clock session has stopped")]
pub struct SessionClosed;

/// Handle to a spawned [`ClockSession`].
pub struct SessionHandle {
    commands: mpsc::Sender<ClockCommand>,
    display: watch::Receiver<TimerDisplay>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Deliver a command to the session.
    pub async fn send(&self, command: ClockCommand) -> Result<(), SessionClosed> {
        self.commands.send(command).await.map_err(|_| SessionClosed)
    }

    /// Subscribe to display updates.
    pub fn display(&self) -> watch::Receiver<TimerDisplay> {
        self.display.clone()
    }

    /// Flush, stop the session and wait for it to exit.
    pub async fn shutdown(self) -> Result<(), JoinError> {
        // A closed channel means the loop already exited.
        let _ = self.commands.send(ClockCommand::Shutdown).await;
        self.task.await
    }
}

/// Spawn a session on the current runtime.
pub fn spawn(
    config: SessionConfig,
    sync: Arc<dyn TimerSync>,
    clock: Arc<dyn WallClock>,
) -> SessionHandle {
    let (session, display) = ClockSession::new(config, sync, clock);
    let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
    let task = tokio::spawn(session.run(receiver));
    SessionHandle {
        commands,
        display,
        task,
    }
}

/// State of one mounted clock view.
pub struct ClockSession {
    config: SessionConfig,
    sync: Arc<dyn TimerSync>,
    clock: Arc<dyn WallClock>,
    display: watch::Sender<TimerDisplay>,
    role: Role,
    status: Option<TournamentStatus>,
    stored_paused: bool,
    engine: Option<ClockEngine>,
    gate: PersistenceGate,
    writes: mpsc::UnboundedSender<PendingWrite>,
    write_queue: Option<mpsc::UnboundedReceiver<PendingWrite>>,
}

impl ClockSession {
    /// Build a session and the receiver its display snapshots are published on.
    pub fn new(
        config: SessionConfig,
        sync: Arc<dyn TimerSync>,
        clock: Arc<dyn WallClock>,
    ) -> (Self, watch::Receiver<TimerDisplay>) {
        let (display, receiver) = watch::channel(TimerDisplay::loading(config.polling.in_progress));
        let gate = PersistenceGate::new(config.persist_every_ticks);
        let (writes, write_queue) = mpsc::unbounded_channel();
        let session = Self {
            config,
            sync,
            clock,
            display,
            role: Role::Viewer,
            status: None,
            stored_paused: false,
            engine: None,
            gate,
            writes,
            write_queue: Some(write_queue),
        };
        (session, receiver)
    }

    /// Run until [`ClockCommand::Shutdown`] or until every command sender is dropped.
    ///
    /// Queued writes, including the final teardown snapshot, are flushed before returning.
    pub async fn run(mut self, mut commands: mpsc::Receiver<ClockCommand>) {
        let writer_task = self
            .write_queue
            .take()
            .map(|queue| tokio::spawn(write_timers(self.sync.clone(), queue)));
        let (fetch_tx, mut fetched) = mpsc::channel::<FetchResult>(1);
        let mut fetching = false;

        let mut ticker = time::interval(self.config.tick_period);
        // Late ticks are replayed so the countdown tracks elapsed time.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
        let mut next_poll = Instant::now();

        info!(game_id = %self.config.game_id, "clock session started");

        loop {
            let was_ticking = self.is_ticking();

            tokio::select! {
                _ = ticker.tick(), if was_ticking => self.on_tick(),
                _ = time::sleep_until(next_poll), if !fetching => {
                    fetching = true;
                    self.start_fetch(fetch_tx.clone());
                }
                Some((game_id, result)) = fetched.recv() => {
                    fetching = false;
                    if game_id == self.config.game_id {
                        self.refresh(result);
                        next_poll = Instant::now() + self.poll_interval();
                    } else {
                        debug!(%game_id, "dropping fetch issued before a game switch");
                    }
                }
                command = commands.recv() => match command {
                    Some(ClockCommand::TogglePause) => {
                        self.toggle_pause();
                        next_poll = Instant::now() + self.poll_interval();
                    }
                    Some(ClockCommand::SwitchGame(game_id)) => {
                        self.teardown();
                        self.switch_to(game_id);
                        next_poll = Instant::now();
                    }
                    Some(ClockCommand::Shutdown) | None => {
                        self.teardown();
                        break;
                    }
                },
            }

            if !was_ticking && self.is_ticking() {
                ticker.reset();
            }
        }

        let game_id = self.config.game_id;
        // Dropping the session closes the write queue.
        drop(self);
        if let Some(task) = writer_task
            && let Err(err) = task.await
        {
            warn!(%game_id, error = %err, "timer writer task failed");
        }

        info!(%game_id, "clock session stopped");
    }

    fn is_ticking(&self) -> bool {
        self.engine.as_ref().is_some_and(ClockEngine::is_ticking)
    }

    fn is_paused(&self) -> bool {
        match &self.engine {
            Some(engine) => engine.phase() == ClockPhase::Paused,
            None => self.stored_paused,
        }
    }

    fn poll_interval(&self) -> Duration {
        match self.status {
            Some(status) => self.config.polling.interval(status, self.is_paused()),
            // Unknown until the first successful fetch.
            None => self.config.polling.in_progress,
        }
    }

    fn start_fetch(&self, results: mpsc::Sender<FetchResult>) {
        let game_id = self.config.game_id;
        let fetch = self.sync.fetch(game_id);
        tokio::spawn(async move {
            let result = fetch.await;
            // The session may have stopped meanwhile.
            let _ = results.send((game_id, result)).await;
        });
    }

    fn refresh(&mut self, result: Result<GameRecord, SyncError>) {
        let game_id = self.config.game_id;
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                warn!(%game_id, error = %err, "failed to fetch game; keeping last display");
                return;
            }
        };

        let role = authority::resolve(
            self.config.identity.as_deref(),
            record.creator_id.as_deref(),
        );
        if role != self.role {
            info!(%game_id, ?role, "session role changed");
            self.role = role;
            self.engine = None;
            self.gate.reset();
        }
        self.status = Some(record.status);
        self.stored_paused = record.timer.paused;

        if record.status == TournamentStatus::Finished {
            if let Some(engine) = self.engine.as_mut() {
                engine.finish();
            }
            self.publish(Availability::Finished);
            return;
        }

        let structure = match BlindStructure::try_from(record.blind_levels.as_slice()) {
            Ok(structure) => structure,
            Err(err) => {
                warn!(%game_id, reason = %err, "blind structure unusable; clock unavailable");
                self.engine = None;
                self.publish(Availability::Unavailable);
                return;
            }
        };

        if self
            .engine
            .as_ref()
            .is_some_and(|engine| engine.structure() != &structure)
        {
            debug!(%game_id, "blind structure changed; reseeding engine");
            self.engine = None;
        }

        if record.status == TournamentStatus::Registering {
            self.engine = None;
            let preview = LiveClock::new(
                &structure,
                record.status,
                0,
                structure.duration_secs(0),
                false,
                false,
                role.can_write(),
            );
            self.publish(Availability::Live(preview));
            return;
        }

        match role {
            Role::Creator => self.refresh_creator(&record, structure),
            Role::Viewer => self.refresh_viewer(&record, &structure),
        }
    }

    fn refresh_creator(&mut self, record: &GameRecord, structure: BlindStructure) {
        let now = self.clock.now();

        if let Some(engine) = &self.engine {
            if !record.timer.is_initialized() {
                info!(game_id = %record.id, "stored timer missing; re-persisting local clock");
                self.persist(ClockChange::Seeded);
            } else {
                let correction = drift::correct(&record.timer, engine.structure(), now);
                let local = (engine.level_index(), Some(engine.seconds_remaining()));
                if (correction.level_index, correction.seconds_remaining) != local {
                    debug!(
                        game_id = %record.id,
                        stored_level = correction.level_index,
                        stored_remaining = ?correction.seconds_remaining,
                        level = local.0,
                        remaining = engine.seconds_remaining(),
                        "stored timer differs from local clock"
                    );
                }
            }
            self.publish_engine();
            return;
        }

        let mut engine = ClockEngine::new(structure);
        self.gate.reset();

        if record.timer.is_initialized() {
            let correction = drift::correct(&record.timer, engine.structure(), now);
            engine.adopt(&correction, record.timer.running, record.timer.paused);
            info!(
                game_id = %record.id,
                level = engine.level_index(),
                remaining = engine.seconds_remaining(),
                levels_advanced = correction.levels_advanced,
                "clock resumed from stored timer"
            );
            self.engine = Some(engine);
            if correction.is_critical() {
                self.persist(ClockChange::Corrected);
            }
        } else {
            if let Err(err) = engine.start() {
                warn!(game_id = %record.id, error = %err, "could not start clock");
                return;
            }
            info!(
                game_id = %record.id,
                remaining = engine.seconds_remaining(),
                "clock started at level 0"
            );
            self.engine = Some(engine);
            self.persist(ClockChange::Seeded);
        }

        self.publish_engine();
    }

    fn refresh_viewer(&mut self, record: &GameRecord, structure: &BlindStructure) {
        let correction = drift::correct(&record.timer, structure, self.clock.now());
        let seconds_remaining = correction
            .seconds_remaining
            .unwrap_or_else(|| structure.duration_secs(correction.level_index));
        let live = LiveClock::new(
            structure,
            record.status,
            correction.level_index,
            seconds_remaining,
            record.timer.running,
            record.timer.paused,
            false,
        );
        self.publish(Availability::Live(live));
    }

    fn on_tick(&mut self) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        let outcome = engine.tick();
        match outcome {
            TickOutcome::LevelAdvanced { from, to } => {
                info!(game_id = %self.config.game_id, from, to, "blind level advanced");
            }
            TickOutcome::Exhausted => {
                info!(game_id = %self.config.game_id, "last blind level exhausted; clock stopped");
            }
            TickOutcome::Idle | TickOutcome::Counted => {}
        }

        if let Some(change) = ClockChange::from_tick(outcome) {
            self.persist(change);
        }
        self.publish_engine();
    }

    fn toggle_pause(&mut self) {
        if !self.role.can_write() {
            debug!(game_id = %self.config.game_id, "pause toggle ignored for viewer");
            return;
        }
        let Some(engine) = self.engine.as_mut() else {
            debug!(game_id = %self.config.game_id, "no live clock to pause");
            return;
        };

        match engine.toggle_pause() {
            Ok(phase) => {
                info!(game_id = %self.config.game_id, ?phase, "clock pause toggled");
                self.persist(ClockChange::PauseToggled);
                self.publish_engine();
            }
            Err(err) => debug!(game_id = %self.config.game_id, error = %err, "pause toggle rejected"),
        }
    }

    fn teardown(&mut self) {
        if self.status == Some(TournamentStatus::InProgress) {
            self.persist(ClockChange::Teardown);
        }
    }

    fn switch_to(&mut self, game_id: Uuid) {
        info!(from = %self.config.game_id, to = %game_id, "switching game");
        self.config.game_id = game_id;
        self.role = Role::Viewer;
        self.status = None;
        self.stored_paused = false;
        self.engine = None;
        self.gate.reset();
        self.publish(Availability::Loading);
    }

    fn persist(&mut self, change: ClockChange) {
        let Some(engine) = &self.engine else {
            return;
        };
        if engine.phase() == ClockPhase::Finished {
            return;
        }
        let Some(change) = self.gate.decide(self.role, change) else {
            return;
        };

        let write = PendingWrite {
            game_id: self.config.game_id,
            identity: self.config.identity.clone(),
            change,
            snapshot: engine.snapshot(self.clock.now()),
        };
        if let Err(err) = self.writes.send(write) {
            warn!(game_id = %err.0.game_id, ?change, "timer writer stopped; snapshot dropped");
        }
    }

    fn publish_engine(&self) {
        let (Some(engine), Some(status)) = (&self.engine, self.status) else {
            return;
        };
        let live = LiveClock::new(
            engine.structure(),
            status,
            engine.level_index(),
            engine.seconds_remaining(),
            matches!(engine.phase(), ClockPhase::Running | ClockPhase::Paused),
            engine.phase() == ClockPhase::Paused,
            true,
        );
        self.publish(Availability::Live(live));
    }

    fn publish(&self, availability: Availability) {
        let next = TimerDisplay {
            availability,
            poll_interval: self.poll_interval(),
        };
        self.display.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

/// Push queued snapshots in order until the session drops its sender.
async fn write_timers(
    sync: Arc<dyn TimerSync>,
    mut queue: mpsc::UnboundedReceiver<PendingWrite>,
) {
    while let Some(write) = queue.recv().await {
        let PendingWrite {
            game_id,
            identity,
            change,
            snapshot,
        } = write;
        match sync.push(game_id, identity, snapshot).await {
            Ok(()) => debug!(
                %game_id,
                ?change,
                level = snapshot.level_index,
                remaining = ?snapshot.seconds_remaining,
                "timer persisted"
            ),
            Err(err) => warn!(
                %game_id,
                ?change,
                error = %err,
                "timer write failed; countdown continues"
            ),
        }
    }
}

//! The collision worker thread.

use crate::messages::{StartRequest, WorkerCommand};
use bedplate_core::{Budget, CollisionConfig, Error, PlateObject, Result};
use bedplate_d2::{CollisionDetector, CollisionEntry, CollisionJob, CollisionReport, Plate};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Owning handle to a thread running one [`CollisionDetector`].
///
/// Commands go in over one channel and reports come back over another; the
/// thread shares no memory with the host. Every [`CollisionWorker::start`]
/// supersedes the request in flight, and reports for older generations are
/// dropped on receipt.
///
/// Dropping the handle shuts the thread down and waits for it.
pub struct CollisionWorker {
    commands: Sender<WorkerCommand>,
    reports: Receiver<CollisionReport>,
    generation: Option<u64>,
    handle: Option<JoinHandle<()>>,
}

impl CollisionWorker {
    /// Spawns the worker thread.
    pub fn spawn(config: CollisionConfig) -> Result<Self> {
        let (command_tx, command_rx) = mpsc::channel();
        let (report_tx, report_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("bedplate-collision".to_owned())
            .spawn(move || {
                log::debug!("collision worker started");
                run_worker(config, command_rx, report_tx);
                log::debug!("collision worker exiting");
            })
            .map_err(|e| Error::Internal(format!("failed to spawn collision worker: {}", e)))?;

        Ok(Self {
            commands: command_tx,
            reports: report_rx,
            generation: None,
            handle: Some(handle),
        })
    }

    /// Generation of the most recent start request.
    pub fn generation(&self) -> Option<u64> {
        self.generation
    }

    /// Starts a run for `generation`, superseding any run in flight.
    pub fn start(
        &mut self,
        generation: u64,
        objects: Vec<CollisionEntry>,
        plate: Plate,
        budget_ms: u64,
    ) -> Result<()> {
        self.send(WorkerCommand::Start(StartRequest {
            generation,
            objects,
            plate,
            budget_ms,
        }))?;
        self.generation = Some(generation);
        Ok(())
    }

    /// Projects `objects` and starts a run for `generation`.
    pub fn start_objects<O: PlateObject>(
        &mut self,
        generation: u64,
        objects: &[O],
        plate: Plate,
        budget_ms: u64,
    ) -> Result<()> {
        let entries = objects.iter().map(CollisionEntry::from_object).collect();
        self.start(generation, entries, plate, budget_ms)
    }

    /// Continues the current generation's partial run with a fresh budget.
    pub fn resume(&mut self, budget_ms: u64) -> Result<()> {
        let generation = self
            .generation
            .ok_or_else(|| Error::Internal("resume before any start request".into()))?;
        self.send(WorkerCommand::Resume {
            generation,
            budget_ms,
        })
    }

    /// Returns the next current-generation report, if one is waiting.
    pub fn try_recv(&mut self) -> Result<Option<CollisionReport>> {
        loop {
            match self.reports.try_recv() {
                Ok(report) if self.is_current(&report) => return Ok(Some(report)),
                Ok(report) => self.discard(&report),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => return Err(Error::WorkerDisconnected),
            }
        }
    }

    /// Waits up to `timeout` for the next current-generation report.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<CollisionReport>> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.reports.recv_timeout(remaining) {
                Ok(report) if self.is_current(&report) => return Ok(Some(report)),
                Ok(report) => self.discard(&report),
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => return Err(Error::WorkerDisconnected),
            }
        }
    }

    /// Waits up to `timeout` for the current generation's final report, skipping partial ones.
    pub fn recv_final(&mut self, timeout: Duration) -> Result<Option<CollisionReport>> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.recv_timeout(remaining)? {
                Some(report) if report.is_final() => return Ok(Some(report)),
                Some(_) => continue,
                None => return Ok(None),
            }
        }
    }

    /// Stops the thread and waits for it to exit.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn send(&self, command: WorkerCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| Error::WorkerDisconnected)
    }

    fn is_current(&self, report: &CollisionReport) -> bool {
        self.generation == Some(report.generation)
    }

    fn discard(&self, report: &CollisionReport) {
        log::debug!(
            "discarding stale collision report for generation {} (current {:?})",
            report.generation,
            self.generation
        );
    }

    fn stop(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        // The thread may already be gone; joining tells us how it ended.
        let _ = self.commands.send(WorkerCommand::Shutdown);
        handle
            .join()
            .map_err(|_| Error::Internal("collision worker panicked".into()))
    }
}

impl Drop for CollisionWorker {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("collision worker shutdown: {}", e);
        }
    }
}

/// Folds queued commands into the one that should run next.
fn newest(mut command: WorkerCommand, inbox: &Receiver<WorkerCommand>) -> WorkerCommand {
    while let Ok(next) = inbox.try_recv() {
        command = match (command, next) {
            (WorkerCommand::Shutdown, _) | (_, WorkerCommand::Shutdown) => WorkerCommand::Shutdown,
            (
                WorkerCommand::Start(mut request),
                WorkerCommand::Resume {
                    generation,
                    budget_ms,
                },
            ) if request.generation == generation => {
                request.budget_ms = budget_ms;
                WorkerCommand::Start(request)
            }
            (superseded, next) => {
                log::debug!(
                    "command for generation {:?} superseded before it ran",
                    superseded.generation()
                );
                next
            }
        };
    }
    command
}

fn run_worker(
    config: CollisionConfig,
    inbox: Receiver<WorkerCommand>,
    outbox: Sender<CollisionReport>,
) {
    let mut detector = CollisionDetector::new(config);
    let mut pending: Option<WorkerCommand> = None;

    loop {
        let command = match pending.take() {
            Some(command) => command,
            None => match inbox.recv() {
                Ok(command) => command,
                Err(_) => return,
            },
        };

        let budget_ms = match newest(command, &inbox) {
            WorkerCommand::Shutdown => return,
            WorkerCommand::Start(request) => {
                detector.start(CollisionJob::new(
                    request.generation,
                    request.objects,
                    request.plate,
                ));
                request.budget_ms
            }
            WorkerCommand::Resume {
                generation,
                budget_ms,
            } => {
                if detector.generation() != Some(generation) {
                    log::debug!(
                        "ignoring resume for generation {} (running {:?})",
                        generation,
                        detector.generation()
                    );
                    continue;
                }
                budget_ms
            }
        };

        let mut interrupt = None;
        let mut disconnected = false;
        let report = detector.run_until(
            Budget::from_millis(budget_ms),
            |row| {
                let _ = outbox.send(row.clone());
            },
            || match inbox.try_recv() {
                Ok(command) => {
                    interrupt = Some(command);
                    true
                }
                Err(TryRecvError::Empty) => false,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    true
                }
            },
        );

        if disconnected {
            return;
        }
        if interrupt.is_some() {
            pending = interrupt;
            continue;
        }
        if let Some(report) = report {
            if outbox.send(report).is_err() {
                return;
            }
        }
    }
}

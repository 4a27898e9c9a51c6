//! Pairwise collision engine.
//!
//! [`CollisionDetector`] fills a [`CollisionMatrix`] one pair at a time in
//! row-major order, stopping whenever the caller's [`Budget`] runs out. A
//! later [`CollisionDetector::run`] picks up at the next unevaluated pair, so
//! resolved entries are never recomputed. Starting a job whose generation,
//! objects, transforms or plate differ from the current one discards all
//! prior results.
//!
//! ```rust
//! use bedplate_core::{Budget, Transform3D};
//! use bedplate_d2::{CollisionDetector, CollisionEntry, CollisionJob, Footprint, Plate};
//!
//! let entries = vec![
//!     CollisionEntry::new(
//!         "a",
//!         Transform3D::identity(),
//!         Footprint::rectangle(0.0, 0.0, 10.0, 10.0),
//!     ),
//!     CollisionEntry::new(
//!         "b",
//!         Transform3D::identity(),
//!         Footprint::rectangle(5.0, 5.0, 15.0, 15.0),
//!     ),
//! ];
//! let mut detector = CollisionDetector::default();
//! detector.start(CollisionJob::new(1, entries, Plate::rectangle(200.0, 200.0)));
//! let report = detector.run(Budget::unlimited(), |_| {}).unwrap();
//! assert!(report.is_complete());
//! assert!(report.matrix.has_collisions());
//! ```

use crate::footprint::{project, Footprint};
use crate::kernel::objects_overlap;
use crate::plate::Plate;
use bedplate_core::config::CollisionConfig;
use bedplate_core::geometry::{ObjectId, PlateObject};
use bedplate_core::transform::Transform3D;
use bedplate_core::Budget;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Resolution of one unordered object pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CollisionState {
    /// Not evaluated yet in this run.
    #[default]
    Unknown,
    Colliding,
    Clear,
}

impl CollisionState {
    pub fn is_resolved(self) -> bool {
        self != CollisionState::Unknown
    }
}

/// Tri-state result for every unordered pair of distinct objects.
///
/// Stored as the strict upper triangle of an `n x n` matrix, so the pair
/// `(i, j)` and `(j, i)` share one entry and self-pairs do not exist.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CollisionMatrix {
    ids: Vec<ObjectId>,
    states: Vec<CollisionState>,
}

impl CollisionMatrix {
    /// Creates a matrix with every pair `Unknown`.
    pub fn new(ids: Vec<ObjectId>) -> Self {
        let n = ids.len();
        Self {
            ids,
            states: vec![CollisionState::Unknown; n * n.saturating_sub(1) / 2],
        }
    }

    /// Object ids in matrix order.
    pub fn ids(&self) -> &[ObjectId] {
        &self.ids
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of unordered pairs.
    pub fn pair_count(&self) -> usize {
        self.states.len()
    }

    fn slot(&self, i: usize, j: usize) -> Option<usize> {
        let n = self.ids.len();
        if i == j || i >= n || j >= n {
            return None;
        }
        let (i, j) = if i < j { (i, j) } else { (j, i) };
        Some(i * n - i * (i + 1) / 2 + (j - i - 1))
    }

    /// State of the pair `(i, j)`; `None` for self-pairs or out-of-range indices.
    pub fn get(&self, i: usize, j: usize) -> Option<CollisionState> {
        self.slot(i, j).map(|s| self.states[s])
    }

    /// State of the pair with the given ids.
    pub fn state_by_id(&self, a: &str, b: &str) -> Option<CollisionState> {
        let i = self.ids.iter().position(|id| id == a)?;
        let j = self.ids.iter().position(|id| id == b)?;
        self.get(i, j)
    }

    /// Resolves a pair. Resolved entries are final; returns false if unchanged.
    pub(crate) fn resolve(&mut self, i: usize, j: usize, state: CollisionState) -> bool {
        match self.slot(i, j) {
            Some(s) if self.states[s] == CollisionState::Unknown => {
                self.states[s] = state;
                true
            }
            _ => false,
        }
    }

    /// Number of pairs still `Unknown`.
    pub fn unknown_count(&self) -> usize {
        self.states
            .iter()
            .filter(|s| **s == CollisionState::Unknown)
            .count()
    }

    /// True when no pair is `Unknown`.
    pub fn is_complete(&self) -> bool {
        self.states.iter().all(|s| s.is_resolved())
    }

    /// True if any resolved pair collides.
    pub fn has_collisions(&self) -> bool {
        self.states.contains(&CollisionState::Colliding)
    }

    /// Ids of every colliding pair, in matrix order.
    pub fn colliding_pairs(&self) -> Vec<(ObjectId, ObjectId)> {
        self.iter()
            .filter(|(_, _, state)| *state == CollisionState::Colliding)
            .map(|(i, j, _)| (self.ids[i].clone(), self.ids[j].clone()))
            .collect()
    }

    /// Iterates `(i, j, state)` with `i < j` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, CollisionState)> + '_ {
        let n = self.ids.len();
        (0..n)
            .flat_map(move |i| (i + 1..n).map(move |j| (i, j)))
            .zip(self.states.iter().copied())
            .map(|((i, j), state)| (i, j, state))
    }
}

/// Transferable snapshot of one object: what the engine needs, no live handle.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CollisionEntry {
    pub id: ObjectId,
    pub transform: Transform3D,
    pub footprint: Footprint,
}

impl CollisionEntry {
    pub fn new(id: impl Into<ObjectId>, transform: Transform3D, footprint: Footprint) -> Self {
        Self {
            id: id.into(),
            transform,
            footprint,
        }
    }

    /// Projects `object` at its current transform.
    pub fn from_object<O: PlateObject + ?Sized>(object: &O) -> Self {
        Self {
            id: object.id().clone(),
            transform: *object.transform(),
            footprint: project(object),
        }
    }
}

/// One versioned request: the object set, the plate and the host's generation tag.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CollisionJob {
    pub generation: u64,
    pub entries: Vec<CollisionEntry>,
    pub plate: Plate,
}

impl CollisionJob {
    pub fn new(generation: u64, entries: Vec<CollisionEntry>, plate: Plate) -> Self {
        Self {
            generation,
            entries,
            plate,
        }
    }

    /// Builds a job by projecting every object.
    pub fn from_objects<O: PlateObject>(generation: u64, objects: &[O], plate: Plate) -> Self {
        Self::new(
            generation,
            objects.iter().map(CollisionEntry::from_object).collect(),
            plate,
        )
    }
}

/// Where a run stands when a report is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RunStatus {
    /// Partial snapshot; the same call is still evaluating.
    InProgress,
    /// Every pair resolved.
    Complete,
    /// Budget ran out; the matrix is partial and the run can be resumed.
    Exhausted,
}

/// A snapshot of the collision matrix for one generation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CollisionReport {
    pub generation: u64,
    pub matrix: CollisionMatrix,
    pub status: RunStatus,
    /// Pairs evaluated during the call that produced this report.
    pub evaluated: usize,
    /// Objects whose footprint is empty or lost triangles to bad coordinates.
    pub degenerate: Vec<ObjectId>,
    /// Objects whose footprint leaves the plate.
    pub out_of_bounds: Vec<ObjectId>,
}

impl CollisionReport {
    /// True if the matrix has no `Unknown` entries.
    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Complete
    }

    /// True for the last report of a call.
    pub fn is_final(&self) -> bool {
        self.status != RunStatus::InProgress
    }
}

/// Incremental, restartable pairwise collision engine.
#[derive(Debug, Default)]
pub struct CollisionDetector {
    config: CollisionConfig,
    job: Option<CollisionJob>,
    matrix: CollisionMatrix,
    row: usize,
    col: usize,
    degenerate: Vec<ObjectId>,
    out_of_bounds: Vec<ObjectId>,
}

impl CollisionDetector {
    pub fn new(config: CollisionConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    /// Generation of the current job.
    pub fn generation(&self) -> Option<u64> {
        self.job.as_ref().map(|job| job.generation)
    }

    /// Current matrix (partial until the run completes).
    pub fn matrix(&self) -> &CollisionMatrix {
        &self.matrix
    }

    /// Installs a job.
    ///
    /// Returns `false` if `job` is identical to the current one and progress is
    /// kept, `true` if all previous results were discarded.
    pub fn start(&mut self, job: CollisionJob) -> bool {
        if self.job.as_ref() == Some(&job) {
            log::debug!(
                "collision job generation {} unchanged, resuming with {} pairs left",
                job.generation,
                self.matrix.unknown_count()
            );
            return false;
        }

        log::debug!(
            "collision job generation {} started with {} objects",
            job.generation,
            job.entries.len()
        );

        self.degenerate = job
            .entries
            .iter()
            .filter(|e| e.footprint.is_degenerate())
            .map(|e| e.id.clone())
            .collect();
        for id in &self.degenerate {
            log::warn!("object {} has a degenerate footprint and never collides", id);
        }
        self.out_of_bounds = job
            .entries
            .iter()
            .filter(|e| !job.plate.contains_footprint(&e.footprint, 0.0))
            .map(|e| e.id.clone())
            .collect();

        self.matrix = CollisionMatrix::new(job.entries.iter().map(|e| e.id.clone()).collect());
        self.row = 0;
        self.col = 1;
        self.job = Some(job);
        true
    }

    /// Drops the current job and all results.
    pub fn reset(&mut self) {
        self.job = None;
        self.matrix = CollisionMatrix::default();
        self.row = 0;
        self.col = 1;
        self.degenerate.clear();
        self.out_of_bounds.clear();
    }

    /// Evaluates pairs until every pair is resolved or `budget` runs out.
    ///
    /// `on_report` receives an `InProgress` snapshot after each completed row
    /// when row reports are enabled. The returned report is final for this
    /// call: `Complete` or `Exhausted`. Returns `None` if no job is installed.
    pub fn run<F>(&mut self, budget: Budget, on_report: F) -> Option<CollisionReport>
    where
        F: FnMut(&CollisionReport),
    {
        self.run_until(budget, on_report, || false)
    }

    /// Like [`CollisionDetector::run`], but also stops before the next pair
    /// once `interrupted` returns `true`.
    ///
    /// `interrupted` is polled before every pair evaluation, so a caller can
    /// abandon the run within one pair of a superseding request. An
    /// interrupted run reports `Exhausted` and can be resumed later.
    pub fn run_until<F, I>(
        &mut self,
        mut budget: Budget,
        mut on_report: F,
        mut interrupted: I,
    ) -> Option<CollisionReport>
    where
        F: FnMut(&CollisionReport),
        I: FnMut() -> bool,
    {
        let n = self.job.as_ref()?.entries.len();
        let mut evaluated = 0;

        while self.row + 1 < n {
            if budget.is_exhausted() || interrupted() {
                return Some(self.report(RunStatus::Exhausted, evaluated));
            }

            let state = self.evaluate(self.row, self.col);
            self.matrix.resolve(self.row, self.col, state);
            budget.consume();
            evaluated += 1;

            self.col += 1;
            if self.col == n {
                self.row += 1;
                self.col = self.row + 1;
                if self.config.report_every_row && self.row + 1 < n {
                    on_report(&self.report(RunStatus::InProgress, evaluated));
                }
            }
        }

        Some(self.report(RunStatus::Complete, evaluated))
    }

    /// Computes the full matrix for `objects` in one call, honoring the configured time limit.
    pub fn detect<O: PlateObject>(&mut self, objects: &[O], plate: Plate) -> CollisionReport {
        let generation = self.generation().map_or(0, |g| g.wrapping_add(1));
        self.start(CollisionJob::from_objects(generation, objects, plate));
        let budget = Budget::from_millis(self.config.time_limit_ms);
        match self.run(budget, |_| {}) {
            Some(report) => report,
            None => self.report(RunStatus::Complete, 0),
        }
    }

    fn evaluate(&self, i: usize, j: usize) -> CollisionState {
        let Some(job) = self.job.as_ref() else {
            return CollisionState::Unknown;
        };
        let a = &job.entries[i].footprint;
        let b = &job.entries[j].footprint;

        let overlapping = if self.config.bounds_prefilter {
            a.overlaps(b)
        } else {
            objects_overlap(a.triangles(), b.triangles())
        };

        if overlapping {
            CollisionState::Colliding
        } else {
            CollisionState::Clear
        }
    }

    fn report(&self, status: RunStatus, evaluated: usize) -> CollisionReport {
        CollisionReport {
            generation: self.generation().unwrap_or(0),
            matrix: self.matrix.clone(),
            status,
            evaluated,
            degenerate: self.degenerate.clone(),
            out_of_bounds: self.out_of_bounds.clone(),
        }
    }
}

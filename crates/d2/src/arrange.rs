//! Anytime, resumable arrangement of objects on the plate.
//!
//! [`ArrangeEngine::step`] advances an explicit state machine by at most one
//! caller-supplied [`Budget`] and returns. A host calls it repeatedly,
//! rendering between calls, until [`ArrangeStep::done`] is set.
//!
//! ```text
//! Seeding ──► Searching ──► Converged
//!                 │
//!                 └───────► BudgetExhausted (deadline, stalled, pass limit)
//! ```
//!
//! **Seeding** projects each object once and records its footprint relative
//! to its plate position. On a forced start over, objects are first laid out
//! in rows across the plate.
//!
//! **Searching** visits objects in input order. An object that conflicts
//! with a neighbour or leaves the plate probes a square spiral of lattice
//! positions around its anchor (the position it had when the session began)
//! and takes the closest one that is clear and on the plate. A pass with no
//! conflicting object converges the session.
//!
//! One probe is one unit of work; a step never stops in the middle of one.

use crate::clamp_to_plate;
use crate::footprint::{project, Footprint};
use crate::plate::Plate;
use crate::spatial_index::{SpatialEntry, SpatialIndex};
use bedplate_core::config::ArrangeConfig;
use bedplate_core::geometry::{ObjectId, PlateObject};
use bedplate_core::transform::Transform3D;
use bedplate_core::{Budget, Result};
use std::cell::Cell;
use std::time::{Duration, Instant};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Phase of an arrangement session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ArrangePhase {
    Seeding,
    Searching,
    /// A full pass found no conflicts.
    Converged,
    /// The session ended with conflicts left; see [`StopReason`].
    BudgetExhausted,
}

impl ArrangePhase {
    pub fn is_finished(self) -> bool {
        matches!(self, ArrangePhase::Converged | ArrangePhase::BudgetExhausted)
    }
}

/// Why a session ended without converging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StopReason {
    /// The session time limit elapsed.
    Deadline,
    /// A full pass moved nothing; further passes would repeat it.
    Stalled,
    /// The configured number of passes ran out.
    PassLimit,
}

/// Outcome of one call to [`ArrangeEngine::step`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ArrangeStep {
    /// `false` means call again; the session state is kept.
    pub done: bool,
    pub phase: ArrangePhase,
    /// Current pass, starting at 1 once searching begins.
    pub pass: u32,
    /// Objects that conflicted with a neighbour or left the plate when last checked.
    ///
    /// Exact once the session has converged or stalled; in between, an object
    /// keeps its flag until the search visits it again.
    pub remaining_conflicts: usize,
    /// Units of work done during this call.
    pub probes: usize,
    pub stop_reason: Option<StopReason>,
}

impl ArrangeStep {
    /// True if the session converged with every object clear.
    pub fn succeeded(&self) -> bool {
        self.phase == ArrangePhase::Converged
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    x: f64,
    y: f64,
    dist_sq: f64,
    conflicts: usize,
}

/// In-flight spiral search for one object.
#[derive(Debug, Clone)]
struct Search {
    object: usize,
    ring: usize,
    offset: usize,
    max_ring: usize,
    current_conflicts: usize,
    current_in_bounds: bool,
    best: Option<Candidate>,
    fallback: Option<Candidate>,
}

/// Working placement and search progress of one arrangement session.
#[derive(Debug)]
pub struct ArrangementState {
    ids: Vec<ObjectId>,
    transforms: Vec<Transform3D>,
    grid_seed: bool,
    /// Footprints relative to each object's plate position.
    local: Vec<Footprint>,
    positions: Vec<(f64, f64)>,
    anchors: Vec<(f64, f64)>,
    placed: Vec<Footprint>,
    fits: Vec<bool>,
    conflicting: Vec<bool>,
    index: SpatialIndex,
    phase: ArrangePhase,
    stop_reason: Option<StopReason>,
    pass: u32,
    cursor: usize,
    search: Option<Search>,
    pass_conflicts: usize,
    pass_moves: usize,
    deadline: Option<Instant>,
    step_size: f64,
    footprint_tests: Cell<usize>,
}

impl ArrangementState {
    fn new<O: PlateObject>(objects: &[O], grid_seed: bool, config: &ArrangeConfig) -> Self {
        let transforms: Vec<Transform3D> = objects.iter().map(|o| *o.transform()).collect();
        let deadline = (config.time_limit_ms > 0)
            .then(|| Instant::now() + Duration::from_millis(config.time_limit_ms));
        Self {
            ids: objects.iter().map(|o| o.id().clone()).collect(),
            positions: transforms.iter().map(|t| t.plate_position()).collect(),
            transforms,
            grid_seed,
            local: Vec::with_capacity(objects.len()),
            anchors: Vec::new(),
            placed: Vec::new(),
            fits: Vec::new(),
            conflicting: Vec::new(),
            index: SpatialIndex::new(),
            phase: ArrangePhase::Seeding,
            stop_reason: None,
            pass: 0,
            cursor: 0,
            search: None,
            pass_conflicts: 0,
            pass_moves: 0,
            deadline,
            step_size: 1.0,
            footprint_tests: Cell::new(0),
        }
    }

    pub fn phase(&self) -> ArrangePhase {
        self.phase
    }

    pub fn pass(&self) -> u32 {
        self.pass
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    pub fn ids(&self) -> &[ObjectId] {
        &self.ids
    }

    /// Working plate position of every object.
    pub fn positions(&self) -> &[(f64, f64)] {
        &self.positions
    }

    /// Positions the candidate search is centered on.
    pub fn anchors(&self) -> &[(f64, f64)] {
        &self.anchors
    }

    /// Lattice spacing of the candidate search.
    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    /// Footprint-against-footprint tests run so far in this session.
    pub fn footprint_tests(&self) -> usize {
        self.footprint_tests.get()
    }

    /// True if `objects` is still the set this state was built for, unmoved by anyone else.
    fn matches<O: PlateObject>(&self, objects: &[O]) -> bool {
        objects.len() == self.ids.len()
            && objects
                .iter()
                .zip(self.ids.iter().zip(&self.transforms))
                .all(|(o, (id, t))| o.id() == id && o.transform() == t)
    }

    fn advance<O: PlateObject>(
        &mut self,
        objects: &mut [O],
        plate: &Plate,
        config: &ArrangeConfig,
        slice: &mut Budget,
    ) -> ArrangeStep {
        let start_units = slice.used();

        while !self.phase.is_finished() {
            if self.deadline.map_or(false, |d| Instant::now() >= d) {
                self.finish(ArrangePhase::BudgetExhausted, Some(StopReason::Deadline));
                break;
            }
            if slice.is_exhausted() {
                break;
            }

            match self.phase {
                ArrangePhase::Seeding => self.seed_next(objects, plate, config, slice),
                ArrangePhase::Searching => {
                    if self.search.is_some() {
                        self.probe(plate, config.margin, slice);
                        if self.search_finished() {
                            self.apply_search(objects);
                        }
                    } else if self.cursor < self.ids.len() {
                        self.visit(plate, config.margin, slice);
                    } else {
                        self.end_pass(config);
                    }
                }
                ArrangePhase::Converged | ArrangePhase::BudgetExhausted => {}
            }
        }

        ArrangeStep {
            done: self.phase.is_finished(),
            phase: self.phase,
            pass: self.pass,
            remaining_conflicts: self.remaining_conflicts(),
            probes: slice.used() - start_units,
            stop_reason: self.stop_reason,
        }
    }

    /// Projects the next object; after the last one, builds the working placement.
    fn seed_next<O: PlateObject>(
        &mut self,
        objects: &mut [O],
        plate: &Plate,
        config: &ArrangeConfig,
        slice: &mut Budget,
    ) {
        let k = self.local.len();
        if let Some(object) = objects.get(k) {
            let (x, y) = self.positions[k];
            let footprint = project(object);
            if footprint.is_degenerate() {
                log::warn!(
                    "object {} has a degenerate footprint ({} non-finite triangles dropped)",
                    object.id(),
                    footprint.non_finite_dropped()
                );
            }
            self.local.push(footprint.translated(-x, -y));
            slice.consume();
            return;
        }

        let margin = config.margin;
        let inner = plate.inner_bounds(margin);
        self.fits = self
            .local
            .iter()
            .map(|fp| match fp.aabb() {
                Some(b) => {
                    inner.is_valid() && b.width() <= inner.width() && b.height() <= inner.height()
                }
                None => true,
            })
            .collect();
        self.conflicting = self.fits.iter().map(|fits| !fits).collect();
        for (id, _) in self.ids.iter().zip(&self.fits).filter(|(_, fits)| !**fits) {
            log::warn!("object {} does not fit on the plate with margin {}", id, margin);
        }

        if self.grid_seed {
            self.seed_rows(objects, plate, margin);
        }

        self.anchors = self.positions.clone();
        self.placed = self
            .local
            .iter()
            .zip(&self.positions)
            .map(|(fp, &(x, y))| fp.translated(x, y))
            .collect();
        self.index = SpatialIndex::with_entries(
            self.placed
                .iter()
                .enumerate()
                .filter_map(|(i, fp)| fp.aabb().map(|aabb| SpatialEntry::new(i, aabb)))
                .collect(),
        );
        self.step_size = config
            .search_step
            .unwrap_or_else(|| self.auto_step(plate, margin));

        log::debug!(
            "arrangement seeded: {} objects, search step {:.3}",
            self.ids.len(),
            self.step_size
        );

        self.phase = ArrangePhase::Searching;
        self.pass = 1;
    }

    /// Lays objects out left to right in rows, wrapping at the plate edge.
    ///
    /// Rows fill the largest rectangle inside the plate outline; an object
    /// that would not land fully on the plate keeps its position.
    fn seed_rows<O: PlateObject>(&mut self, objects: &mut [O], plate: &Plate, margin: f64) {
        let bounds = plate.inscribed_bounds();
        let inner = bounds.expanded(-margin);
        let mut cursor_x = inner.min_x;
        let mut cursor_y = inner.min_y;
        let mut row_height = 0.0_f64;

        for k in 0..self.local.len() {
            let Some(b) = self.local[k].aabb() else {
                continue;
            };
            if !self.fits[k] {
                continue;
            }

            if cursor_x + b.width() > inner.max_x && cursor_x > inner.min_x {
                cursor_x = inner.min_x;
                cursor_y += row_height + margin;
                row_height = 0.0;
            }

            let x = cursor_x - b.min_x;
            let y = cursor_y - b.min_y;
            if let Some((x, y)) = clamp_to_plate(x, y, &b, &bounds, margin) {
                if plate.contains_footprint_at(&self.local[k], x, y, margin) {
                    self.move_to(objects, k, x, y);
                }
            }

            cursor_x += b.width() + margin;
            row_height = row_height.max(b.height());
        }
    }

    fn auto_step(&self, plate: &Plate, margin: f64) -> f64 {
        let diag = plate.width().hypot(plate.depth());
        let base = if margin > 0.0 {
            margin
        } else {
            self.local
                .iter()
                .filter_map(|fp| fp.aabb())
                .map(|b| b.width().min(b.height()))
                .filter(|e| *e > 0.0)
                .fold(None, |min: Option<f64>, e| Some(min.map_or(e, |m| m.min(e))))
                .map_or(diag / 100.0, |e| e / 4.0)
        };
        base.max(diag / 400.0)
    }

    /// Checks the object at the cursor and starts a search if it conflicts.
    fn visit(&mut self, plate: &Plate, margin: f64, slice: &mut Budget) {
        let k = self.cursor;
        slice.consume();

        if !self.fits[k] {
            self.pass_conflicts += 1;
            self.cursor += 1;
            return;
        }

        let in_bounds = plate.contains_footprint(&self.placed[k], margin);
        let conflicts = self.conflicts_of(k, &self.placed[k], margin);
        self.conflicting[k] = !in_bounds || conflicts > 0;
        if !self.conflicting[k] {
            self.cursor += 1;
            return;
        }

        self.pass_conflicts += 1;
        let (ax, ay) = self.anchors[k];
        let b = plate.bounds();
        let reach = (ax - b.min_x)
            .abs()
            .max((ax - b.max_x).abs())
            .max((ay - b.min_y).abs())
            .max((ay - b.max_y).abs());
        self.search = Some(Search {
            object: k,
            ring: 0,
            offset: 0,
            max_ring: ((reach / self.step_size).ceil() as usize).saturating_add(1),
            current_conflicts: conflicts,
            current_in_bounds: in_bounds,
            best: None,
            fallback: None,
        });
    }

    /// Evaluates the next lattice position of the active search.
    fn probe(&mut self, plate: &Plate, margin: f64, slice: &mut Budget) {
        let step = self.step_size;
        let Some(search) = self.search.as_mut() else {
            return;
        };
        let k = search.object;
        let (dx, dy) = ring_offset(search.ring, search.offset);
        search.offset += 1;
        if search.offset >= (8 * search.ring).max(1) {
            search.ring += 1;
            search.offset = 0;
        }
        slice.consume();

        let (ax, ay) = self.anchors[k];
        let (x, y) = (ax + dx as f64 * step, ay + dy as f64 * step);
        if !plate.contains_footprint_at(&self.local[k], x, y, margin) {
            return;
        }

        let moved = self.local[k].translated(x, y);
        let conflicts = self.conflicts_of(k, &moved, margin);
        let candidate = Candidate {
            x,
            y,
            dist_sq: (x - ax).powi(2) + (y - ay).powi(2),
            conflicts,
        };

        let Some(search) = self.search.as_mut() else {
            return;
        };
        if conflicts == 0 {
            if search.best.map_or(true, |b| candidate.dist_sq < b.dist_sq) {
                search.best = Some(candidate);
            }
        } else if search.fallback.map_or(true, |f| {
            (candidate.conflicts, candidate.dist_sq) < (f.conflicts, f.dist_sq)
        }) {
            search.fallback = Some(candidate);
        }
    }

    /// True once no unprobed ring can beat the best clear candidate.
    fn search_finished(&self) -> bool {
        let Some(search) = &self.search else {
            return false;
        };
        if search.ring > search.max_ring {
            return true;
        }
        match search.best {
            Some(best) if search.offset == 0 => {
                let nearest = search.ring as f64 * self.step_size;
                nearest * nearest > best.dist_sq
            }
            _ => false,
        }
    }

    fn apply_search<O: PlateObject>(&mut self, objects: &mut [O]) {
        let Some(search) = self.search.take() else {
            return;
        };
        let k = search.object;
        let target = search.best.or_else(|| {
            search.fallback.filter(|f| {
                !search.current_in_bounds || f.conflicts < search.current_conflicts
            })
        });

        if let Some(c) = target {
            if (c.x, c.y) != self.positions[k] {
                self.move_to(objects, k, c.x, c.y);
                self.pass_moves += 1;
            }
            self.conflicting[k] = c.conflicts > 0;
        }
        self.cursor += 1;
    }

    fn end_pass(&mut self, config: &ArrangeConfig) {
        log::debug!(
            "arrangement pass {}: {} conflicting, {} moved",
            self.pass,
            self.pass_conflicts,
            self.pass_moves
        );

        if self.pass_conflicts == 0 {
            self.finish(ArrangePhase::Converged, None);
        } else if self.pass_moves == 0 {
            self.finish(ArrangePhase::BudgetExhausted, Some(StopReason::Stalled));
        } else if self.pass >= config.max_passes {
            self.finish(ArrangePhase::BudgetExhausted, Some(StopReason::PassLimit));
        } else {
            self.pass += 1;
            self.cursor = 0;
            self.pass_conflicts = 0;
            self.pass_moves = 0;
        }
    }

    fn finish(&mut self, phase: ArrangePhase, reason: Option<StopReason>) {
        if phase == ArrangePhase::Converged {
            self.conflicting.iter_mut().for_each(|flag| *flag = false);
        }
        self.phase = phase;
        self.stop_reason = reason;
        self.search = None;
        match reason {
            None => log::info!("arrangement converged after {} passes", self.pass),
            Some(reason) => log::info!(
                "arrangement stopped after {} passes ({:?}) with conflicts left",
                self.pass,
                reason
            ),
        }
    }

    /// Moves object `k`, keeping the placement, the index and the host object in sync.
    fn move_to<O: PlateObject>(&mut self, objects: &mut [O], k: usize, x: f64, y: f64) {
        if let Some(moved) = self.placed.get(k).and_then(|fp| fp.aabb()) {
            self.index.remove(&SpatialEntry::new(k, moved));
        }
        let footprint = self.local[k].translated(x, y);
        if let Some(aabb) = footprint.aabb() {
            if k < self.placed.len() {
                self.index.insert(SpatialEntry::new(k, aabb));
            }
        }
        if let Some(slot) = self.placed.get_mut(k) {
            *slot = footprint;
        }
        self.positions[k] = (x, y);
        if let Some(object) = objects.get_mut(k) {
            object.set_plate_position(x, y);
            self.transforms[k] = *object.transform();
        }
    }

    /// Number of placed neighbours `footprint` conflicts with, ignoring object `k` itself.
    fn conflicts_of(&self, k: usize, footprint: &Footprint, margin: f64) -> usize {
        let Some(aabb) = footprint.aabb() else {
            return 0;
        };
        let neighbours: Vec<usize> = self
            .index
            .neighbours(&aabb, margin)
            .into_iter()
            .filter(|&m| m != k)
            .collect();
        self.footprint_tests.set(self.footprint_tests.get() + neighbours.len());
        neighbours
            .into_iter()
            .filter(|&m| footprint.conflicts_with(&self.placed[m], margin))
            .count()
    }

    fn remaining_conflicts(&self) -> usize {
        self.conflicting.iter().filter(|flag| **flag).count()
    }
}

/// Lattice offset of position `offset` on square ring `ring`.
///
/// Ring `r > 0` has `8r` positions, walked counter-clockwise from `(r, -r)`.
fn ring_offset(ring: usize, offset: usize) -> (i64, i64) {
    if ring == 0 {
        return (0, 0);
    }
    let r = ring as i64;
    let side = offset as i64 / (2 * r);
    let s = offset as i64 % (2 * r);
    match side {
        0 => (r, -r + s),
        1 => (r - s, r),
        2 => (-r, r - s),
        _ => (-r + s, -r),
    }
}

/// Repositions host objects so their footprints are clear of each other and the plate edge.
#[derive(Debug, Default)]
pub struct ArrangeEngine {
    config: ArrangeConfig,
    state: Option<ArrangementState>,
}

impl ArrangeEngine {
    pub fn new(config: ArrangeConfig) -> Self {
        Self {
            config,
            state: None,
        }
    }

    pub fn config(&self) -> &ArrangeConfig {
        &self.config
    }

    /// The current session, if any.
    pub fn state(&self) -> Option<&ArrangementState> {
        self.state.as_ref()
    }

    /// Discards the current session.
    pub fn reset(&mut self) {
        self.state = None;
    }

    /// Advances the session by at most `slice` and writes moves into `objects`.
    ///
    /// A new session begins when `force_start_over` is set, when there is none,
    /// when the previous one finished, or when `objects` differs from the set
    /// (ids or transforms) the session last saw. Forced sessions lay objects
    /// out in rows before searching; others start from the current positions.
    pub fn step<O: PlateObject>(
        &mut self,
        objects: &mut [O],
        plate: &Plate,
        mut slice: Budget,
        force_start_over: bool,
    ) -> Result<ArrangeStep> {
        self.config.validate()?;
        plate.validate()?;

        let stale = match &self.state {
            None => true,
            Some(state) => state.phase.is_finished() || !state.matches(objects),
        };
        if force_start_over || stale {
            if self.state.is_some() {
                log::debug!(
                    "arrangement restarted (forced: {}, {} objects)",
                    force_start_over,
                    objects.len()
                );
            }
            self.state = None;
        }

        let state = self
            .state
            .get_or_insert_with(|| ArrangementState::new(objects, force_start_over, &self.config));
        Ok(state.advance(objects, plate, &self.config, &mut slice))
    }

    /// Advances the session by one configured slice.
    pub fn step_for_slice<O: PlateObject>(
        &mut self,
        objects: &mut [O],
        plate: &Plate,
        force_start_over: bool,
    ) -> Result<ArrangeStep> {
        let slice = Budget::from_millis(self.config.slice_ms);
        self.step(objects, plate, slice, force_start_over)
    }

    /// Runs a whole session in one call.
    pub fn arrange_blocking<O: PlateObject>(
        &mut self,
        objects: &mut [O],
        plate: &Plate,
        force_start_over: bool,
    ) -> Result<ArrangeStep> {
        let mut force = force_start_over;
        loop {
            let step = self.step_for_slice(objects, plate, force)?;
            if step.done {
                return Ok(step);
            }
            force = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{Mesh, SceneObject};

    fn cube(id: &str, size: f64, x: f64, y: f64) -> SceneObject {
        SceneObject::new(id, Mesh::cuboid(size, size, size)).with_plate_position(x, y)
    }

    fn run_to_end(
        engine: &mut ArrangeEngine,
        objects: &mut [SceneObject],
        plate: &Plate,
        units: usize,
        force: bool,
    ) -> (ArrangeStep, usize) {
        let mut calls = 0;
        let mut force = force;
        loop {
            let step = engine.step(objects, plate, Budget::units(units), force).unwrap();
            calls += 1;
            force = false;
            if step.done {
                return (step, calls);
            }
            assert!(calls < 100_000, "arrangement did not terminate");
        }
    }

    #[test]
    fn test_ring_offsets_cover_ring() {
        assert_eq!(ring_offset(0, 0), (0, 0));
        let ring: Vec<_> = (0..16).map(|t| ring_offset(2, t)).collect();
        let mut unique = ring.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), 16);
        assert!(ring.iter().all(|(x, y)| x.abs().max(y.abs()) == 2));
        assert_eq!(ring[0], (2, -2));
    }

    #[test]
    fn test_clear_layout_converges_without_moves() {
        let mut objects = vec![cube("a", 20.0, -50.0, 0.0), cube("b", 20.0, 50.0, 0.0)];
        let before: Vec<_> = objects.iter().map(|o| o.transform().plate_position()).collect();
        let mut engine = ArrangeEngine::new(ArrangeConfig::new().with_margin(5.0));
        let step = engine
            .arrange_blocking(&mut objects, &Plate::rectangle(200.0, 200.0), false)
            .unwrap();

        assert!(step.done);
        assert!(step.succeeded());
        assert_eq!(step.pass, 1);
        let after: Vec<_> = objects.iter().map(|o| o.transform().plate_position()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_overlapping_pair_moves_minimally() {
        let mut objects = vec![cube("a", 20.0, 0.0, 0.0), cube("b", 20.0, 10.0, 0.0)];
        let mut engine = ArrangeEngine::new(
            ArrangeConfig::new().with_margin(5.0).with_time_limit(0),
        );
        let plate = Plate::rectangle(200.0, 200.0);
        let step = engine.arrange_blocking(&mut objects, &plate, false).unwrap();

        assert!(step.succeeded());
        // "a" is visited first and steps 25 to the side of "b"'s 20-wide box.
        let (ax, ay) = objects[0].transform().plate_position();
        let (bx, by) = objects[1].transform().plate_position();
        assert_eq!((bx, by), (10.0, 0.0));
        assert!(((ax - bx).abs() >= 25.0) || ((ay - by).abs() >= 25.0));
        assert!((ax * ax + ay * ay).sqrt() <= 25.0 + 1e-9);
    }

    #[test]
    fn test_slices_resume_state() {
        let mut objects: Vec<_> = (0..4)
            .map(|i| cube(&format!("o{}", i), 20.0, 0.0, 0.0))
            .collect();
        let plate = Plate::rectangle(200.0, 200.0);
        let mut engine =
            ArrangeEngine::new(ArrangeConfig::new().with_margin(5.0).with_time_limit(0));

        let first = engine.step(&mut objects, &plate, Budget::units(2), false).unwrap();
        assert!(!first.done);
        assert_eq!(first.phase, ArrangePhase::Seeding);
        assert_eq!(first.probes, 2);

        let (last, calls) = run_to_end(&mut engine, &mut objects, &plate, 3, false);
        assert!(calls > 1);
        assert!(last.succeeded());
        assert_eq!(last.remaining_conflicts, 0);
    }

    #[test]
    fn test_small_slices_match_one_large_slice() {
        let make = || -> Vec<SceneObject> {
            (0..5).map(|i| cube(&format!("o{}", i), 15.0, i as f64 * 3.0, 0.0)).collect()
        };
        let plate = Plate::rectangle(150.0, 150.0);
        let config = ArrangeConfig::new().with_margin(4.0).with_time_limit(0);

        let mut sliced = make();
        run_to_end(&mut ArrangeEngine::new(config.clone()), &mut sliced, &plate, 7, false);

        let mut whole = make();
        ArrangeEngine::new(config)
            .step(&mut whole, &plate, Budget::unlimited(), false)
            .unwrap();

        let a: Vec<_> = sliced.iter().map(|o| o.transform().plate_position()).collect();
        let b: Vec<_> = whole.iter().map(|o| o.transform().plate_position()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_host_move_restarts_session() {
        let mut objects = vec![cube("a", 20.0, 0.0, 0.0), cube("b", 20.0, 0.0, 0.0)];
        let plate = Plate::rectangle(200.0, 200.0);
        let mut engine =
            ArrangeEngine::new(ArrangeConfig::new().with_margin(5.0).with_time_limit(0));

        engine.step(&mut objects, &plate, Budget::units(3), false).unwrap();
        assert_eq!(engine.state().unwrap().phase(), ArrangePhase::Searching);

        objects[1].set_plate_position(60.0, 0.0);
        let step = engine.step(&mut objects, &plate, Budget::units(1), false).unwrap();
        assert_eq!(step.phase, ArrangePhase::Seeding);
        assert_eq!(engine.state().unwrap().anchors().len(), 0);
    }

    #[test]
    fn test_forced_start_over_lays_out_rows() {
        let mut objects: Vec<_> = (0..3)
            .map(|i| cube(&format!("o{}", i), 20.0, 0.0, 0.0))
            .collect();
        let plate = Plate::rectangle(200.0, 200.0);
        let mut engine = ArrangeEngine::new(ArrangeConfig::new().with_margin(5.0));
        let step = engine.arrange_blocking(&mut objects, &plate, true).unwrap();

        assert!(step.succeeded());
        let positions: Vec<_> = objects.iter().map(|o| o.transform().plate_position()).collect();
        // Row seed starts at the inner lower-left corner (-95, -95) and steps by width + margin.
        assert_eq!(positions, vec![(-85.0, -85.0), (-60.0, -85.0), (-35.0, -85.0)]);
    }

    #[test]
    fn test_zero_unit_step_tests_no_footprints() {
        let mut objects: Vec<_> = (0..3)
            .map(|i| cube(&format!("o{}", i), 20.0, 0.0, 0.0))
            .collect();
        let plate = Plate::rectangle(200.0, 200.0);
        let mut engine = ArrangeEngine::new(ArrangeConfig::new().with_margin(5.0));

        let first = engine.step(&mut objects, &plate, Budget::units(4), false).unwrap();
        assert_eq!(first.phase, ArrangePhase::Searching);
        let tests = engine.state().unwrap().footprint_tests();
        assert!(tests > 0);

        let idle = engine.step(&mut objects, &plate, Budget::units(0), false).unwrap();
        assert!(!idle.done);
        assert_eq!(idle.probes, 0);
        assert_eq!(idle.remaining_conflicts, first.remaining_conflicts);
        assert_eq!(engine.state().unwrap().footprint_tests(), tests);
    }

    #[test]
    fn test_time_limit_counts_seeding() {
        let mut objects: Vec<_> = (0..3)
            .map(|i| cube(&format!("o{}", i), 20.0, 0.0, 0.0))
            .collect();
        let plate = Plate::rectangle(200.0, 200.0);
        let mut engine =
            ArrangeEngine::new(ArrangeConfig::new().with_margin(5.0).with_time_limit(50));

        let first = engine.step(&mut objects, &plate, Budget::units(1), false).unwrap();
        assert!(!first.done);
        assert_eq!(first.phase, ArrangePhase::Seeding);

        std::thread::sleep(Duration::from_millis(60));
        let step = engine.step(&mut objects, &plate, Budget::unlimited(), false).unwrap();
        assert!(step.done);
        assert_eq!(step.stop_reason, Some(StopReason::Deadline));
        assert!(objects.iter().all(|o| o.transform().plate_position() == (0.0, 0.0)));
    }

    #[test]
    fn test_forced_start_over_stays_on_circular_plate() {
        let mut objects: Vec<_> = (0..3)
            .map(|i| cube(&format!("o{}", i), 20.0, 0.0, 0.0))
            .collect();
        let plate = Plate::circle(200.0);
        let mut engine =
            ArrangeEngine::new(ArrangeConfig::new().with_margin(5.0).with_time_limit(0));

        let mut force = true;
        let mut calls = 0;
        loop {
            let step = engine.step(&mut objects, &plate, Budget::units(4), force).unwrap();
            force = false;
            calls += 1;
            for object in &objects {
                assert!(
                    plate.contains_footprint(&project(object), 5.0),
                    "{} left the plate after call {}",
                    object.id(),
                    calls
                );
            }
            if step.done {
                assert!(step.succeeded());
                break;
            }
            assert!(calls < 10_000, "arrangement did not terminate");
        }
    }

    #[test]
    fn test_oversized_object_stalls() {
        let mut objects = vec![cube("huge", 300.0, 0.0, 0.0)];
        let plate = Plate::rectangle(200.0, 200.0);
        let mut engine = ArrangeEngine::new(ArrangeConfig::new().with_margin(5.0));
        let step = engine.arrange_blocking(&mut objects, &plate, false).unwrap();

        assert!(step.done);
        assert_eq!(step.phase, ArrangePhase::BudgetExhausted);
        assert_eq!(step.stop_reason, Some(StopReason::Stalled));
        assert_eq!(step.remaining_conflicts, 1);
        assert_eq!(objects[0].transform().plate_position(), (0.0, 0.0));
    }

    #[test]
    fn test_pass_limit() {
        // Four 45-wide cubes cannot all clear each other on a 100 plate with margin 5.
        let mut objects: Vec<_> = (0..4)
            .map(|i| cube(&format!("o{}", i), 45.0, 0.0, 0.0))
            .collect();
        let plate = Plate::rectangle(100.0, 100.0);
        let mut engine = ArrangeEngine::new(
            ArrangeConfig::new()
                .with_margin(5.0)
                .with_time_limit(0)
                .with_max_passes(2),
        );
        let step = engine.arrange_blocking(&mut objects, &plate, false).unwrap();
        assert!(step.done);
        assert_eq!(step.phase, ArrangePhase::BudgetExhausted);
        assert!(step.pass <= 2);
        assert!(step.remaining_conflicts > 0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut objects = vec![cube("a", 10.0, 0.0, 0.0)];
        let mut engine = ArrangeEngine::new(ArrangeConfig::new().with_margin(-1.0));
        assert!(engine
            .step(&mut objects, &Plate::default(), Budget::unlimited(), false)
            .is_err());
    }

    #[test]
    fn test_empty_object_list_converges() {
        let mut objects: Vec<SceneObject> = Vec::new();
        let step = ArrangeEngine::default()
            .step(&mut objects, &Plate::default(), Budget::unlimited(), false)
            .unwrap();
        assert!(step.succeeded());
    }

    #[test]
    fn test_degenerate_object_is_left_alone() {
        let mut objects = vec![
            cube("a", 20.0, 0.0, 0.0),
            SceneObject::new("flat", Mesh::default()).with_plate_position(0.0, 0.0),
        ];
        let step = ArrangeEngine::new(ArrangeConfig::new().with_margin(5.0))
            .arrange_blocking(&mut objects, &Plate::rectangle(200.0, 200.0), false)
            .unwrap();
        assert!(step.succeeded());
        assert_eq!(objects[1].transform().plate_position(), (0.0, 0.0));
    }
}

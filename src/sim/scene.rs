//! The scene: physics world, strokes, force fields, replay
//!
//! All gameplay state lives here and must stay deterministic:
//! - Fixed timestep only, stepped exactly once per tick
//! - Stroke ids assigned sequentially so replays regenerate them
//! - The replay log is append-only; playback never mutates it
//!
//! Strokes are created as drafts by the gesture layer, activated (or
//! discarded) on release, and auto-jointed to whatever they touch.

use glam::{IVec2, Vec2};
use rand::SeedableRng;
use rand_pcg::Pcg32;
use rapier2d::prelude::RigidBodyHandle;

use crate::canvas::{Canvas, palette};
use crate::consts::{DEFAULT_SEED, JOINT_TOLERANCE, SELECT_TOLERANCE};
use crate::error::Error;
use crate::level::{Level, StrokeSpec, WinCondition};
use crate::sim::force_field::{ForceField, JetStream, JetStreamId};
use crate::sim::path::Path;
use crate::sim::physics::PhysicsWorld;
use crate::sim::replay::{ReplayLog, SceneOp};
use crate::sim::stroke::{Attributes, Stroke, StrokeId};

/// A joint candidate: where a draft endpoint would attach, and how far away
/// the target polyline is
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointCandidate {
    pub point: Vec2,
    pub distance: f32,
}

pub struct Scene {
    physics: PhysicsWorld,
    /// Creation order = render order = replay order
    strokes: Vec<Stroke>,
    next_id: StrokeId,
    /// The single in-flight draft, if any
    draft: Option<StrokeId>,
    force_fields: Vec<ForceField>,
    jet_streams: Vec<JetStream>,
    log: ReplayLog,
    replay_cursor: usize,
    replaying: bool,
    ticks: u64,
    completed: bool,
    /// Level-authored strokes (ids below the watermark) resist deletion
    protection: bool,
    protected_below: StrokeId,
    /// Edit mode: protection lifted, completion checks suppressed
    editing: bool,
    /// Level stroke index -> assigned id, for win-condition lookups
    level_ids: Vec<StrokeId>,
    win: WinCondition,
    /// Pristine level retained for reset/replay
    level: Option<Level>,
    rng: Pcg32,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            physics: PhysicsWorld::new(),
            strokes: Vec::new(),
            next_id: 0,
            draft: None,
            force_fields: Vec::new(),
            jet_streams: Vec::new(),
            log: ReplayLog::new(),
            replay_cursor: 0,
            replaying: false,
            ticks: 0,
            completed: false,
            protection: true,
            protected_below: 0,
            editing: false,
            level_ids: Vec::new(),
            win: WinCondition::None,
            level: None,
            rng: Pcg32::seed_from_u64(DEFAULT_SEED),
        }
    }

    // === Loading and lifecycle ===

    /// Install a parsed level. On failure the previous scene state is left
    /// untouched.
    pub fn load(&mut self, level: &Level) -> Result<(), Error> {
        let mut fresh = Scene::new();
        fresh.level = Some(level.clone());
        fresh.install_level()?;
        fresh.log = level.log.clone().unwrap_or_default();
        log::info!(
            "loaded level {:?}: {} strokes, {} fields",
            level.title,
            fresh.strokes.len(),
            fresh.force_fields.len()
        );
        *self = fresh;
        Ok(())
    }

    /// Rebuild world state from the retained level. The replay log is not
    /// touched here; `start` and `reset` decide its fate.
    fn install_level(&mut self) -> Result<(), Error> {
        let level = self.level.clone();
        self.physics = PhysicsWorld::new();
        self.strokes.clear();
        self.jet_streams.clear();
        self.next_id = 0;
        self.draft = None;
        self.ticks = 0;
        self.completed = false;
        self.replaying = false;
        self.replay_cursor = 0;
        self.level_ids.clear();
        self.protection = true;
        self.editing = false;

        let Some(level) = level else {
            self.force_fields.clear();
            self.win = WinCondition::None;
            self.protected_below = 0;
            return Ok(());
        };

        self.rng = Pcg32::seed_from_u64(level.seed.unwrap_or(DEFAULT_SEED));
        self.force_fields = level.fields.clone();
        self.win = level.win.clone();

        for (i, spec) in level.strokes.iter().enumerate() {
            let path = spec
                .decode_path()
                .map_err(|e| Error::Load(format!("stroke {}: {}", i, e)))?;
            let id = self.insert_draft(path, spec.color, spec.attributes);
            self.level_ids.push(id);
            if self.activate_quiet(id).is_err() {
                log::warn!("level stroke {} is degenerate, skipped", i);
                self.remove_stroke_entry(id);
            }
        }
        self.draft = None;
        self.protected_below = self.next_id;
        Ok(())
    }

    /// Begin an attempt. With `replay` the freshly loaded log is played back
    /// deterministically at its original ticks; otherwise recording starts
    /// from scratch.
    pub fn start(&mut self, replay: bool) {
        let log = std::mem::take(&mut self.log);
        if let Err(e) = self.install_level() {
            log::warn!("start: {}", e);
        }
        if replay && !log.is_empty() {
            self.log = log;
            self.replaying = true;
            log::info!("replaying {} logged events", self.log.len());
        }
    }

    /// Fresh attempt: rebuild the level and drop the recording
    pub fn reset(&mut self) {
        if let Err(e) = self.install_level() {
            log::warn!("reset: {}", e);
        }
        self.log = ReplayLog::new();
    }

    // === Ticking ===

    /// Advance one tick. Called exactly once per frame. While paused only
    /// cosmetic particle state progresses; no body integrates and simulated
    /// time stands still.
    pub fn step(&mut self, paused: bool) {
        for field in &mut self.force_fields {
            field.tick(&mut self.rng);
        }
        for jet in &mut self.jet_streams {
            jet.tick(&mut self.rng);
        }
        if paused {
            return;
        }

        self.play_due_events();

        for field in &self.force_fields {
            field.update(&mut self.physics, &self.strokes);
        }
        for jet in &self.jet_streams {
            jet.update(&mut self.physics, &self.strokes);
        }
        self.physics.step();
        self.physics.clear_forces();
        self.ticks += 1;

        if !self.editing && !self.completed && self.evaluate_win() {
            log::info!("level completed at tick {}", self.ticks);
            self.completed = true;
        }
    }

    fn play_due_events(&mut self) {
        if !self.replaying {
            return;
        }
        let mut due = Vec::new();
        while let Some(event) = self.log.get(self.replay_cursor) {
            if event.tick > self.ticks {
                break;
            }
            due.push(event.clone());
            self.replay_cursor += 1;
        }
        for event in due {
            self.apply_event(event.op);
        }
        // only after the batch is applied: recording must stay suppressed
        // while the last events replay
        if self.replay_cursor >= self.log.len() {
            self.replaying = false;
        }
    }

    fn apply_event(&mut self, op: SceneOp) {
        match op {
            SceneOp::Stroke {
                color,
                attributes,
                path,
            } => {
                let path = match Path::from_relative_str(&path) {
                    Ok(p) => p,
                    Err(e) => {
                        log::warn!("unreadable logged stroke: {}", e);
                        return;
                    }
                };
                let id = self.insert_draft(path, color, attributes);
                if attributes.contains(Attributes::ROPE) {
                    if let Err(e) = self.ropeify_stroke(id) {
                        log::warn!("logged rope failed: {}", e);
                    }
                    self.delete_stroke(id);
                } else if self.activate_stroke(id).is_err() {
                    self.delete_stroke(id);
                }
            }
            SceneOp::Delete { stroke } => {
                self.delete_stroke(stroke);
            }
        }
    }

    // === Stroke lifecycle ===

    fn insert_draft(&mut self, path: Path, color: usize, attributes: Attributes) -> StrokeId {
        if let Some(old) = self.draft.take() {
            log::warn!("draft {} superseded before finalize", old);
            self.remove_stroke_entry(old);
        }
        let id = self.next_id;
        self.next_id += 1;
        self.strokes.push(Stroke::new(id, path, color, attributes));
        self.draft = Some(id);
        id
    }

    /// Begin a draft stroke at `p`. Invisible to the physics world until
    /// activated.
    pub fn new_stroke(&mut self, p: IVec2, color: usize, attributes: Attributes) -> StrokeId {
        self.insert_draft(Path::from_point(p), color, attributes)
    }

    pub fn extend_stroke(&mut self, id: StrokeId, p: IVec2) {
        if let Some(stroke) = self.stroke_mut(id) {
            if stroke.is_drafting() {
                stroke.extend(p);
            }
        }
    }

    /// Activate without recording; used for level strokes and internally
    fn activate_quiet(&mut self, id: StrokeId) -> Result<(), Error> {
        let idx = self
            .index_of(id)
            .ok_or_else(|| Error::Load(format!("no stroke {}", id)))?;
        self.strokes[idx].activate(&mut self.physics)?;
        if self.draft == Some(id) {
            self.draft = None;
        }
        self.auto_join(id);
        Ok(())
    }

    /// Finalize a draft: simplify, build its body, auto-join touching
    /// endpoints, and record it for replay. On `InvalidGeometry` the draft
    /// is left untouched for the caller to discard.
    pub fn activate_stroke(&mut self, id: StrokeId) -> Result<(), Error> {
        let idx = self
            .index_of(id)
            .ok_or_else(|| Error::Load(format!("no stroke {}", id)))?;
        let raw = self.strokes[idx].path().clone();
        let color = self.strokes[idx].color();
        let attributes = self.strokes[idx].attributes();
        self.strokes[idx].activate(&mut self.physics)?;
        if self.draft == Some(id) {
            self.draft = None;
        }
        if !self.replaying {
            self.log
                .record(self.ticks, SceneOp::stroke(color, attributes, &raw));
        }
        self.auto_join(id);
        Ok(())
    }

    /// Convert a draft into a chain of rigid links connected by pivot
    /// joints. The source draft is left inert; the caller deletes it.
    /// Returns the ids of the activated links in order.
    pub fn ropeify_stroke(&mut self, id: StrokeId) -> Result<Vec<StrokeId>, Error> {
        let idx = self
            .index_of(id)
            .ok_or_else(|| Error::Load(format!("no stroke {}", id)))?;
        let links = self.strokes[idx].rope_links()?;
        let raw = self.strokes[idx].path().clone();
        let color = self.strokes[idx].color();
        let attributes = self.strokes[idx].attributes();
        let link_attributes = self.strokes[idx].link_attributes();
        // The source stays in the stroke list while links are inserted; it
        // must not be treated as a superseded draft.
        self.draft = None;

        if !self.replaying {
            self.log.record(
                self.ticks,
                SceneOp::stroke(color, attributes.with(Attributes::ROPE), &raw),
            );
        }

        let mut ids = Vec::with_capacity(links.len());
        for link in links {
            let link_id = self.insert_draft(link, color, link_attributes);
            match self.activate_quiet(link_id) {
                Ok(()) => ids.push(link_id),
                Err(e) => {
                    log::warn!("rope link skipped: {}", e);
                    self.remove_stroke_entry(link_id);
                }
            }
        }
        self.draft = Some(id);
        log::debug!("ropeified stroke {} into {} links", id, ids.len());
        Ok(ids)
    }

    /// Erase a stroke and its body. Refuses level-authored strokes while
    /// protection is on; returns whether anything was deleted.
    pub fn delete_stroke(&mut self, id: StrokeId) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        let was_active = self.strokes[idx].is_active();
        if was_active && self.protection && id < self.protected_below {
            log::debug!("stroke {} is protected", id);
            return false;
        }
        self.strokes[idx].erase(&mut self.physics);
        self.strokes.remove(idx);
        if self.draft == Some(id) {
            self.draft = None;
        }
        if was_active && !self.replaying {
            self.log.record(self.ticks, SceneOp::Delete { stroke: id });
        }
        true
    }

    /// Drop a stroke entry without touching the log (draft bookkeeping)
    fn remove_stroke_entry(&mut self, id: StrokeId) {
        if let Some(idx) = self.index_of(id) {
            self.strokes[idx].erase(&mut self.physics);
            self.strokes.remove(idx);
        }
        if self.draft == Some(id) {
            self.draft = None;
        }
    }

    /// Teleport a stroke so its origin lands on `to` (move gesture)
    pub fn move_stroke(&mut self, id: StrokeId, to: IVec2) {
        let Some(stroke) = self.stroke(id) else {
            return;
        };
        if let Some(handle) = stroke.body() {
            self.physics.set_translation(handle, to.as_vec2());
        }
    }

    // === Queries ===

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn stroke(&self, id: StrokeId) -> Option<&Stroke> {
        self.strokes.iter().find(|s| s.id() == id)
    }

    fn stroke_mut(&mut self, id: StrokeId) -> Option<&mut Stroke> {
        self.strokes.iter_mut().find(|s| s.id() == id)
    }

    fn index_of(&self, id: StrokeId) -> Option<usize> {
        self.strokes.iter().position(|s| s.id() == id)
    }

    /// Nearest active stroke within `tolerance` of `p`; later (topmost)
    /// strokes win ties
    pub fn stroke_at_point(&self, p: Vec2, tolerance: f32) -> Option<StrokeId> {
        let mut best: Option<(StrokeId, f32)> = None;
        for stroke in &self.strokes {
            if !stroke.is_active() {
                continue;
            }
            if let Some(d) = stroke.distance_to(p, &self.physics) {
                if d <= tolerance && best.map(|(_, bd)| d <= bd).unwrap_or(true) {
                    best = Some((stroke.id(), d));
                }
            }
        }
        best.map(|(id, _)| id)
    }

    /// Advisory joint points for the draft's free endpoint, one per nearby
    /// stroke, sorted by ascending distance. Drives the UI indicator; the
    /// authoritative joining happens at activation.
    pub fn joint_candidates(&self, draft_id: StrokeId) -> Vec<JointCandidate> {
        let Some(draft) = self.stroke(draft_id) else {
            return Vec::new();
        };
        let Some(tip) = draft.path().last() else {
            return Vec::new();
        };
        let tip = tip.as_vec2();

        let mut candidates = Vec::new();
        for stroke in &self.strokes {
            if let Some((_, _, point, d)) = self.attach_test(stroke, tip, draft_id) {
                candidates.push(JointCandidate { point, distance: d });
            }
        }
        candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        candidates
    }

    /// Broad vertex pass then precise edge projection against one stroke
    fn attach_test(
        &self,
        stroke: &Stroke,
        p: Vec2,
        exclude: StrokeId,
    ) -> Option<(StrokeId, RigidBodyHandle, Vec2, f32)> {
        if stroke.id() == exclude || !stroke.is_active() {
            return None;
        }
        if stroke.attributes().contains(Attributes::DECOR) {
            return None;
        }
        let handle = stroke.body()?;
        let points = stroke.world_points(&self.physics);
        let broad = points.iter().any(|&v| (p - v).length() <= JOINT_TOLERANCE);
        if !broad {
            return None;
        }
        let mut best: Option<(Vec2, f32)> = None;
        if points.len() == 1 {
            best = Some((points[0], (p - points[0]).length()));
        }
        for w in points.windows(2) {
            let (q, d) = crate::sim::path::project_on_segment(p, w[0], w[1]);
            if best.map(|(_, bd)| d < bd).unwrap_or(true) {
                best = Some((q, d));
            }
        }
        let (point, d) = best?;
        (d <= JOINT_TOLERANCE).then_some((stroke.id(), handle, point, d))
    }

    /// Pin each endpoint of a freshly activated stroke to the closest
    /// touching stroke, if any
    fn auto_join(&mut self, id: StrokeId) {
        let Some(stroke) = self.stroke(id) else {
            return;
        };
        if stroke.attributes().contains(Attributes::DECOR) {
            return;
        }
        let Some(body) = stroke.body() else {
            return;
        };
        let (Some(first), Some(last)) = (stroke.path().first(), stroke.path().last()) else {
            return;
        };
        let mut endpoints = vec![first.as_vec2()];
        if last != first {
            endpoints.push(last.as_vec2());
        }

        let mut joints = Vec::new();
        for tip in endpoints {
            let mut best: Option<(RigidBodyHandle, f32)> = None;
            for other in &self.strokes {
                if let Some((_, handle, _, d)) = self.attach_test(other, tip, id) {
                    if best.map(|(_, bd)| d < bd).unwrap_or(true) {
                        best = Some((handle, d));
                    }
                }
            }
            if let Some((other_body, _)) = best {
                joints.push((other_body, tip));
            }
        }
        for (other_body, at) in joints {
            log::debug!("joining stroke {} at {},{}", id, at.x, at.y);
            self.physics.add_pivot_joint(body, other_body, at);
        }
    }

    /// Tap test for scripted strokes: toggles the mechanism of an
    /// INTERACTIVE stroke near `p` between asleep and awake. Returns whether
    /// the tap was consumed (suppressing a draw gesture there).
    pub fn interact(&mut self, p: Vec2) -> bool {
        let hit = self.strokes.iter().find_map(|stroke| {
            if !stroke.is_active() || !stroke.attributes().contains(Attributes::INTERACTIVE) {
                return None;
            }
            let d = stroke.distance_to(p, &self.physics)?;
            if d <= SELECT_TOLERANCE { stroke.body() } else { None }
        });
        let Some(handle) = hit else {
            return false;
        };
        if self.physics.is_sleeping(handle) {
            self.physics.wake(handle);
        } else {
            self.physics.sleep(handle);
        }
        true
    }

    fn evaluate_win(&self) -> bool {
        match &self.win {
            WinCondition::None => false,
            WinCondition::StrokeInRegion { stroke, region } => self
                .level_stroke(*stroke)
                .and_then(|s| s.body())
                .map(|h| region.contains(self.physics.translation(h)))
                .unwrap_or(false),
            WinCondition::StrokesTouch { a, b } => {
                let (Some(ha), Some(hb)) = (
                    self.level_stroke(*a).and_then(|s| s.body()),
                    self.level_stroke(*b).and_then(|s| s.body()),
                ) else {
                    return false;
                };
                self.physics.in_contact(ha, hb)
            }
        }
    }

    fn level_stroke(&self, index: usize) -> Option<&Stroke> {
        self.level_ids.get(index).and_then(|&id| self.stroke(id))
    }

    /// Latched once the win condition holds; cleared only by reset/reload
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn is_replaying(&self) -> bool {
        self.replaying
    }

    pub fn log(&self) -> &ReplayLog {
        &self.log
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    // === Protection / edit mode ===

    /// Restrict deletion and undo to user-added strokes (play mode)
    pub fn protect(&mut self) {
        self.protection = true;
        self.editing = false;
    }

    /// Lift protection for edit mode; completion checks are suppressed
    pub fn unprotect(&mut self) {
        self.protection = false;
        self.editing = true;
    }

    // === Jetstreams ===

    /// Begin a transient force emitter at `p`; resize it while the drag
    /// lasts, then simply stop referencing the handle
    pub fn new_jet_stream(&mut self, p: IVec2) -> JetStreamId {
        self.jet_streams.push(JetStream::new(p));
        self.jet_streams.len() - 1
    }

    pub fn resize_jet_stream(&mut self, id: JetStreamId, p: IVec2) {
        if let Some(jet) = self.jet_streams.get_mut(id) {
            jet.resize(p);
        } else {
            log::warn!("resize of unknown jetstream {}", id);
        }
    }

    pub fn jet_streams(&self) -> &[JetStream] {
        &self.jet_streams
    }

    pub fn force_fields(&self) -> &[ForceField] {
        &self.force_fields
    }

    // === Persistence ===

    /// Current state as a level document; with `demo` the pristine level
    /// plus the full replay log instead
    pub fn save_document(&self, demo: bool) -> Level {
        if demo {
            let mut level = self.level.clone().unwrap_or_default();
            level.log = Some(self.log.clone());
            return level;
        }
        let mut level = Level {
            title: self
                .level
                .as_ref()
                .map(|l| l.title.clone())
                .unwrap_or_default(),
            seed: self.level.as_ref().and_then(|l| l.seed),
            strokes: Vec::new(),
            fields: self.force_fields.clone(),
            win: self.win.clone(),
            log: None,
        };
        for stroke in &self.strokes {
            if !stroke.is_active() {
                continue;
            }
            let points: Vec<IVec2> = stroke
                .world_points(&self.physics)
                .into_iter()
                .map(|p| p.round().as_ivec2())
                .collect();
            level.strokes.push(StrokeSpec {
                path: Path::from_points(points).to_relative_string(),
                color: stroke.color(),
                attributes: stroke.attributes().without(Attributes::ROPE),
            });
        }
        level
    }

    /// Serialize to a writer; `Error::Io` on write failure
    pub fn save_to_writer(&self, w: &mut dyn std::io::Write, demo: bool) -> Result<(), Error> {
        let doc = self.save_document(demo);
        let json = doc.to_json()?;
        w.write_all(json.as_bytes())?;
        Ok(())
    }

    /// Serialize to a file; `Error::Io` on write failure
    pub fn save(&self, path: &std::path::Path, demo: bool) -> Result<(), Error> {
        let mut file = std::fs::File::create(path)?;
        self.save_to_writer(&mut file, demo)?;
        log::info!("saved {} to {}", if demo { "demo" } else { "level" }, path.display());
        Ok(())
    }

    // === Presentation ===

    /// Draw everything in creation order (drafts included, so the player
    /// sees the line under their finger)
    pub fn draw(&self, canvas: &mut dyn Canvas) {
        for field in &self.force_fields {
            field.draw(canvas);
        }
        for jet in &self.jet_streams {
            jet.draw(canvas);
        }
        for stroke in &self.strokes {
            let points = stroke.world_points(&self.physics);
            canvas.draw_polyline(&points, palette::color(stroke.color()));
        }
    }
}

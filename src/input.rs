//! Gesture routing into the scene
//!
//! The presentation layer turns raw pointer/key input into [`GestureEvent`]s
//! (its event map decides which — draw, move, erase or jetstream). The
//! dispatcher owns the in-flight gesture state and drives the scene, so the
//! physics core never sees half-finished input.

use glam::{IVec2, Vec2};

use crate::consts::SELECT_TOLERANCE;
use crate::sim::force_field::JetStreamId;
use crate::sim::scene::Scene;
use crate::sim::stroke::{Attributes, StrokeId};

/// What a primary pointer drag means right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClickMode {
    #[default]
    DrawStroke,
    Move,
    Erase,
    DrawJetStream,
}

impl ClickMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClickMode::DrawStroke => "draw stroke",
            ClickMode::Move => "move",
            ClickMode::Erase => "erase",
            ClickMode::DrawJetStream => "draw jetstream",
        }
    }
}

/// Explicit session context: click mode, tool state and pause/edit flags.
/// Passed into the dispatcher instead of living in module statics.
#[derive(Debug, Clone)]
pub struct Session {
    pub click_mode: ClickMode,
    /// Active color/tool index for new strokes
    pub color: usize,
    pub draw_ground: bool,
    pub draw_sleeping: bool,
    pub draw_decor: bool,
    pub draw_interactive: bool,
    pub draw_rope: bool,
    pub paused: bool,
    pub editing: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            click_mode: ClickMode::DrawStroke,
            color: 2,
            draw_ground: false,
            draw_sleeping: false,
            draw_decor: false,
            draw_interactive: false,
            draw_rope: false,
            paused: false,
            editing: false,
        }
    }
}

impl Session {
    /// Attribute mask for a stroke drawn with the current toggles
    pub fn draw_attributes(&self) -> Attributes {
        let mut attributes = Attributes::default();
        if self.draw_ground {
            attributes = attributes.with(Attributes::GROUND);
        }
        if self.draw_sleeping {
            attributes = attributes.with(Attributes::SLEEPING);
        }
        if self.draw_decor {
            attributes = attributes.with(Attributes::DECOR);
        }
        if self.draw_interactive {
            attributes = attributes.with(Attributes::INTERACTIVE);
        }
        if self.draw_rope {
            attributes = attributes.with(Attributes::ROPE);
        }
        attributes
    }
}

/// Gesture and command events delivered by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureEvent {
    DrawBegin(IVec2),
    DrawMore(IVec2),
    DrawEnd,
    MoveBegin(IVec2),
    MoveMore(IVec2),
    MoveEnd,
    JetStreamBegin(IVec2),
    JetStreamMore(IVec2),
    JetStreamEnd,
    Delete(IVec2),
    Undo,
    Pause,
    Edit,
    Reset,
}

/// Play statistics for the current attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub stroke_count: u32,
    pub paused_strokes: u32,
    pub rope_count: u32,
    pub paused_ropes: u32,
    pub undo_count: u32,
}

impl Stats {
    pub fn reset(&mut self) {
        *self = Stats::default();
    }
}

/// Routes gesture events into the scene, holding whatever state a gesture
/// needs between its begin and end
#[derive(Debug, Default)]
pub struct Dispatcher {
    draft: Option<StrokeId>,
    moving: Option<(StrokeId, Vec2)>,
    jet: Option<JetStreamId>,
    pub stats: Stats,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle one event; returns whether it was consumed
    pub fn handle(&mut self, scene: &mut Scene, session: &mut Session, event: GestureEvent) -> bool {
        match event {
            GestureEvent::DrawBegin(p) => self.draw_begin(scene, session, p),
            GestureEvent::DrawMore(p) => {
                if let Some(id) = self.draft {
                    scene.extend_stroke(id, p);
                }
                true
            }
            GestureEvent::DrawEnd => self.draw_end(scene, session),
            GestureEvent::MoveBegin(p) => {
                if !scene.is_replaying() && self.moving.is_none() {
                    let point = p.as_vec2();
                    if let Some(id) = scene.stroke_at_point(point, SELECT_TOLERANCE) {
                        let origin = scene.stroke(id).map(|s| s.origin(scene.physics()));
                        if let Some(origin) = origin {
                            self.moving = Some((id, point - origin));
                        }
                    }
                }
                true
            }
            GestureEvent::MoveMore(p) => {
                if let Some((id, offset)) = self.moving {
                    let to = (p.as_vec2() - offset).round().as_ivec2();
                    scene.move_stroke(id, to);
                }
                true
            }
            GestureEvent::MoveEnd => {
                self.moving = None;
                true
            }
            GestureEvent::JetStreamBegin(p) => {
                self.jet = Some(scene.new_jet_stream(p));
                true
            }
            GestureEvent::JetStreamMore(p) => {
                if let Some(id) = self.jet {
                    scene.resize_jet_stream(id, p);
                }
                true
            }
            GestureEvent::JetStreamEnd => {
                self.jet = None;
                true
            }
            GestureEvent::Delete(p) => {
                if let Some(id) = scene.stroke_at_point(p.as_vec2(), SELECT_TOLERANCE) {
                    scene.delete_stroke(id);
                }
                true
            }
            GestureEvent::Undo => self.undo(scene),
            GestureEvent::Pause => {
                session.paused = !session.paused;
                true
            }
            GestureEvent::Edit => self.toggle_edit(scene, session),
            GestureEvent::Reset => {
                self.abandon(scene);
                self.stats.reset();
                scene.reset();
                true
            }
        }
    }

    fn draw_begin(&mut self, scene: &mut Scene, session: &Session, p: IVec2) -> bool {
        if scene.is_replaying() || self.draft.is_some() {
            return true;
        }
        // a tap on an interactive stroke triggers it instead of drawing
        if scene.interact(p.as_vec2()) {
            return true;
        }
        let id = scene.new_stroke(p, session.color, session.draw_attributes());
        self.draft = Some(id);
        true
    }

    fn draw_end(&mut self, scene: &mut Scene, session: &Session) -> bool {
        let Some(id) = self.draft.take() else {
            return true;
        };
        let is_rope = scene
            .stroke(id)
            .map(|s| s.attributes().contains(Attributes::ROPE))
            .unwrap_or(false);
        if is_rope {
            match scene.ropeify_stroke(id) {
                Ok(_) => {
                    self.stats.rope_count += 1;
                    if session.paused {
                        self.stats.paused_ropes += 1;
                    }
                }
                Err(e) => log::debug!("rope draft discarded: {}", e),
            }
            scene.delete_stroke(id);
        } else if scene.activate_stroke(id).is_ok() {
            self.stats.stroke_count += 1;
            if session.paused {
                self.stats.paused_strokes += 1;
            }
        } else {
            // degenerate draft: discard silently
            scene.delete_stroke(id);
        }
        true
    }

    fn undo(&mut self, scene: &mut Scene) -> bool {
        if scene.is_replaying() {
            return true;
        }
        if let Some(id) = self.draft.take() {
            scene.delete_stroke(id);
            return true;
        }
        if let Some(last) = scene.strokes().last().map(|s| s.id()) {
            if scene.delete_stroke(last) {
                self.stats.undo_count += 1;
            }
        }
        true
    }

    fn toggle_edit(&mut self, scene: &mut Scene, session: &mut Session) -> bool {
        session.editing = !session.editing;
        if session.editing {
            scene.unprotect();
            if !session.paused {
                session.paused = true;
            }
        } else {
            scene.protect();
            session.draw_ground = false;
            session.draw_sleeping = false;
            session.draw_decor = false;
            if session.color < 2 {
                session.color = 2;
            }
        }
        true
    }

    /// Drop any in-flight gesture without finalizing it
    pub fn abandon(&mut self, scene: &mut Scene) {
        if let Some(id) = self.draft.take() {
            scene.delete_stroke(id);
        }
        self.moving = None;
        self.jet = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{Level, StrokeSpec, WinCondition};
    use crate::sim::path::Path;

    fn ground_level() -> Level {
        let path = Path::from_points(vec![IVec2::new(0, 200), IVec2::new(400, 200)]);
        Level {
            strokes: vec![StrokeSpec {
                path: path.to_relative_string(),
                color: 0,
                attributes: Attributes::GROUND,
            }],
            win: WinCondition::None,
            ..Default::default()
        }
    }

    fn drag(
        d: &mut Dispatcher,
        scene: &mut Scene,
        session: &mut Session,
        points: &[(i32, i32)],
    ) {
        d.handle(
            scene,
            session,
            GestureEvent::DrawBegin(IVec2::new(points[0].0, points[0].1)),
        );
        for &(x, y) in &points[1..] {
            d.handle(scene, session, GestureEvent::DrawMore(IVec2::new(x, y)));
        }
        d.handle(scene, session, GestureEvent::DrawEnd);
    }

    #[test]
    fn test_draw_gesture_activates_stroke() {
        let mut scene = Scene::new();
        let mut session = Session::default();
        let mut d = Dispatcher::new();

        drag(&mut d, &mut scene, &mut session, &[(0, 0), (50, 0), (100, 20)]);
        assert_eq!(scene.strokes().len(), 1);
        assert!(scene.strokes()[0].is_active());
        assert_eq!(d.stats.stroke_count, 1);
        assert_eq!(d.stats.paused_strokes, 0);
    }

    #[test]
    fn test_degenerate_drag_discarded_silently() {
        let mut scene = Scene::new();
        let mut session = Session::default();
        let mut d = Dispatcher::new();

        drag(&mut d, &mut scene, &mut session, &[(10, 10)]);
        assert!(scene.strokes().is_empty());
        assert_eq!(scene.physics().body_count(), 0);
        assert_eq!(d.stats.stroke_count, 0);
    }

    #[test]
    fn test_rope_toggle_builds_chain() {
        let mut scene = Scene::new();
        let mut session = Session {
            draw_rope: true,
            ..Default::default()
        };
        let mut d = Dispatcher::new();

        drag(
            &mut d,
            &mut scene,
            &mut session,
            &[(0, 0), (40, 60), (80, 0), (120, 60)],
        );
        // source replaced by its links
        assert_eq!(scene.strokes().len(), 3);
        assert!(scene.strokes().iter().all(|s| s.is_active()));
        assert_eq!(scene.physics().joint_count(), 2);
        assert_eq!(d.stats.rope_count, 1);
    }

    #[test]
    fn test_undo_spares_protected_ground() {
        let mut scene = Scene::new();
        scene.load(&ground_level()).unwrap();
        let mut session = Session::default();
        let mut d = Dispatcher::new();

        drag(&mut d, &mut scene, &mut session, &[(50, 50), (150, 50)]);
        assert_eq!(scene.strokes().len(), 2);

        d.handle(&mut scene, &mut session, GestureEvent::Undo);
        assert_eq!(scene.strokes().len(), 1);
        assert_eq!(d.stats.undo_count, 1);

        // only the ground stroke is left, and it resists undo
        d.handle(&mut scene, &mut session, GestureEvent::Undo);
        assert_eq!(scene.strokes().len(), 1);
        assert_eq!(d.stats.undo_count, 1);
    }

    #[test]
    fn test_interact_consumes_draw_begin() {
        let mut scene = Scene::new();
        let path = Path::from_points(vec![IVec2::new(100, 100), IVec2::new(160, 100)]);
        let level = Level {
            strokes: vec![StrokeSpec {
                path: path.to_relative_string(),
                color: 1,
                attributes: Attributes::SLEEPING.with(Attributes::INTERACTIVE),
            }],
            ..Default::default()
        };
        scene.load(&level).unwrap();
        let mut session = Session::default();
        let mut d = Dispatcher::new();

        d.handle(
            &mut scene,
            &mut session,
            GestureEvent::DrawBegin(IVec2::new(130, 101)),
        );
        d.handle(&mut scene, &mut session, GestureEvent::DrawEnd);
        // the tap triggered the mechanism; no draft was started
        assert_eq!(scene.strokes().len(), 1);
        let body = scene.strokes()[0].body().unwrap();
        assert!(!scene.physics().is_sleeping(body));
    }

    #[test]
    fn test_move_gesture_keeps_grab_offset() {
        let mut scene = Scene::new();
        let mut session = Session::default();
        let mut d = Dispatcher::new();
        drag(
            &mut d,
            &mut scene,
            &mut session,
            &[(100, 100), (200, 100)],
        );
        let id = scene.strokes()[0].id();

        // grab mid-stroke and drag 50px right
        d.handle(
            &mut scene,
            &mut session,
            GestureEvent::MoveBegin(IVec2::new(150, 100)),
        );
        d.handle(
            &mut scene,
            &mut session,
            GestureEvent::MoveMore(IVec2::new(200, 100)),
        );
        d.handle(&mut scene, &mut session, GestureEvent::MoveEnd);

        let origin = scene.stroke(id).unwrap().origin(scene.physics());
        assert!((origin - Vec2::new(150.0, 100.0)).length() < 1.0);
    }

    #[test]
    fn test_edit_toggles_protection_and_pause() {
        let mut scene = Scene::new();
        scene.load(&ground_level()).unwrap();
        let ground = scene.strokes()[0].id();
        let mut session = Session::default();
        let mut d = Dispatcher::new();

        d.handle(&mut scene, &mut session, GestureEvent::Edit);
        assert!(session.editing);
        assert!(session.paused);
        assert!(scene.delete_stroke(ground));

        d.handle(&mut scene, &mut session, GestureEvent::Edit);
        assert!(!session.editing);
    }

    #[test]
    fn test_jetstream_gesture_lifecycle() {
        let mut scene = Scene::new();
        let mut session = Session {
            click_mode: ClickMode::DrawJetStream,
            ..Default::default()
        };
        let mut d = Dispatcher::new();

        d.handle(
            &mut scene,
            &mut session,
            GestureEvent::JetStreamBegin(IVec2::new(10, 10)),
        );
        d.handle(
            &mut scene,
            &mut session,
            GestureEvent::JetStreamMore(IVec2::new(200, 40)),
        );
        d.handle(&mut scene, &mut session, GestureEvent::JetStreamEnd);
        assert_eq!(scene.jet_streams().len(), 1);
        assert!(scene.jet_streams()[0].force().x > 0.0);
    }
}

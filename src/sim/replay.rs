//! Append-only scene event log
//!
//! Everything needed to reconstruct a play session deterministically:
//! stroke creations (including rope sources) and deletions, stamped with the
//! tick they happened on. Saved inside demo files; playback never mutates it.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::sim::path::Path;
use crate::sim::stroke::{Attributes, StrokeId};

/// A logged scene mutation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SceneOp {
    /// A stroke was drawn and finalized. Rope sources keep their ROPE
    /// attribute so playback re-runs the conversion.
    Stroke {
        color: usize,
        attributes: Attributes,
        path: String,
    },
    /// A stroke was erased (undo or erase gesture)
    Delete { stroke: StrokeId },
}

impl SceneOp {
    pub fn stroke(color: usize, attributes: Attributes, path: &Path) -> Self {
        SceneOp::Stroke {
            color,
            attributes,
            path: path.to_relative_string(),
        }
    }

    /// Decode the path of a `Stroke` op
    pub fn decode_path(&self) -> Result<Option<Path>, Error> {
        match self {
            SceneOp::Stroke { path, .. } => Ok(Some(Path::from_relative_str(path)?)),
            SceneOp::Delete { .. } => Ok(None),
        }
    }
}

/// A scene op plus the tick it fired on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneEvent {
    pub tick: u64,
    #[serde(flatten)]
    pub op: SceneOp,
}

/// Append-only, order-preserving log of scene events
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplayLog {
    events: Vec<SceneEvent>,
}

impl ReplayLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, tick: u64, op: SceneOp) {
        debug_assert!(
            self.events.last().map(|e| e.tick <= tick).unwrap_or(true),
            "replay log must stay ordered"
        );
        self.events.push(SceneEvent { tick, op });
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SceneEvent> {
        self.events.get(index)
    }

    pub fn events(&self) -> &[SceneEvent] {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec2;

    #[test]
    fn test_log_preserves_order() {
        let mut log = ReplayLog::new();
        let path = Path::from_points(vec![IVec2::new(0, 0), IVec2::new(10, 0)]);
        log.record(5, SceneOp::stroke(2, Attributes::default(), &path));
        log.record(9, SceneOp::Delete { stroke: 0 });
        assert_eq!(log.len(), 2);
        assert_eq!(log.get(0).unwrap().tick, 5);
        assert_eq!(log.get(1).unwrap().tick, 9);
    }

    #[test]
    fn test_log_serde_roundtrip() {
        let mut log = ReplayLog::new();
        let path = Path::from_points(vec![IVec2::new(3, 4), IVec2::new(13, 24)]);
        log.record(1, SceneOp::stroke(1, Attributes::ROPE, &path));
        log.record(2, SceneOp::Delete { stroke: 7 });

        let json = serde_json::to_string(&log).unwrap();
        let back: ReplayLog = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 2);
        match &back.get(0).unwrap().op {
            SceneOp::Stroke {
                color,
                attributes,
                path,
            } => {
                assert_eq!(*color, 1);
                assert!(attributes.contains(Attributes::ROPE));
                let decoded = Path::from_relative_str(path).unwrap();
                assert_eq!(decoded.points()[1], IVec2::new(13, 24));
            }
            other => panic!("unexpected op {:?}", other),
        }
    }
}

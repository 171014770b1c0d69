//! Level and demo file model
//!
//! Levels are JSON documents: metadata, authored strokes (compact
//! relative-encoded paths), force fields and a win condition. Demo files are
//! the same document with a replay log attached.

use serde::{Deserialize, Serialize};

use crate::canvas::palette;
use crate::error::Error;
use crate::sim::force_field::ForceField;
use crate::sim::path::{Path, Rect};
use crate::sim::replay::ReplayLog;
use crate::sim::stroke::Attributes;

/// One authored stroke in a level file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrokeSpec {
    /// Relative-encoded point list ("x,y dx,dy ...")
    pub path: String,
    #[serde(default)]
    pub color: usize,
    #[serde(default)]
    pub attributes: Attributes,
}

impl StrokeSpec {
    pub fn decode_path(&self) -> Result<Path, Error> {
        Path::from_relative_str(&self.path)
    }
}

/// The level's win condition, chosen by level data rather than code
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WinCondition {
    /// Sandbox: never completes
    #[default]
    None,
    /// A stroke's body origin enters a target region
    StrokeInRegion { stroke: usize, region: Rect },
    /// Two strokes' bodies come into contact
    StrokesTouch { a: usize, b: usize },
}

/// A parsed level (or demo) document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Level {
    #[serde(default)]
    pub title: String,
    /// Seed for the cosmetic RNG; levels replay identically regardless
    #[serde(default)]
    pub seed: Option<u64>,
    /// Authored strokes, in draw order (background decor first by convention)
    #[serde(default)]
    pub strokes: Vec<StrokeSpec>,
    #[serde(default)]
    pub fields: Vec<ForceField>,
    #[serde(default)]
    pub win: WinCondition,
    /// Present only in demo files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<ReplayLog>,
}

impl Level {
    /// Parse and validate a level document. Structural problems are errors;
    /// recoverable oddities (out-of-range colors) are warned about and kept.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let level: Level = serde_json::from_str(text)?;
        for (i, spec) in level.strokes.iter().enumerate() {
            spec.decode_path()
                .map_err(|e| Error::Load(format!("stroke {}: {}", i, e)))?;
            if spec.color >= palette::VALUES.len() {
                log::warn!("stroke {} color {} out of palette range", i, spec.color);
            }
        }
        if let WinCondition::StrokeInRegion { stroke, .. } = level.win {
            if stroke >= level.strokes.len() {
                return Err(Error::Load(format!(
                    "win condition names stroke {} but level has {}",
                    stroke,
                    level.strokes.len()
                )));
            }
        }
        if let WinCondition::StrokesTouch { a, b } = level.win {
            if a >= level.strokes.len() || b >= level.strokes.len() {
                return Err(Error::Load("win condition names a missing stroke".into()));
            }
        }
        Ok(level)
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

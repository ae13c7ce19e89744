//! Line crossing tracker
//!
//! Associates per-frame person detections into persistent tracks and turns
//! track trajectories into directional crossing events, firing once per
//! physical crossing.
//!
//! # Usage
//!
//! ```rust,ignore
//! use linetrack::{AssociationEngine, EngineConfig, Line, WorldConfig};
//! use linetrack::affinities::PositionAffinity;
//!
//! let world = WorldConfig::new(Line::from_coords(0.0, 0.5, 1.0, 0.5), vec![]);
//! let mut engine = AssociationEngine::new(EngineConfig::default())
//!     .with_affinity(1.0, PositionAffinity::new(0.7));
//!
//! let events = engine.process(&world, &detections, &frame, frame_no)?;
//! ```

pub mod affinities;
pub mod affinity;
pub mod bbox;
pub mod detection;
pub mod engine;
pub mod error;
pub mod event;
pub mod geom;
pub mod track;
pub mod world;

pub use affinity::{Affinity, DynAffinity, TrackData, WeightedAffinity};
pub use bbox::{PixelRect, Rect};
pub use detection::Detection;
pub use engine::{AssociationEngine, EngineConfig, TrackListener, Tracker};
pub use error::{ConfigError, Result, TrackError};
pub use event::{Counts, Event};
pub use geom::{Line, Point};
pub use track::Track;
pub use world::WorldConfig;

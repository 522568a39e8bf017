//! Driver Watch
//!
//! Real-time monitoring of a vehicle cabin camera for unsafe driver
//! behaviour: eyes closed, seatbelt not worn, smoking and phone use.
//!
//! # Pipeline
//!
//! Every frame runs through the same fixed sequence:
//!
//! 1. **Ingest**: a `FrameSource` delivers a BGR frame (V4L2 camera or the
//!    synthetic `stub://` source).
//! 2. **Detect**: a `DetectorBackend` returns labelled detections.
//! 3. **Score**: detections are reduced to one confidence per condition
//!    (max over matching labels, 0 when absent).
//! 4. **Debounce**: one timer per condition accumulates how long its score
//!    has been on the unsafe side of its threshold. A condition alerts once
//!    the accumulated time exceeds its persistence period.
//! 5. **Present**: a `PresentationSink` shows the alert state every frame
//!    and starts an audio cue only on a fresh alert.
//!
//! # Module Structure
//!
//! - `condition`: the four conditions and their threshold/persistence rules
//! - `score`: per-frame condition scores
//! - `engine`: debounce timers and alert edges
//! - `session`: clock abstraction and per-session state
//! - `monitor`: the frame loop, start/stop control and run summary
//! - `frame`, `ingest`, `detect`, `present`: pipeline stages
//! - `config`, `ui`: configuration loading and terminal output

pub mod condition;
pub mod config;
pub mod detect;
pub mod engine;
pub mod frame;
pub mod ingest;
pub mod monitor;
pub mod present;
pub mod score;
pub mod session;
pub mod ui;

pub use condition::{Condition, ConditionRule, ConditionRules, Direction};
pub use config::MonitorConfig;
pub use detect::{BoundingBox, Detection, DetectorBackend};
pub use engine::{AlertEngine, ConditionTimer, FrameAlerts, TimerState};
pub use frame::{Frame, PixelFormat};
pub use ingest::{open_source, FrameSource, SourceStats, SyntheticSource};
pub use monitor::{Monitor, MonitorControl, RunSummary, StopReason};
pub use present::{AudioCue, ConsoleSink, FanoutSink, PresentationSink};
pub use score::ConditionScores;
pub use session::{Clock, FixedStepClock, FrameReport, MonitoringSession, SystemClock};

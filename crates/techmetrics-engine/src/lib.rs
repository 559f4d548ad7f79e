//! TechMetrics Engine - Orchestration layer
//!
//! Coordinates the pure resolution/consolidation logic in `techmetrics-core`
//! with persistence in `techmetrics-store`.

pub mod commands;

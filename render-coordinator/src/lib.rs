//! Dashboard render-completion coordinator
//!
//! Decides when a dashboard made of an a-priori-unknown number of
//! independently rendering widgets has finished rendering, so export
//! snapshotting, loading indicators and test synchronization can proceed.
//! Widgets talk to the coordinator only through the event bus actor.

pub mod actors;
pub mod render;
pub mod simulation;

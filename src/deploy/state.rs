// ABOUTME: Rollout state marker types for the type state pattern.
// ABOUTME: Zero-sized types enforce valid slot transitions at compile time.

/// Target slot chosen, nothing touched yet.
/// Available actions: `pull_images()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Planned;

/// Every image the rollout needs is present locally.
/// Available actions: `start_slot()`
#[derive(Debug, Clone, Copy, Default)]
pub struct ImagesPulled;

/// Target slot containers started (slot is `starting`).
/// Available actions: `health_check()`
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotStarted;

/// Every target container passed its health gate (slot is `healthy`).
/// Available actions: `switch()`, `keep_in_place()`
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotHealthy;

/// Active color recorded; the old slot is `draining`.
/// Available actions: `decommission()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Switched;

/// Rollout finished.
#[derive(Debug, Clone, Copy, Default)]
pub struct Completed;

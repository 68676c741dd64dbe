//! Stable exit codes shared by the infantry, secretary and general binaries.

/// Run completed (for infantry: the mission succeeded).
pub const OK: i32 = 0;
/// Invalid configuration, missing credential, bad repository path or another startup failure.
pub const INVALID: i32 = 1;
/// The mission (or, for the general, at least one mission) ended in ERROR.
pub const MISSION_FAILED: i32 = 2;

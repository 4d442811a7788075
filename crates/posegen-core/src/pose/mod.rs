//! Pose data model.
//!
//! Provides:
//! - [`PoseRecord`], one description plus facial weights, joint rotations
//!   and root/IK offsets
//! - Canonical [`Quat`] and [`Vec3`] types that read either on-disk spelling
//! - Record validation against a [`Vocabulary`](crate::vocab::Vocabulary)

mod geometry;
mod record;

pub use geometry::{BoneLayout, Quat, Vec3};
pub use record::{PoseRecord, RecordIssue, ValidationRules};

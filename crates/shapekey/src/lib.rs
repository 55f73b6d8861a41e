//! Left/right shape key tools.
//!
//! This crate provides the geometry and naming logic behind a set of shape
//! key (blendshape) operations:
//! - Splitting a symmetric deformation into independent left/right halves
//! - Merging a left/right pair back into one key
//! - Baking a pending mirror modifier while carrying every key over
//! - Renaming suffixed halves to MMD names
//! - Linking same-named keys across meshes so their values move together
//!
//! # Architecture
//!
//! The host scene is modeled in memory ([`Scene`], [`Mesh`]). Vertices are
//! assigned to a side by the sign of one Basis coordinate ([`Partition`]);
//! pairs are found by name ([`NameResolver`], [`collect_pairs`]), including an
//! irregular alias table for MMD expressions. [`ShapeKeyTools`] wraps the
//! algorithms into host commands that report a [`CommandReport`].
//!
//! ## Key Components
//!
//! - **names / pairs**: name classification and pair discovery
//! - **split / merge**: per-vertex position field transforms
//! - **mirror**: mirror modifier application with shape key rebasing
//! - **linkage**: cross-mesh value drivers
//! - **commands / dispatch**: validation, batching and reporting

pub mod commands;
pub mod dispatch;
pub mod error;
pub mod linkage;
pub mod merge;
pub mod mesh;
pub mod mirror;
pub mod names;
pub mod pairs;
pub mod partition;
pub mod progress;
pub mod scene;
pub mod split;

pub use commands::{Selection, ShapeKeyTools};
pub use error::{ErrorKind, ShapeKeyError, ShapeKeyResult};
pub use linkage::LinkStats;
pub use merge::{merge_pair, merge_positions};
pub use mesh::{Blendshape, BlendshapeId, Linkage, Mesh, MirrorModifier, SymmetryModifier};
pub use mirror::{apply_mirror_with_shape_keys, MirrorOutcome};
pub use names::{AliasTable, NameResolver, PairNames, Role};
pub use pairs::{collect_pairs, find_counterpart, NamePair, PairSet};
pub use partition::{Partition, Side, TieBreak};
pub use progress::Progress;
pub use scene::{ObjectData, ObjectId, Scene, SceneObject};
pub use split::{split_for_batch, split_positions, split_shape_key, SplitKeys};

pub use payu_config::{Axis, ShapeKeyConfig};
pub use payu_ipc::{BatchCounts, CommandReport, Outcome, ProgressUpdate, ShapeKeyCommand};

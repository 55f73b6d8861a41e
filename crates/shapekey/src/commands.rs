//! Host-triggered shape key commands.
//!
//! Each command validates the selection, runs to completion, and reports a
//! [`CommandReport`]. Validation and state errors cancel the command without
//! touching the scene; anything unexpected is reported as an error after the
//! mesh has been restored. Batch commands never stop on a single item: they
//! count it as skipped or failed and move on.

use payu_config::ShapeKeyConfig;
use payu_ipc::{BatchCounts, CommandReport, ProgressUpdate};

use crate::error::{push_reason, ErrorKind, ShapeKeyError, ShapeKeyResult};
use crate::linkage::{self, LinkStats};
use crate::merge::merge_pair;
use crate::mesh::{BlendshapeId, Mesh};
use crate::mirror::{apply_mirror_with_shape_keys, MirrorOutcome};
use crate::names::NameResolver;
use crate::pairs::{collect_pairs, find_counterpart, NamePair};
use crate::partition::Partition;
use crate::progress::Progress;
use crate::scene::{ObjectId, Scene};
use crate::split::{split_for_batch, split_shape_key};

/// What the host has selected: the active object and its active shape key
/// (as an index into the ordered key list).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub object: Option<ObjectId>,
    pub key: Option<usize>,
}

impl Selection {
    pub fn new(object: ObjectId, key: usize) -> Self {
        Self {
            object: Some(object),
            key: Some(key),
        }
    }

    pub fn object(object: ObjectId) -> Self {
        Self {
            object: Some(object),
            key: None,
        }
    }
}

/// Turn a command result into a report, logging failures.
fn finish(command: &str, result: ShapeKeyResult<CommandReport>) -> CommandReport {
    match result {
        Ok(report) => {
            tracing::info!("{}: {}", command, report.status);
            report
        }
        Err(e) => match e.kind() {
            ErrorKind::Validation | ErrorKind::State => {
                tracing::warn!("{} cancelled: {}", command, e);
                CommandReport::cancelled(e.to_string())
            }
            ErrorKind::Unexpected => {
                tracing::error!("{} failed: {}", command, e);
                CommandReport::error(format!("An error occurred: {e}"))
            }
        },
    }
}

/// The selected object's mesh, validated to carry shape keys.
fn selected_mesh(scene: &mut Scene, object: Option<ObjectId>) -> ShapeKeyResult<&mut Mesh> {
    scene.shape_key_mesh(object)?;
    object
        .and_then(|id| scene.mesh_mut(id))
        .ok_or(ShapeKeyError::NoActiveObject)
}

fn selected_key(mesh: &Mesh, key: Option<usize>) -> ShapeKeyResult<BlendshapeId> {
    key.and_then(|index| mesh.id_at(index))
        .ok_or(ShapeKeyError::NoSelection)
}

fn mirror_note(outcome: Option<MirrorOutcome>) -> &'static str {
    match outcome {
        Some(outcome) if outcome.is_degraded() => {
            "Applied mirror modifier (seam vertices merged); "
        }
        Some(_) => "Applied mirror modifier; ",
        None => "",
    }
}

/// Shape key tools bound to one configuration.
#[derive(Debug, Clone)]
pub struct ShapeKeyTools {
    config: ShapeKeyConfig,
    resolver: NameResolver<'static>,
    suffix_partition: Partition,
    alias_partition: Partition,
}

impl Default for ShapeKeyTools {
    fn default() -> Self {
        let config = ShapeKeyConfig::default();
        Self {
            suffix_partition: Partition::suffix(&config),
            alias_partition: Partition::alias(&config),
            resolver: NameResolver::mmd(),
            config,
        }
    }
}

impl ShapeKeyTools {
    pub fn new(config: ShapeKeyConfig) -> ShapeKeyResult<Self> {
        let resolver = NameResolver::from_config(&config)?;
        Ok(Self {
            suffix_partition: Partition::suffix(&config),
            alias_partition: Partition::alias(&config),
            resolver,
            config,
        })
    }

    pub fn config(&self) -> &ShapeKeyConfig {
        &self.config
    }

    pub fn resolver(&self) -> &NameResolver<'static> {
        &self.resolver
    }

    fn partition_for(&self, pair: &NamePair) -> &Partition {
        if pair.alias {
            &self.alias_partition
        } else {
            &self.suffix_partition
        }
    }

    /// Split the selected key into left/right halves.
    ///
    /// A pending mirror modifier is applied first.
    pub fn split_active(&self, scene: &mut Scene, selection: Selection) -> CommandReport {
        finish("split_active", self.try_split_active(scene, selection))
    }

    fn try_split_active(
        &self,
        scene: &mut Scene,
        selection: Selection,
    ) -> ShapeKeyResult<CommandReport> {
        let mesh = selected_mesh(scene, selection.object)?;
        let id = selected_key(mesh, selection.key)?;
        if mesh.is_reference(id) {
            return Err(ShapeKeyError::BaseNotSplittable);
        }
        let index = mesh.index_of(id).ok_or(ShapeKeyError::StaleHandle)?;

        let mirrored = apply_mirror_with_shape_keys(mesh)?;
        // Handles do not survive a rebase; the index does
        let id = mesh.id_at(index).ok_or(ShapeKeyError::StaleHandle)?;
        let source = mesh.key(id)?.name.clone();
        let keys = split_shape_key(mesh, id, &self.resolver, &self.suffix_partition)?;

        Ok(CommandReport::completed(format!(
            "{}Split '{}' into '{}' and '{}'",
            mirror_note(mirrored),
            source,
            mesh.key(keys.left)?.name,
            mesh.key(keys.right)?.name
        )))
    }

    /// Split every non-Basis key that has not been split yet.
    pub fn split_all(
        &self,
        scene: &mut Scene,
        selection: Selection,
        progress: &mut dyn FnMut(ProgressUpdate),
    ) -> CommandReport {
        finish("split_all", self.try_split_all(scene, selection, progress))
    }

    fn try_split_all(
        &self,
        scene: &mut Scene,
        selection: Selection,
        progress: &mut dyn FnMut(ProgressUpdate),
    ) -> ShapeKeyResult<CommandReport> {
        let mesh = selected_mesh(scene, selection.object)?;
        let mirrored = apply_mirror_with_shape_keys(mesh)?;

        let ids: Vec<BlendshapeId> = mesh.ids().into_iter().skip(1).collect();
        if ids.is_empty() {
            return Ok(CommandReport::cancelled("No shape keys to process"));
        }

        let mut counts = BatchCounts::default();
        let mut reasons = Vec::new();
        let mut created = 0;
        let mut progress = Progress::begin(progress, ids.len());
        for id in ids {
            match split_for_batch(
                mesh,
                id,
                &self.resolver,
                &self.suffix_partition,
                &self.alias_partition,
            ) {
                Ok(names) => {
                    counts.succeeded += 1;
                    created += names.len();
                }
                Err(e) if e.kind() == ErrorKind::Unexpected => {
                    tracing::warn!("split_all: {}", e);
                    counts.failed += 1;
                    push_reason(&mut reasons, e.to_string());
                }
                Err(e) => {
                    tracing::debug!("split_all: skipped: {}", e);
                    counts.skipped += 1;
                    push_reason(&mut reasons, e.to_string());
                }
            }
            progress.step();
        }
        drop(progress);

        let note = mirror_note(mirrored);
        let report = if counts.succeeded > 0 {
            let mut status = format!(
                "{note}Split {} shape keys ({} created)",
                counts.succeeded, created
            );
            if counts.failed > 0 {
                status.push_str(&format!(", {} failed", counts.failed));
            }
            CommandReport::completed(status)
        } else if counts.skipped == counts.total() {
            CommandReport::cancelled(format!(
                "{note}All {} shape keys are already processed",
                counts.skipped
            ))
        } else {
            CommandReport::cancelled(format!("{note}No shape keys could be split"))
        };
        Ok(report.with_counts(counts).with_reasons(reasons))
    }

    /// Merge the selected key with its counterpart.
    pub fn merge_active(&self, scene: &mut Scene, selection: Selection) -> CommandReport {
        finish("merge_active", self.try_merge_active(scene, selection))
    }

    fn try_merge_active(
        &self,
        scene: &mut Scene,
        selection: Selection,
    ) -> ShapeKeyResult<CommandReport> {
        let mesh = selected_mesh(scene, selection.object)?;
        let id = selected_key(mesh, selection.key)?;
        let Some(pair) = find_counterpart(mesh, &self.resolver, id) else {
            let name = mesh.key(id)?.name.clone();
            return Err(ShapeKeyError::NoCounterpart(name));
        };

        let merged = merge_pair(mesh, &pair, self.partition_for(&pair))?;
        let name = mesh.key(merged)?.name.clone();
        Ok(CommandReport::completed(format!("Merged shape keys into '{name}'"))
            .with_active_key(name))
    }

    /// Merge every left/right pair on the mesh.
    pub fn merge_all(
        &self,
        scene: &mut Scene,
        selection: Selection,
        progress: &mut dyn FnMut(ProgressUpdate),
    ) -> CommandReport {
        finish("merge_all", self.try_merge_all(scene, selection, progress))
    }

    fn try_merge_all(
        &self,
        scene: &mut Scene,
        selection: Selection,
        progress: &mut dyn FnMut(ProgressUpdate),
    ) -> ShapeKeyResult<CommandReport> {
        let mesh = selected_mesh(scene, selection.object)?;
        let pairs = collect_pairs(mesh, &self.resolver);
        if pairs.is_empty() {
            return Ok(CommandReport::cancelled("No left/right pairs to merge"));
        }

        let mut counts = BatchCounts::default();
        let mut reasons = Vec::new();
        let mut progress = Progress::begin(progress, pairs.len());
        for pair in &pairs.pairs {
            match merge_pair(mesh, pair, self.partition_for(pair)) {
                Ok(_) => counts.succeeded += 1,
                Err(e) => {
                    tracing::warn!("merge_all: '{}': {}", pair.merged_name, e);
                    counts.failed += 1;
                    push_reason(&mut reasons, e.to_string());
                }
            }
            progress.step();
        }
        drop(progress);

        let report = if counts.succeeded > 0 {
            let mut status = format!("Merged {} pairs", counts.succeeded);
            if counts.failed > 0 {
                status.push_str(&format!(" ({} failed)", counts.failed));
            }
            CommandReport::completed(status)
        } else {
            CommandReport::cancelled("Failed to merge shape keys")
        };
        Ok(report.with_counts(counts).with_reasons(reasons))
    }

    /// Rename `X左`/`X右` to the MMD half names when `X` is an alias key.
    pub fn rename_for_mmd(&self, scene: &mut Scene, selection: Selection) -> CommandReport {
        finish("rename_for_mmd", self.try_rename_for_mmd(scene, selection))
    }

    fn try_rename_for_mmd(
        &self,
        scene: &mut Scene,
        selection: Selection,
    ) -> ShapeKeyResult<CommandReport> {
        let mesh = selected_mesh(scene, selection.object)?;
        let mut renamed = 0;
        for id in mesh.ids() {
            let Some(target) = self.resolver.mmd_rename(&mesh.key(id)?.name) else {
                continue;
            };
            let assigned = mesh.rename(id, &target)?;
            tracing::debug!("Renamed shape key to '{}'", assigned);
            renamed += 1;
        }

        if renamed > 0 {
            Ok(CommandReport::completed(format!("Renamed {renamed} shape keys"))
                .with_counts(BatchCounts {
                    succeeded: renamed,
                    ..Default::default()
                }))
        } else {
            Ok(CommandReport::cancelled("No shape keys to rename"))
        }
    }

    /// Link same-named keys on every other mesh to the selected key.
    pub fn add_linkages(
        &self,
        scene: &mut Scene,
        selection: Selection,
        progress: &mut dyn FnMut(ProgressUpdate),
    ) -> CommandReport {
        finish("add_linkages", self.try_add_linkages(scene, selection, progress))
    }

    fn try_add_linkages(
        &self,
        scene: &mut Scene,
        selection: Selection,
        progress: &mut dyn FnMut(ProgressUpdate),
    ) -> ShapeKeyResult<CommandReport> {
        let mesh = selected_mesh(scene, selection.object)?;
        let id = selected_key(mesh, selection.key)?;
        if mesh.is_reference(id) {
            return Err(ShapeKeyError::BaseNotLinkable);
        }
        let key = mesh.key(id)?.name.clone();
        let source = selection.object.ok_or(ShapeKeyError::NoActiveObject)?;

        let targets = linkage::link_targets(scene, source);
        if targets.is_empty() {
            return Ok(CommandReport::cancelled("No other objects with shape keys found"));
        }

        let mut stats = LinkStats::default();
        let mut progress = Progress::begin(progress, targets.len());
        for target in targets {
            let result = linkage::link_one(scene, source, &key, target);
            if let Err(e) = &result {
                tracing::warn!("add_linkages: {}", e);
            }
            stats.record(result);
            progress.step();
        }
        drop(progress);

        let counts = BatchCounts {
            succeeded: stats.linked,
            skipped: stats.missing,
            failed: stats.failed,
        };
        let report = if stats.linked > 0 {
            let mut status = format!("Added {} linkages for '{key}'", stats.linked);
            if stats.failed > 0 {
                status.push_str(&format!(" ({} failed)", stats.failed));
            }
            CommandReport::completed(status)
        } else {
            CommandReport::cancelled("No linkable shape keys found")
        };
        Ok(report.with_counts(counts).with_reasons(stats.reasons))
    }

    /// Link every non-Basis key of the selected mesh.
    pub fn add_all_linkages(
        &self,
        scene: &mut Scene,
        selection: Selection,
        progress: &mut dyn FnMut(ProgressUpdate),
    ) -> CommandReport {
        finish("add_all_linkages", self.try_add_all_linkages(scene, selection, progress))
    }

    fn try_add_all_linkages(
        &self,
        scene: &mut Scene,
        selection: Selection,
        progress: &mut dyn FnMut(ProgressUpdate),
    ) -> ShapeKeyResult<CommandReport> {
        let mesh = selected_mesh(scene, selection.object)?;
        let keys: Vec<String> = mesh
            .iter()
            .skip(1)
            .map(|(_, key)| key.name.clone())
            .collect();
        if keys.is_empty() {
            return Ok(CommandReport::cancelled("No shape keys to process"));
        }
        let source = selection.object.ok_or(ShapeKeyError::NoActiveObject)?;
        let targets = linkage::link_targets(scene, source);
        if targets.is_empty() {
            return Ok(CommandReport::cancelled("No other objects with shape keys found"));
        }

        let mut stats = LinkStats::default();
        let mut linked_keys = 0;
        let mut progress = Progress::begin(progress, keys.len());
        for key in &keys {
            let key_stats = linkage::link(scene, source, key, &targets);
            if key_stats.linked > 0 {
                linked_keys += 1;
            }
            stats.absorb(key_stats);
            progress.step();
        }
        drop(progress);

        let counts = BatchCounts {
            succeeded: stats.linked,
            skipped: stats.missing,
            failed: stats.failed,
        };
        let report = if stats.linked > 0 {
            let mut status = format!(
                "Added {} linkages across {} shape keys",
                stats.linked, linked_keys
            );
            if stats.failed > 0 {
                status.push_str(&format!(" ({} failed)", stats.failed));
            }
            CommandReport::completed(status)
        } else {
            CommandReport::cancelled("No linkages could be added")
        };
        Ok(report.with_counts(counts).with_reasons(stats.reasons))
    }

    /// Remove linkages from keys named like the selected one on other meshes.
    pub fn remove_linkages(&self, scene: &mut Scene, selection: Selection) -> CommandReport {
        finish("remove_linkages", self.try_remove_linkages(scene, selection))
    }

    fn try_remove_linkages(
        &self,
        scene: &mut Scene,
        selection: Selection,
    ) -> ShapeKeyResult<CommandReport> {
        let mesh = selected_mesh(scene, selection.object)?;
        let id = selected_key(mesh, selection.key)?;
        let key = mesh.key(id)?.name.clone();
        let source = selection.object.ok_or(ShapeKeyError::NoActiveObject)?;

        let removed = linkage::unlink(scene, &key, source);
        if removed > 0 {
            Ok(CommandReport::completed(format!("Removed {removed} linkages for '{key}'")))
        } else {
            Ok(CommandReport::cancelled("No linkages to remove"))
        }
    }
}

//! Merging a left/right pair back into one shape key.

use glam::Vec3;

use crate::error::{ShapeKeyError, ShapeKeyResult};
use crate::mesh::{BlendshapeId, Mesh};
use crate::pairs::NamePair;
use crate::partition::{Partition, Side};

/// Take each vertex from the half that owns it.
pub fn merge_positions(
    left: &[Vec3],
    right: &[Vec3],
    base: &[Vec3],
    partition: &Partition,
) -> ShapeKeyResult<Vec<Vec3>> {
    for half in [left, right] {
        if half.len() != base.len() {
            return Err(ShapeKeyError::LengthMismatch {
                expected: base.len(),
                actual: half.len(),
            });
        }
    }

    Ok(partition
        .sides(base)
        .enumerate()
        .map(|(i, side)| match side {
            Side::Left => left[i],
            Side::Right => right[i],
        })
        .collect())
}

/// Merge a pair into `pair.merged_name` and remove both halves.
///
/// When a key with the merged name already exists the halves are removed
/// and the existing key is returned unchanged. The new key takes its value
/// from the left half.
pub fn merge_pair(
    mesh: &mut Mesh,
    pair: &NamePair,
    partition: &Partition,
) -> ShapeKeyResult<BlendshapeId> {
    let left = mesh.key(pair.left)?;
    let right = mesh.key(pair.right)?;

    if let Some(existing) = mesh.find(&pair.merged_name) {
        tracing::debug!(
            "'{}' already exists; removing '{}' and '{}'",
            pair.merged_name,
            left.name,
            right.name
        );
        mesh.remove_shape_key(pair.left)?;
        mesh.remove_shape_key(pair.right)?;
        return Ok(existing);
    }

    let value = left.value;
    let positions = merge_positions(
        &left.positions,
        &right.positions,
        mesh.basis_positions(),
        partition,
    )?;

    let merged = mesh.add_shape_key(&pair.merged_name);
    mesh.set_positions(merged, positions)?;
    mesh.set_value(merged, value)?;
    mesh.remove_shape_key(pair.right)?;
    mesh.remove_shape_key(pair.left)?;
    tracing::debug!("Merged pair into '{}'", pair.merged_name);
    Ok(merged)
}

//! Splitting a shape key into left and right halves.
//!
//! Both halves start as copies of the source key. For every vertex, the half
//! that does not own it (per [`Partition`]) is reset to the Basis, so each
//! vertex keeps its deformation in exactly one half.

use glam::Vec3;

use crate::error::{ShapeKeyError, ShapeKeyResult};
use crate::mesh::{BlendshapeId, Mesh};
use crate::names::{NameResolver, Role};
use crate::partition::{Partition, Side};

/// Handles of the two keys created by a single-key split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitKeys {
    pub left: BlendshapeId,
    pub right: BlendshapeId,
}

/// Left and right position fields for `active` over `base`.
pub fn split_positions(
    active: &[Vec3],
    base: &[Vec3],
    partition: &Partition,
) -> ShapeKeyResult<(Vec<Vec3>, Vec<Vec3>)> {
    if active.len() != base.len() {
        return Err(ShapeKeyError::LengthMismatch {
            expected: base.len(),
            actual: active.len(),
        });
    }

    let mut left = active.to_vec();
    let mut right = active.to_vec();
    for (i, side) in partition.sides(base).enumerate() {
        match side {
            Side::Right => left[i] = base[i],
            Side::Left => right[i] = base[i],
        }
    }
    Ok((left, right))
}

/// Add a new key at `positions` with value 0.
fn add_half(mesh: &mut Mesh, name: &str, positions: Vec<Vec3>) -> ShapeKeyResult<BlendshapeId> {
    let id = mesh.add_shape_key(name);
    if let Err(e) = mesh.set_positions(id, positions) {
        mesh.remove_shape_key(id)?;
        return Err(e);
    }
    Ok(id)
}

/// Split one key into `base左` and `base右`.
///
/// The base name is the key name with every trailing marker stripped, so an
/// already one-sided key is split again; taken names are deduplicated by the
/// mesh (`Smile左` splits into `Smile左.001` and `Smile右`). The source key is
/// left untouched.
pub fn split_shape_key(
    mesh: &mut Mesh,
    id: BlendshapeId,
    resolver: &NameResolver<'_>,
    partition: &Partition,
) -> ShapeKeyResult<SplitKeys> {
    if mesh.is_reference(id) {
        return Err(ShapeKeyError::BaseNotSplittable);
    }
    let key = mesh.key(id)?;
    let base_name = resolver.strip_markers(&key.name).to_string();
    let (left, right) = split_positions(&key.positions, mesh.basis_positions(), partition)?;

    let left = add_half(mesh, &resolver.left_name(&base_name), left)?;
    let right = add_half(mesh, &resolver.right_name(&base_name), right)?;
    tracing::debug!(
        "Split '{}' into '{}' / '{}'",
        base_name,
        mesh.key(left)?.name,
        mesh.key(right)?.name
    );
    Ok(SplitKeys { left, right })
}

/// Split one key as part of a whole-mesh batch.
///
/// Stricter than [`split_shape_key`]: suffixed keys and alias halves are
/// refused, an alias canonical key produces its alias half names with the
/// alias partition, and a plain key only gets the halves it is missing.
/// Returns the names created, in left/right order.
pub fn split_for_batch(
    mesh: &mut Mesh,
    id: BlendshapeId,
    resolver: &NameResolver<'_>,
    suffix_partition: &Partition,
    alias_partition: &Partition,
) -> ShapeKeyResult<Vec<String>> {
    if mesh.is_reference(id) {
        return Err(ShapeKeyError::BaseNotSplittable);
    }
    let name = mesh.key(id)?.name.clone();
    if resolver.is_suffixed(&name) {
        return Err(ShapeKeyError::AlreadySplit(name));
    }

    let (left_name, right_name, partition, create_left, create_right) =
        match resolver.classify(&name) {
            Role::AliasLeft(_) | Role::AliasRight(_) => {
                return Err(ShapeKeyError::AliasMember(name));
            }
            Role::AliasCanonical(left, right) => {
                let suffixed_left = resolver.left_name(&name);
                let suffixed_right = resolver.right_name(&name);
                if mesh.contains(&suffixed_left) && mesh.contains(&suffixed_right) {
                    return Err(ShapeKeyError::AlreadyExists {
                        left: suffixed_left,
                        right: suffixed_right,
                    });
                }
                if mesh.contains(&left) && mesh.contains(&right) {
                    return Err(ShapeKeyError::AlreadyExists { left, right });
                }
                (left, right, alias_partition, true, true)
            }
            _ => {
                let left = resolver.left_name(&name);
                let right = resolver.right_name(&name);
                let (has_left, has_right) = (mesh.contains(&left), mesh.contains(&right));
                if has_left && has_right {
                    return Err(ShapeKeyError::AlreadyExists { left, right });
                }
                (left, right, suffix_partition, !has_left, !has_right)
            }
        };

    let key = mesh.key(id)?;
    let (left, right) = split_positions(&key.positions, mesh.basis_positions(), partition)?;

    let mut created = Vec::with_capacity(2);
    if create_left {
        let id = add_half(mesh, &left_name, left)?;
        created.push(mesh.key(id)?.name.clone());
    }
    if create_right {
        let id = add_half(mesh, &right_name, right)?;
        created.push(mesh.key(id)?.name.clone());
    }
    tracing::debug!("Batch split '{}': created {:?}", name, created);
    Ok(created)
}

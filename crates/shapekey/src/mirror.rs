//! Baking a pending mirror modifier into a mesh that has shape keys.
//!
//! The modifier cannot run while shape keys exist, so every key is
//! snapshotted and removed, the modifier is applied to the bare geometry,
//! and the keys are rebuilt in the new vertex space. Vertices `[0, n0)` keep
//! their original deformation; each mirrored vertex `i + n0` receives the
//! delta of vertex `i` with the axis component negated.
//!
//! The whole sequence runs under [`RebaseGuard`]: if the modifier fails or
//! anything returns early, the original geometry, keys and modifier are put
//! back before control leaves this module.

use glam::Vec3;
use payu_config::Axis;

use crate::error::{ShapeKeyError, ShapeKeyResult};
use crate::mesh::{Blendshape, Mesh, SymmetryModifier};

/// Result of a mirror rebase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirrorOutcome {
    /// Vertex count before the first modifier (`n0`)
    pub original_vertices: usize,
    /// Vertex count after the last modifier (`n1`)
    pub mirrored_vertices: usize,
    /// Shape keys rebuilt, Basis included
    pub shape_keys: usize,
    /// Modifiers applied
    pub passes: usize,
    /// Some pass merged seam vertices
    pub welded: bool,
}

impl MirrorOutcome {
    /// A modifier merged seam vertices, so some mirrored vertices have no
    /// source and stayed at the Basis pose.
    pub fn is_degraded(&self) -> bool {
        self.welded
    }

    fn then(self, next: MirrorOutcome) -> Self {
        Self {
            original_vertices: self.original_vertices,
            mirrored_vertices: next.mirrored_vertices,
            shape_keys: next.shape_keys,
            passes: self.passes + next.passes,
            welded: self.welded || next.welded,
        }
    }
}

/// Re-express one shape key in the mirrored vertex space.
///
/// `old_base` and `shaped` are in the original space (`n0` vertices);
/// `new_base` is the mirrored Basis (`n1` vertices).
pub fn rebase_positions(
    shaped: &[Vec3],
    old_base: &[Vec3],
    new_base: &[Vec3],
    axis: Axis,
) -> ShapeKeyResult<Vec<Vec3>> {
    let n0 = old_base.len();
    let n1 = new_base.len();
    if shaped.len() != n0 {
        return Err(ShapeKeyError::LengthMismatch {
            expected: n0,
            actual: shaped.len(),
        });
    }

    let mut positions = new_base.to_vec();
    let kept = n0.min(n1);
    positions[..kept].copy_from_slice(&shaped[..kept]);

    let axis = axis.index();
    for i in 0..n0 {
        let mirrored = i + n0;
        if mirrored >= n1 {
            break;
        }
        let mut delta = shaped[i] - old_base[i];
        delta[axis] = -delta[axis];
        positions[mirrored] = new_base[mirrored] + delta;
    }
    Ok(positions)
}

/// Restores a mesh to its pre-rebase state unless committed.
struct RebaseGuard<'m> {
    mesh: &'m mut Mesh,
    vertices: Vec<Vec3>,
    keys: Vec<Blendshape>,
    modifier: Option<(usize, Box<dyn SymmetryModifier>)>,
    committed: bool,
}

impl RebaseGuard<'_> {
    fn commit(mut self, vertices: Vec<Vec3>, keys: Vec<Blendshape>) {
        self.mesh.rebuild(vertices, keys);
        self.mesh.tag_update();
        // Applied modifiers leave the stack
        self.modifier = None;
        self.committed = true;
    }
}

impl Drop for RebaseGuard<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        tracing::warn!(
            "Mirror rebase aborted; restoring {} shape keys",
            self.keys.len()
        );
        let vertices = std::mem::take(&mut self.vertices);
        let keys = std::mem::take(&mut self.keys);
        self.mesh.rebuild(vertices, keys);
        if let Some((index, modifier)) = self.modifier.take() {
            self.mesh.restore_modifier(index, modifier);
        }
    }
}

/// Apply every pending mirror modifier in stack order, carrying every shape
/// key over.
///
/// Returns `Ok(None)` when no enabled mirror modifier is pending. Existing
/// [`BlendshapeId`](crate::BlendshapeId) handles are invalidated either way
/// once a modifier was found; callers re-resolve keys by name or index.
///
/// Each modifier is its own guarded pass: when one fails, the mesh is left as
/// the previous passes produced it and the failing modifier stays on the
/// stack.
pub fn apply_mirror_with_shape_keys(mesh: &mut Mesh) -> ShapeKeyResult<Option<MirrorOutcome>> {
    let mut outcome: Option<MirrorOutcome> = None;
    while let Some(index) = mesh.pending_mirror() {
        let pass = apply_pass(mesh, index)?;
        outcome = Some(match outcome {
            Some(total) => total.then(pass),
            None => pass,
        });
    }
    Ok(outcome)
}

fn apply_pass(mesh: &mut Mesh, index: usize) -> ShapeKeyResult<MirrorOutcome> {
    let n0 = mesh.vertex_count();
    let vertices = mesh.vertices().to_vec();
    let keys = mesh.clear_shape_keys();
    let modifier = mesh.take_modifier(index);
    let axis = modifier.axis();
    tracing::info!(
        "Applying mirror modifier ({:?}) to {} vertices with {} shape keys",
        axis,
        n0,
        keys.len()
    );

    let guard = RebaseGuard {
        mesh,
        vertices,
        keys,
        modifier: Some((index, modifier)),
        committed: false,
    };

    let mirrored = match &guard.modifier {
        Some((_, modifier)) => modifier.apply(guard.mesh.vertices())?,
        None => return Err(ShapeKeyError::Modifier("modifier missing".to_string())),
    };
    let n1 = mirrored.len();
    if n1 < n0 * 2 {
        tracing::warn!(
            "Mirror produced {} vertices, expected {}; {} mirrored vertices stay neutral",
            n1,
            n0 * 2,
            (n0 * 2).saturating_sub(n1.max(n0))
        );
    }

    let mut rebuilt = Vec::with_capacity(guard.keys.len());
    if let Some((basis, others)) = guard.keys.split_first() {
        rebuilt.push(Blendshape {
            positions: mirrored.clone(),
            ..basis.clone()
        });
        for key in others {
            let positions = rebase_positions(&key.positions, &basis.positions, &mirrored, axis)?;
            rebuilt.push(Blendshape {
                positions,
                ..key.clone()
            });
        }
    }

    let outcome = MirrorOutcome {
        original_vertices: n0,
        mirrored_vertices: n1,
        shape_keys: rebuilt.len(),
        passes: 1,
        welded: n1 < n0 * 2,
    };
    guard.commit(mirrored, rebuilt);
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{Linkage, MirrorModifier};
    use crate::scene::ObjectId;

    #[derive(Debug)]
    struct FailingModifier;

    impl SymmetryModifier for FailingModifier {
        fn axis(&self) -> Axis {
            Axis::X
        }

        fn is_enabled(&self) -> bool {
            true
        }

        fn apply(&self, _vertices: &[Vec3]) -> ShapeKeyResult<Vec<Vec3>> {
            Err(ShapeKeyError::Modifier("apply failed".to_string()))
        }
    }

    /// Mirror that welds the seam: vertices on the plane are not duplicated.
    #[derive(Debug)]
    struct WeldingMirror;

    impl SymmetryModifier for WeldingMirror {
        fn axis(&self) -> Axis {
            Axis::X
        }

        fn is_enabled(&self) -> bool {
            true
        }

        fn apply(&self, vertices: &[Vec3]) -> ShapeKeyResult<Vec<Vec3>> {
            let mut out = vertices.to_vec();
            out.extend(
                vertices
                    .iter()
                    .filter(|v| v.x != 0.0)
                    .map(|v| Vec3::new(-v.x, v.y, v.z)),
            );
            Ok(out)
        }
    }

    fn half_face() -> Mesh {
        let mut mesh = Mesh::with_basis(
            "Basis",
            vec![Vec3::new(-1.0, 0.0, 0.0), Vec3::new(-2.0, 1.0, 0.0)],
        );
        let smile = mesh.add_shape_key("Smile");
        mesh.set_positions(smile, vec![Vec3::new(-1.5, 0.0, 1.0), Vec3::new(-2.0, 1.0, 0.0)])
            .unwrap();
        mesh.set_value(smile, 0.5).unwrap();
        mesh.get_mut(smile).unwrap().linkage = Some(Linkage {
            source_object: ObjectId(3),
            source_key: "Smile".to_string(),
        });
        mesh
    }

    #[test]
    fn test_mirror_reflects_deltas() {
        let mut mesh = half_face();
        mesh.add_modifier(MirrorModifier::new(Axis::X));

        let outcome = apply_mirror_with_shape_keys(&mut mesh).unwrap().unwrap();
        assert_eq!(outcome.original_vertices, 2);
        assert_eq!(outcome.mirrored_vertices, 4);
        assert!(!outcome.is_degraded());
        assert_eq!(mesh.modifier_count(), 0);

        assert_eq!(mesh.names(), vec!["Basis", "Smile"]);
        let smile = mesh.get(mesh.find("Smile").unwrap()).unwrap();
        assert_eq!(
            smile.positions,
            vec![
                Vec3::new(-1.5, 0.0, 1.0),
                Vec3::new(-2.0, 1.0, 0.0),
                Vec3::new(1.5, 0.0, 1.0),
                Vec3::new(2.0, 1.0, 0.0),
            ]
        );
        assert_eq!(smile.value, 0.5);
        assert!(smile.linkage.is_some());
    }

    #[test]
    fn test_every_key_matches_new_vertex_count() {
        let mut mesh = half_face();
        mesh.add_shape_key("Frown");
        mesh.add_modifier(MirrorModifier::new(Axis::X));
        apply_mirror_with_shape_keys(&mut mesh).unwrap();

        assert_eq!(mesh.vertex_count(), 4);
        for (_, key) in mesh.iter() {
            assert_eq!(key.positions.len(), mesh.vertex_count(), "{}", key.name);
        }
    }

    #[test]
    fn test_welded_seam_leaves_tail_neutral() {
        let mut mesh = Mesh::with_basis(
            "Basis",
            vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0)],
        );
        let smile = mesh.add_shape_key("Smile");
        mesh.set_positions(smile, vec![Vec3::new(0.0, 0.0, 1.0), Vec3::new(-1.0, 0.0, 1.0)])
            .unwrap();
        mesh.add_modifier(WeldingMirror);

        let outcome = apply_mirror_with_shape_keys(&mut mesh).unwrap().unwrap();
        assert_eq!(outcome.mirrored_vertices, 3);
        assert!(outcome.is_degraded());

        // Index 2 is the reflection of vertex 1 but receives vertex 0's delta
        let smile = mesh.get(mesh.find("Smile").unwrap()).unwrap();
        assert_eq!(smile.positions.len(), 3);
        assert_eq!(smile.positions[2], Vec3::new(1.0, 0.0, 1.0));
    }

    #[test]
    fn test_failed_modifier_restores_mesh() {
        let mut mesh = half_face();
        mesh.add_modifier(FailingModifier);
        let before: Vec<Blendshape> = mesh.iter().map(|(_, key)| key.clone()).collect();
        let vertices = mesh.vertices().to_vec();

        let result = apply_mirror_with_shape_keys(&mut mesh);
        assert!(matches!(result, Err(ShapeKeyError::Modifier(_))));

        let after: Vec<Blendshape> = mesh.iter().map(|(_, key)| key.clone()).collect();
        assert_eq!(after, before);
        assert_eq!(mesh.vertices(), vertices.as_slice());
        assert_eq!(mesh.modifier_count(), 1);
    }

    #[test]
    fn test_every_pending_modifier_is_applied() {
        let mut mesh = half_face();
        mesh.add_modifier(MirrorModifier::new(Axis::X));
        mesh.add_modifier(MirrorModifier {
            axis: Axis::Y,
            enabled: false,
        });
        mesh.add_modifier(MirrorModifier::new(Axis::Y));

        let outcome = apply_mirror_with_shape_keys(&mut mesh).unwrap().unwrap();
        assert_eq!(outcome.passes, 2);
        assert_eq!(outcome.original_vertices, 2);
        assert_eq!(outcome.mirrored_vertices, 8);
        assert!(!outcome.is_degraded());
        assert_eq!(mesh.modifier_count(), 1);

        // Vertex 0 reflected across X, then that copy reflected across Y
        let smile = mesh.get(mesh.find("Smile").unwrap()).unwrap();
        assert_eq!(smile.positions.len(), 8);
        assert_eq!(smile.positions[6], Vec3::new(1.5, 0.0, 1.0));
        assert_eq!(smile.positions[7], Vec3::new(2.0, -1.0, 0.0));
    }

    #[test]
    fn test_failure_after_first_pass_keeps_first_pass() {
        let mut mesh = half_face();
        mesh.add_modifier(MirrorModifier::new(Axis::X));
        mesh.add_modifier(FailingModifier);

        let result = apply_mirror_with_shape_keys(&mut mesh);
        assert!(matches!(result, Err(ShapeKeyError::Modifier(_))));
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.modifier_count(), 1);
        for (_, key) in mesh.iter() {
            assert_eq!(key.positions.len(), 4, "{}", key.name);
        }
    }

    #[test]
    fn test_no_pending_mirror_is_noop() {
        let mut mesh = half_face();
        mesh.add_modifier(MirrorModifier {
            axis: Axis::X,
            enabled: false,
        });
        assert_eq!(apply_mirror_with_shape_keys(&mut mesh).unwrap(), None);
        assert_eq!(mesh.vertex_count(), 2);
        assert_eq!(mesh.modifier_count(), 1);
    }

    #[test]
    fn test_rebase_positions_on_other_axis() {
        let old_base = [Vec3::new(0.0, 0.0, -1.0)];
        let shaped = [Vec3::new(1.0, 0.0, -2.0)];
        let new_base = [Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, 0.0, 1.0)];
        let rebased = rebase_positions(&shaped, &old_base, &new_base, Axis::Z).unwrap();
        assert_eq!(rebased, vec![Vec3::new(1.0, 0.0, -2.0), Vec3::new(1.0, 0.0, 2.0)]);
    }
}

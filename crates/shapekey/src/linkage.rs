//! Cross-mesh value linkages (drivers).
//!
//! A linkage on a target key makes its value follow a same-named key on
//! another mesh. Installing one replaces any linkage already present;
//! removing one resets the target value to 0.

use crate::error::{push_reason, ShapeKeyError, ShapeKeyResult};
use crate::mesh::Linkage;
use crate::scene::{ObjectId, Scene};

/// Per-target tally of a link pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Linkages installed
    pub linked: usize,
    /// Targets without a same-named key
    pub missing: usize,
    /// Targets that could not be linked
    pub failed: usize,
    /// De-duplicated failure messages
    pub reasons: Vec<String>,
}

impl LinkStats {
    /// Count the result of one [`link_one`] call.
    pub fn record(&mut self, result: ShapeKeyResult<bool>) {
        match result {
            Ok(true) => self.linked += 1,
            Ok(false) => self.missing += 1,
            Err(e) => {
                self.failed += 1;
                push_reason(&mut self.reasons, e.to_string());
            }
        }
    }

    pub fn absorb(&mut self, other: LinkStats) {
        self.linked += other.linked;
        self.missing += other.missing;
        self.failed += other.failed;
        for reason in other.reasons {
            push_reason(&mut self.reasons, reason);
        }
    }
}

/// Every other mesh object that has shape keys.
pub fn link_targets(scene: &Scene, source: ObjectId) -> Vec<ObjectId> {
    scene
        .mesh_ids()
        .into_iter()
        .filter(|&id| id != source)
        .collect()
}

/// Whether following the linkage chain from `(object, key)` reaches `target`.
fn reaches(scene: &Scene, object: ObjectId, key: &str, target: ObjectId) -> bool {
    let mut current = (object, key.to_string());
    // Each hop moves to a distinct key, so the chain is bounded by the scene
    let limit: usize = scene
        .mesh_ids()
        .iter()
        .filter_map(|&id| scene.mesh(id))
        .map(|mesh| mesh.shape_key_count())
        .sum();
    for _ in 0..=limit {
        if current.0 == target && current.1 == key {
            return true;
        }
        let Some(linkage) = scene
            .mesh(current.0)
            .and_then(|mesh| mesh.get(mesh.find(&current.1)?))
            .and_then(|shape| shape.linkage.as_ref())
        else {
            return false;
        };
        current = (linkage.source_object, linkage.source_key.clone());
    }
    false
}

/// Link one target mesh's `key` to the same key on `source`.
///
/// Returns `Ok(false)` when the target has no key of that name.
pub fn link_one(
    scene: &mut Scene,
    source: ObjectId,
    key: &str,
    target: ObjectId,
) -> ShapeKeyResult<bool> {
    let source_mesh = scene
        .mesh(source)
        .ok_or_else(|| ShapeKeyError::NotAMesh(format!("{source:?}")))?;
    let source_id = source_mesh
        .find(key)
        .ok_or_else(|| ShapeKeyError::NotFound(key.to_string()))?;
    if source_mesh.is_reference(source_id) {
        return Err(ShapeKeyError::BaseNotLinkable);
    }
    if target == source || reaches(scene, source, key, target) {
        let target_name = scene.name(target).unwrap_or_default();
        return Err(ShapeKeyError::LinkageCycle(format!("{target_name}.{key}")));
    }

    let value = scene.evaluated_value(source, key).unwrap_or_default();
    let target_name = scene.name(target).unwrap_or_default().to_string();
    let mesh = scene
        .mesh_mut(target)
        .ok_or_else(|| ShapeKeyError::NotAMesh(target_name.clone()))?;
    let Some(id) = mesh.find(key) else {
        return Ok(false);
    };
    let shape = mesh.key_mut(id)?;
    if shape.linkage.take().is_some() {
        tracing::debug!("Replaced existing linkage on {}.{}", target_name, key);
    }
    shape.linkage = Some(Linkage {
        source_object: source,
        source_key: key.to_string(),
    });
    shape.value = value;
    Ok(true)
}

/// Link `key` on every target to the same key on `source`.
///
/// Per-target failures are logged and recorded; the pass continues.
pub fn link(scene: &mut Scene, source: ObjectId, key: &str, targets: &[ObjectId]) -> LinkStats {
    let mut stats = LinkStats::default();
    for &target in targets {
        let result = link_one(scene, source, key, target);
        if let Err(e) = &result {
            tracing::warn!("Failed to link {:?}.{}: {}", target, key, e);
        }
        stats.record(result);
    }
    stats
}

/// Remove linkages from same-named keys on every mesh except `exclude`.
///
/// Unlinked keys are reset to 0 and their meshes tagged for update. Returns
/// the number of linkages removed.
pub fn unlink(scene: &mut Scene, key: &str, exclude: ObjectId) -> usize {
    let mut removed = 0;
    for object in link_targets(scene, exclude) {
        let Some(mesh) = scene.mesh_mut(object) else {
            continue;
        };
        let Some(shape) = mesh.find(key).and_then(|id| mesh.get_mut(id)) else {
            continue;
        };
        if shape.linkage.take().is_none() {
            continue;
        }
        shape.value = 0.0;
        mesh.tag_update();
        removed += 1;
    }
    tracing::debug!("Removed {} linkages for '{}'", removed, key);
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;
    use crate::scene::ObjectData;
    use glam::Vec3;

    fn mesh_with(names: &[&str]) -> Mesh {
        let mut mesh = Mesh::with_basis("Basis", vec![Vec3::ZERO]);
        for name in names {
            mesh.add_shape_key(name);
        }
        mesh
    }

    fn set_value(scene: &mut Scene, object: ObjectId, key: &str, value: f32) {
        let mesh = scene.mesh_mut(object).unwrap();
        let id = mesh.find(key).unwrap();
        mesh.set_value(id, value).unwrap();
    }

    fn value(scene: &Scene, object: ObjectId, key: &str) -> f32 {
        let mesh = scene.mesh(object).unwrap();
        mesh.get(mesh.find(key).unwrap()).unwrap().value
    }

    #[test]
    fn test_linked_key_tracks_source() {
        let mut scene = Scene::new();
        let a = scene.add_mesh("A", mesh_with(&["Open"]));
        let b = scene.add_mesh("B", mesh_with(&["Open"]));
        set_value(&mut scene, a, "Open", 0.6);

        let targets = link_targets(&scene, a);
        assert_eq!(targets, vec![b]);
        let stats = link(&mut scene, a, "Open", &targets);
        assert_eq!(stats.linked, 1);
        assert_eq!(value(&scene, b, "Open"), 0.6);

        set_value(&mut scene, a, "Open", 0.2);
        scene.evaluate();
        assert_eq!(value(&scene, b, "Open"), 0.2);

        assert_eq!(unlink(&mut scene, "Open", a), 1);
        assert_eq!(value(&scene, b, "Open"), 0.0);
        set_value(&mut scene, a, "Open", 0.9);
        scene.evaluate();
        assert_eq!(value(&scene, b, "Open"), 0.0);
    }

    #[test]
    fn test_relink_replaces_existing() {
        let mut scene = Scene::new();
        let a = scene.add_mesh("A", mesh_with(&["Open"]));
        let b = scene.add_mesh("B", mesh_with(&["Open"]));
        let c = scene.add_mesh("C", mesh_with(&["Open"]));
        link(&mut scene, a, "Open", &[c]);
        link(&mut scene, b, "Open", &[c]);

        let mesh = scene.mesh(c).unwrap();
        let linkage = mesh.get(mesh.find("Open").unwrap()).unwrap().linkage.clone();
        assert_eq!(linkage.unwrap().source_object, b);
    }

    #[test]
    fn test_targets_without_key_are_missing() {
        let mut scene = Scene::new();
        let a = scene.add_mesh("A", mesh_with(&["Open"]));
        scene.add_mesh("B", mesh_with(&["Close"]));
        scene.add_object("Light", ObjectData::Other("light".to_string()));

        let targets = link_targets(&scene, a);
        let stats = link(&mut scene, a, "Open", &targets);
        assert_eq!(
            stats,
            LinkStats {
                linked: 0,
                missing: 1,
                failed: 0,
                reasons: Vec::new(),
            }
        );
    }

    #[test]
    fn test_cycle_is_refused() {
        let mut scene = Scene::new();
        let a = scene.add_mesh("A", mesh_with(&["Open"]));
        let b = scene.add_mesh("B", mesh_with(&["Open"]));
        link(&mut scene, a, "Open", &[b]);

        let result = link_one(&mut scene, b, "Open", a);
        assert!(matches!(result, Err(ShapeKeyError::LinkageCycle(_))));
        let stats = link(&mut scene, b, "Open", &[a]);
        assert_eq!(stats.failed, 1);
        assert_eq!(
            stats.reasons,
            vec!["Linking 'A.Open' would create a dependency cycle".to_string()]
        );
    }

    #[test]
    fn test_absorb_merges_reasons() {
        let mut total = LinkStats::default();
        let mut first = LinkStats::default();
        first.record(Ok(true));
        first.record(Err(ShapeKeyError::LinkageCycle("B.Open".to_string())));
        let mut second = LinkStats::default();
        second.record(Ok(false));
        second.record(Err(ShapeKeyError::LinkageCycle("B.Open".to_string())));
        total.absorb(first);
        total.absorb(second);

        assert_eq!((total.linked, total.missing, total.failed), (1, 1, 2));
        assert_eq!(total.reasons.len(), 1);
    }

    #[test]
    fn test_basis_is_not_linkable() {
        let mut scene = Scene::new();
        let a = scene.add_mesh("A", mesh_with(&[]));
        let b = scene.add_mesh("B", mesh_with(&[]));
        assert!(matches!(
            link_one(&mut scene, a, "Basis", b),
            Err(ShapeKeyError::BaseNotLinkable)
        ));
    }

    #[test]
    fn test_unlink_ignores_unlinked_keys() {
        let mut scene = Scene::new();
        let a = scene.add_mesh("A", mesh_with(&["Open"]));
        let b = scene.add_mesh("B", mesh_with(&["Open"]));
        set_value(&mut scene, b, "Open", 0.4);
        let revision = scene.mesh(b).unwrap().revision();

        assert_eq!(unlink(&mut scene, "Open", a), 0);
        assert_eq!(value(&scene, b, "Open"), 0.4);
        assert_eq!(scene.mesh(b).unwrap().revision(), revision);
    }
}

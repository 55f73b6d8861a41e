//! Mesh geometry and its ordered shape key list.
//!
//! Shape keys live in generation-tagged slots. A [`BlendshapeId`] taken
//! before a removal stops resolving once its slot is freed, even if the slot
//! is later reused, so a stale handle is a checked `None` rather than a
//! silent alias of some newer key.

use glam::Vec3;
use payu_config::Axis;

use crate::error::{ShapeKeyError, ShapeKeyResult};
use crate::scene::ObjectId;

/// Type-safe, generation-tagged shape key handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendshapeId {
    slot: u32,
    generation: u32,
}

/// Scalar linkage (driver) making a shape key's value follow another key.
#[derive(Debug, Clone, PartialEq)]
pub struct Linkage {
    /// Object owning the source shape key
    pub source_object: ObjectId,
    /// Name of the source shape key on that object
    pub source_key: String,
}

/// A named shape key.
///
/// `positions` are absolute vertex coordinates, one per mesh vertex. For the
/// Basis they are the neutral pose; for every other key they are the fully
/// applied pose, and the deformation is `positions[i] - basis[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Blendshape {
    pub name: String,
    /// Activation value, nominally 0.0..=1.0
    pub value: f32,
    pub positions: Vec<Vec3>,
    /// Driver installed on `value`, if any
    pub linkage: Option<Linkage>,
}

impl Blendshape {
    pub fn new(name: impl Into<String>, positions: Vec<Vec3>) -> Self {
        Self {
            name: name.into(),
            value: 0.0,
            positions,
            linkage: None,
        }
    }
}

/// Geometry operator that bakes a pending mirror into the mesh.
///
/// Implementations return the new vertex list. The result may hold fewer
/// than twice the input vertices when seam vertices are shared; callers read
/// the actual count instead of assuming exact doubling.
pub trait SymmetryModifier: std::fmt::Debug {
    /// Axis the geometry is mirrored across
    fn axis(&self) -> Axis;

    /// Whether the modifier is live (viewport-enabled)
    fn is_enabled(&self) -> bool;

    fn apply(&self, vertices: &[Vec3]) -> ShapeKeyResult<Vec<Vec3>>;
}

/// Mirror modifier appending the reflection of every vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MirrorModifier {
    pub axis: Axis,
    pub enabled: bool,
}

impl MirrorModifier {
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            enabled: true,
        }
    }
}

impl SymmetryModifier for MirrorModifier {
    fn axis(&self) -> Axis {
        self.axis
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn apply(&self, vertices: &[Vec3]) -> ShapeKeyResult<Vec<Vec3>> {
        let axis = self.axis.index();
        let mut mirrored = Vec::with_capacity(vertices.len() * 2);
        mirrored.extend_from_slice(vertices);
        mirrored.extend(vertices.iter().map(|&v| {
            let mut reflected = v;
            reflected[axis] = -reflected[axis];
            reflected
        }));
        Ok(mirrored)
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    entry: Option<Blendshape>,
}

/// A mesh: vertex geometry, shape keys in order, and its modifier stack.
///
/// The first shape key is the reference (Basis) key.
#[derive(Debug, Default)]
pub struct Mesh {
    vertices: Vec<Vec3>,
    slots: Vec<Slot>,
    free_slots: Vec<u32>,
    order: Vec<BlendshapeId>,
    modifiers: Vec<Box<dyn SymmetryModifier>>,
    revision: u64,
}

impl Mesh {
    /// Create a mesh without shape keys.
    pub fn new(vertices: Vec<Vec3>) -> Self {
        Self {
            vertices,
            ..Default::default()
        }
    }

    /// Create a mesh with a Basis key named `basis_name` at `vertices`.
    pub fn with_basis(basis_name: &str, vertices: Vec<Vec3>) -> Self {
        let mut mesh = Self::new(vertices);
        mesh.add_shape_key(basis_name);
        mesh
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn has_shape_keys(&self) -> bool {
        !self.order.is_empty()
    }

    pub fn shape_key_count(&self) -> usize {
        self.order.len()
    }

    /// Reference (Basis) key
    pub fn reference_key(&self) -> Option<BlendshapeId> {
        self.order.first().copied()
    }

    pub fn is_reference(&self, id: BlendshapeId) -> bool {
        self.reference_key() == Some(id)
    }

    /// Handles of all shape keys in order, collected up front so callers
    /// can mutate the mesh while walking them.
    pub fn ids(&self) -> Vec<BlendshapeId> {
        self.order.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlendshapeId, &Blendshape)> + '_ {
        self.order
            .iter()
            .filter_map(|&id| self.get(id).map(|key| (id, key)))
    }

    /// Names of all shape keys in order
    pub fn names(&self) -> Vec<&str> {
        self.iter().map(|(_, key)| key.name.as_str()).collect()
    }

    pub fn get(&self, id: BlendshapeId) -> Option<&Blendshape> {
        let slot = self.slots.get(id.slot as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    pub fn get_mut(&mut self, id: BlendshapeId) -> Option<&mut Blendshape> {
        let slot = self.slots.get_mut(id.slot as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_mut()
    }

    /// Like [`Mesh::get`], but a stale handle is an error.
    pub fn key(&self, id: BlendshapeId) -> ShapeKeyResult<&Blendshape> {
        self.get(id).ok_or(ShapeKeyError::StaleHandle)
    }

    pub fn key_mut(&mut self, id: BlendshapeId) -> ShapeKeyResult<&mut Blendshape> {
        self.get_mut(id).ok_or(ShapeKeyError::StaleHandle)
    }

    pub fn find(&self, name: &str) -> Option<BlendshapeId> {
        self.iter().find(|(_, key)| key.name == name).map(|(id, _)| id)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Position of a shape key in the ordered list
    pub fn index_of(&self, id: BlendshapeId) -> Option<usize> {
        self.order.iter().position(|&other| other == id)
    }

    pub fn id_at(&self, index: usize) -> Option<BlendshapeId> {
        self.order.get(index).copied()
    }

    /// Basis positions, or the raw geometry when there are no shape keys.
    pub fn basis_positions(&self) -> &[Vec3] {
        self.reference_key()
            .and_then(|id| self.get(id))
            .map(|key| key.positions.as_slice())
            .unwrap_or(self.vertices.as_slice())
    }

    /// Add a shape key.
    ///
    /// The first key added becomes the Basis and copies the mesh geometry;
    /// later keys start at the Basis pose. A name already in use gets a
    /// numeric suffix (`name.001`, `name.002`, ...).
    pub fn add_shape_key(&mut self, name: &str) -> BlendshapeId {
        let positions = self.basis_positions().to_vec();
        let name = self.unique_name(name, None);
        self.insert(Blendshape::new(name, positions))
    }

    /// Remove a shape key, returning it.
    pub fn remove_shape_key(&mut self, id: BlendshapeId) -> ShapeKeyResult<Blendshape> {
        let index = self.index_of(id).ok_or(ShapeKeyError::StaleHandle)?;
        if index == 0 {
            self.sync_vertices_from_basis();
        }
        self.order.remove(index);
        let slot = &mut self.slots[id.slot as usize];
        let entry = slot.entry.take().ok_or(ShapeKeyError::StaleHandle)?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_slots.push(id.slot);
        Ok(entry)
    }

    /// Remove every shape key, returning them in order.
    ///
    /// The Basis pose is written back into the mesh geometry first, so the
    /// mesh keeps its neutral shape.
    pub fn clear_shape_keys(&mut self) -> Vec<Blendshape> {
        self.sync_vertices_from_basis();
        let ids = std::mem::take(&mut self.order);
        ids.into_iter()
            .filter_map(|id| {
                let slot = &mut self.slots[id.slot as usize];
                let entry = slot.entry.take()?;
                slot.generation = slot.generation.wrapping_add(1);
                self.free_slots.push(id.slot);
                Some(entry)
            })
            .collect()
    }

    /// Rename a shape key in place, keeping names unique.
    ///
    /// Returns the name actually assigned.
    pub fn rename(&mut self, id: BlendshapeId, name: &str) -> ShapeKeyResult<String> {
        self.key(id)?;
        let name = self.unique_name(name, Some(id));
        self.key_mut(id)?.name = name.clone();
        Ok(name)
    }

    /// Replace a key's positions; the length must match the vertex count.
    pub fn set_positions(&mut self, id: BlendshapeId, positions: Vec<Vec3>) -> ShapeKeyResult<()> {
        let expected = self.vertex_count();
        if positions.len() != expected {
            return Err(ShapeKeyError::LengthMismatch {
                expected,
                actual: positions.len(),
            });
        }
        self.key_mut(id)?.positions = positions;
        Ok(())
    }

    pub fn set_value(&mut self, id: BlendshapeId, value: f32) -> ShapeKeyResult<()> {
        self.key_mut(id)?.value = value;
        Ok(())
    }

    pub fn add_modifier(&mut self, modifier: impl SymmetryModifier + 'static) {
        self.modifiers.push(Box::new(modifier));
    }

    pub fn modifier_count(&self) -> usize {
        self.modifiers.len()
    }

    /// Index of the first enabled symmetry modifier waiting to be applied
    pub fn pending_mirror(&self) -> Option<usize> {
        self.modifiers.iter().position(|modifier| modifier.is_enabled())
    }

    /// Notify the host that the mesh needs re-evaluation and redraw.
    pub fn tag_update(&mut self) {
        self.revision += 1;
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn take_modifier(&mut self, index: usize) -> Box<dyn SymmetryModifier> {
        self.modifiers.remove(index)
    }

    pub(crate) fn restore_modifier(&mut self, index: usize, modifier: Box<dyn SymmetryModifier>) {
        let index = index.min(self.modifiers.len());
        self.modifiers.insert(index, modifier);
    }

    /// Replace geometry and shape keys wholesale. Keys are appended in order.
    pub(crate) fn rebuild(&mut self, vertices: Vec<Vec3>, keys: Vec<Blendshape>) {
        self.clear_shape_keys();
        self.vertices = vertices;
        for key in keys {
            self.insert(key);
        }
    }

    fn insert(&mut self, entry: Blendshape) -> BlendshapeId {
        let id = match self.free_slots.pop() {
            Some(slot) => {
                let slot_ref = &mut self.slots[slot as usize];
                slot_ref.entry = Some(entry);
                BlendshapeId {
                    slot,
                    generation: slot_ref.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                BlendshapeId {
                    slot: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        };
        self.order.push(id);
        id
    }

    fn sync_vertices_from_basis(&mut self) {
        let positions = match self.reference_key().and_then(|id| self.get(id)) {
            Some(basis) if basis.positions.len() == self.vertices.len() => basis.positions.clone(),
            _ => return,
        };
        self.vertices = positions;
    }

    fn unique_name(&self, name: &str, ignore: Option<BlendshapeId>) -> String {
        let taken = |candidate: &str| {
            self.iter()
                .any(|(id, key)| Some(id) != ignore && key.name == candidate)
        };
        if !taken(name) {
            return name.to_string();
        }
        (1..)
            .map(|n| format!("{name}.{n:03}"))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| name.to_string())
    }
}

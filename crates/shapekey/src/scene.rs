//! In-memory scene: named objects, some of which are meshes.

use std::collections::HashSet;

use crate::error::{ShapeKeyError, ShapeKeyResult};
use crate::mesh::Mesh;

/// Index of an object in its scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

/// Object payload. Only meshes carry shape keys.
#[derive(Debug)]
pub enum ObjectData {
    Mesh(Mesh),
    /// Any other object kind (camera, light, empty, ...)
    Other(String),
}

#[derive(Debug)]
pub struct SceneObject {
    pub name: String,
    pub data: ObjectData,
}

impl SceneObject {
    pub fn mesh(&self) -> Option<&Mesh> {
        match &self.data {
            ObjectData::Mesh(mesh) => Some(mesh),
            ObjectData::Other(_) => None,
        }
    }

    pub fn mesh_mut(&mut self) -> Option<&mut Mesh> {
        match &mut self.data {
            ObjectData::Mesh(mesh) => Some(mesh),
            ObjectData::Other(_) => None,
        }
    }
}

/// Ordered collection of scene objects.
#[derive(Debug, Default)]
pub struct Scene {
    objects: Vec<SceneObject>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mesh(&mut self, name: impl Into<String>, mesh: Mesh) -> ObjectId {
        self.add_object(name, ObjectData::Mesh(mesh))
    }

    pub fn add_object(&mut self, name: impl Into<String>, data: ObjectData) -> ObjectId {
        self.objects.push(SceneObject {
            name: name.into(),
            data,
        });
        ObjectId((self.objects.len() - 1) as u32)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id.0 as usize)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(id.0 as usize)
    }

    pub fn mesh(&self, id: ObjectId) -> Option<&Mesh> {
        self.object(id)?.mesh()
    }

    pub fn mesh_mut(&mut self, id: ObjectId) -> Option<&mut Mesh> {
        self.object_mut(id)?.mesh_mut()
    }

    /// Object by name
    pub fn find(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .position(|object| object.name == name)
            .map(|index| ObjectId(index as u32))
    }

    pub fn name(&self, id: ObjectId) -> Option<&str> {
        self.object(id).map(|object| object.name.as_str())
    }

    /// Mesh objects that carry shape keys, in scene order.
    pub fn mesh_ids(&self) -> Vec<ObjectId> {
        self.objects
            .iter()
            .enumerate()
            .filter(|(_, object)| object.mesh().is_some_and(Mesh::has_shape_keys))
            .map(|(index, _)| ObjectId(index as u32))
            .collect()
    }

    /// Validate that `id` names a mesh with shape keys.
    pub fn shape_key_mesh(&self, id: Option<ObjectId>) -> ShapeKeyResult<&Mesh> {
        let id = id.ok_or(ShapeKeyError::NoActiveObject)?;
        let object = self.object(id).ok_or(ShapeKeyError::NoActiveObject)?;
        let mesh = object
            .mesh()
            .ok_or_else(|| ShapeKeyError::NotAMesh(object.name.clone()))?;
        if !mesh.has_shape_keys() {
            return Err(ShapeKeyError::NoShapeKeys(object.name.clone()));
        }
        Ok(mesh)
    }

    /// Value a shape key takes once its linkage chain is resolved.
    ///
    /// A chain that revisits a key, or points at a missing source, stops and
    /// yields the last stored value.
    pub fn evaluated_value(&self, object: ObjectId, key: &str) -> Option<f32> {
        let mut visited = HashSet::new();
        let mut current = (object, key.to_string());
        loop {
            let mesh = self.mesh(current.0)?;
            let shape = mesh.get(mesh.find(&current.1)?)?;
            let Some(linkage) = &shape.linkage else {
                return Some(shape.value);
            };
            if !visited.insert(current.clone()) {
                tracing::warn!(
                    "Linkage cycle at '{}'.'{}'",
                    self.name(current.0).unwrap_or_default(),
                    current.1
                );
                return Some(shape.value);
            }
            let next = (linkage.source_object, linkage.source_key.clone());
            let source_exists = self
                .mesh(next.0)
                .is_some_and(|source| source.contains(&next.1));
            if !source_exists {
                return Some(shape.value);
            }
            current = next;
        }
    }

    /// Write every linked shape key's value from its source.
    ///
    /// Returns the number of keys evaluated.
    pub fn evaluate(&mut self) -> usize {
        let mut updates = Vec::new();
        for (index, object) in self.objects.iter().enumerate() {
            let Some(mesh) = object.mesh() else {
                continue;
            };
            let object_id = ObjectId(index as u32);
            for (id, key) in mesh.iter() {
                if key.linkage.is_none() {
                    continue;
                }
                if let Some(value) = self.evaluated_value(object_id, &key.name) {
                    updates.push((object_id, id, value));
                }
            }
        }

        let count = updates.len();
        for (object_id, id, value) in updates {
            if let Some(mesh) = self.mesh_mut(object_id) {
                if let Some(key) = mesh.get_mut(id) {
                    key.value = value;
                }
            }
        }
        count
    }
}

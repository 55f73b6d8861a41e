//! Left/right pair collection.

use std::collections::HashSet;

use crate::mesh::{BlendshapeId, Mesh};
use crate::names::{NameResolver, PairNames, Role};

/// A left/right pair found on a mesh.
///
/// Holds handles into the mesh; they stay valid until either key is removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePair {
    pub left: BlendshapeId,
    pub right: BlendshapeId,
    pub merged_name: String,
    /// Pair comes from the alias table (selects the alias partition)
    pub alias: bool,
}

/// Pairs discovered in one scan, plus every name they consumed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairSet {
    pub pairs: Vec<NamePair>,
    pub processed: HashSet<String>,
}

impl PairSet {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Role of a key on its mesh; the reference key is always `Base`.
pub fn classify_key(mesh: &Mesh, resolver: &NameResolver<'_>, id: BlendshapeId) -> Option<Role> {
    if mesh.is_reference(id) {
        return Some(Role::Base);
    }
    mesh.get(id).map(|key| resolver.classify(&key.name))
}

/// Resolve both halves of a pair on the mesh.
fn locate(mesh: &Mesh, names: PairNames) -> Option<NamePair> {
    let left = mesh.find(&names.left)?;
    let right = mesh.find(&names.right)?;
    Some(NamePair {
        left,
        right,
        merged_name: names.merged,
        alias: names.alias,
    })
}

/// Find the pair the given key belongs to, if its counterpart exists.
pub fn find_counterpart(
    mesh: &Mesh,
    resolver: &NameResolver<'_>,
    id: BlendshapeId,
) -> Option<NamePair> {
    if mesh.is_reference(id) {
        return None;
    }
    let key = mesh.get(id)?;
    locate(mesh, resolver.counterpart(&key.name)?)
}

/// Scan all non-Basis keys once, in mesh order, and pair them up.
///
/// A name is never considered again once it is part of a pair, so every key
/// appears in at most one pair.
pub fn collect_pairs(mesh: &Mesh, resolver: &NameResolver<'_>) -> PairSet {
    let mut set = PairSet::default();

    for (_, key) in mesh.iter().skip(1) {
        if set.processed.contains(&key.name) {
            continue;
        }

        let names = match resolver.classify(&key.name) {
            Role::AliasCanonical(left, right) => Some(PairNames {
                left,
                right,
                merged: key.name.clone(),
                alias: true,
            }),
            Role::AliasLeft(_)
            | Role::AliasRight(_)
            | Role::LeftSuffixed(_)
            | Role::RightSuffixed(_) => resolver.counterpart(&key.name),
            Role::Plain | Role::Base => None,
        };

        let Some(pair) = names.and_then(|names| locate(mesh, names)) else {
            continue;
        };
        // The located halves may already belong to an earlier pair
        let (Some(left), Some(right)) = (mesh.get(pair.left), mesh.get(pair.right)) else {
            continue;
        };
        if pair.left == pair.right
            || set.processed.contains(&left.name)
            || set.processed.contains(&right.name)
        {
            continue;
        }

        tracing::trace!(
            "collect_pairs: '{}' + '{}' -> '{}'",
            left.name,
            right.name,
            pair.merged_name
        );
        set.processed.insert(left.name.clone());
        set.processed.insert(right.name.clone());
        // A canonical alias key triggers the match without being a half
        set.processed.insert(key.name.clone());
        set.pairs.push(pair);
    }

    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn mesh_with(names: &[&str]) -> Mesh {
        let mut mesh = Mesh::with_basis(
            "Basis",
            vec![Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)],
        );
        for name in names {
            mesh.add_shape_key(name);
        }
        mesh
    }

    fn pair_names(mesh: &Mesh, set: &PairSet) -> Vec<(String, String, String)> {
        set.pairs
            .iter()
            .map(|pair| {
                (
                    mesh.get(pair.left).unwrap().name.clone(),
                    mesh.get(pair.right).unwrap().name.clone(),
                    pair.merged_name.clone(),
                )
            })
            .collect()
    }

    #[test]
    fn test_suffix_pairs_in_mesh_order() {
        let mesh = mesh_with(&["Brow右", "Smile左", "Smile", "Smile右", "Brow左"]);
        let set = collect_pairs(&mesh, &NameResolver::mmd());
        assert_eq!(
            pair_names(&mesh, &set),
            vec![
                ("Brow左".into(), "Brow右".into(), "Brow".into()),
                ("Smile左".into(), "Smile右".into(), "Smile".into()),
            ]
        );
        assert!(!set.processed.contains("Smile"));
    }

    #[test]
    fn test_alias_pairs() {
        let mesh = mesh_with(&["ｳｨﾝｸ2右", "ウィンク2", "ウィンク"]);
        let set = collect_pairs(&mesh, &NameResolver::mmd());
        assert_eq!(
            pair_names(&mesh, &set),
            vec![("ウィンク2".into(), "ｳｨﾝｸ2右".into(), "まばたき".into())]
        );
        assert!(set.pairs[0].alias);
    }

    #[test]
    fn test_canonical_key_pairs_generated_names() {
        let mesh = mesh_with(&["笑い", "ウィンク", "ウィンク右"]);
        let set = collect_pairs(&mesh, &NameResolver::mmd());
        assert_eq!(
            pair_names(&mesh, &set),
            vec![("ウィンク".into(), "ウィンク右".into(), "笑い".into())]
        );
        assert!(set.processed.contains("笑い"));
    }

    #[test]
    fn test_unpaired_keys_are_left_alone() {
        let mesh = mesh_with(&["Smile左", "Frown右", "ウィンク"]);
        let set = collect_pairs(&mesh, &NameResolver::mmd());
        assert!(set.is_empty());
        assert!(set.processed.is_empty());
    }

    #[test]
    fn test_pairing_is_idempotent() {
        let mesh = mesh_with(&["A左", "A右", "まばたき", "ウィンク2", "ｳｨﾝｸ2右", "B右", "B左"]);
        let resolver = NameResolver::mmd();
        let first = collect_pairs(&mesh, &resolver);
        let second = collect_pairs(&mesh, &resolver);
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_no_key_in_two_pairs() {
        // "笑い" and "ウィンク" both resolve to the same halves
        let mesh = mesh_with(&["Eye左", "Eye右", "笑い", "ウィンク", "ウィンク右", "Eye右.001"]);
        let set = collect_pairs(&mesh, &NameResolver::mmd());

        let mut seen = HashSet::new();
        for pair in &set.pairs {
            assert!(seen.insert(pair.left));
            assert!(seen.insert(pair.right));
        }
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_find_counterpart() {
        let mesh = mesh_with(&["Smile左", "Smile右", "Frown左"]);
        let resolver = NameResolver::mmd();
        let right = mesh.find("Smile右").unwrap();
        let pair = find_counterpart(&mesh, &resolver, right).unwrap();
        assert_eq!(pair.left, mesh.find("Smile左").unwrap());
        assert_eq!(pair.merged_name, "Smile");

        let frown = mesh.find("Frown左").unwrap();
        assert!(find_counterpart(&mesh, &resolver, frown).is_none());
        let basis = mesh.reference_key().unwrap();
        assert!(find_counterpart(&mesh, &resolver, basis).is_none());
        assert_eq!(classify_key(&mesh, &resolver, basis), Some(Role::Base));
    }
}

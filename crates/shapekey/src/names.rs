//! Shape key name classification.
//!
//! Left/right halves normally carry a trailing marker glyph (`笑い左`,
//! `笑い右`). MMD models break that rule for a few expressions, so an alias
//! table maps those canonical names to their irregular half names. The table
//! is queried in both directions.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

use payu_config::{
    AliasPair, ConfigError, DEFAULT_LEFT_MARKER, DEFAULT_RIGHT_MARKER, ShapeKeyConfig,
};

use crate::partition::Side;

static MMD_ALIASES: LazyLock<AliasTable> = LazyLock::new(|| {
    AliasTable::from_pairs(payu_config::mmd_alias_pairs())
        .unwrap_or_else(|_| AliasTable::default())
});

/// Bidirectional canonical ↔ (left, right) name table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasTable {
    pairs: Vec<AliasPair>,
    by_canonical: HashMap<String, usize>,
    by_half: HashMap<String, (usize, Side)>,
}

impl AliasTable {
    /// The built-in MMD table, built once per process.
    pub fn mmd() -> &'static AliasTable {
        &MMD_ALIASES
    }

    /// Build a table, rejecting any name used twice.
    pub fn from_pairs(pairs: impl IntoIterator<Item = AliasPair>) -> Result<Self, ConfigError> {
        let mut table = Self::default();
        for pair in pairs {
            let index = table.pairs.len();
            for name in [&pair.canonical, &pair.left, &pair.right] {
                if table.by_canonical.contains_key(name) || table.by_half.contains_key(name) {
                    return Err(ConfigError::DuplicateAlias(name.clone()));
                }
            }
            if pair.left == pair.right
                || pair.left == pair.canonical
                || pair.right == pair.canonical
            {
                return Err(ConfigError::DuplicateAlias(pair.canonical.clone()));
            }
            table.by_canonical.insert(pair.canonical.clone(), index);
            table.by_half.insert(pair.left.clone(), (index, Side::Left));
            table.by_half.insert(pair.right.clone(), (index, Side::Right));
            table.pairs.push(pair);
        }
        Ok(table)
    }

    /// Pair whose canonical name is `name`
    pub fn by_canonical(&self, name: &str) -> Option<&AliasPair> {
        self.by_canonical.get(name).map(|&index| &self.pairs[index])
    }

    /// Pair and side for a generated half name
    pub fn by_half(&self, name: &str) -> Option<(&AliasPair, Side)> {
        self.by_half
            .get(name)
            .map(|&(index, side)| (&self.pairs[index], side))
    }

    pub fn pairs(&self) -> &[AliasPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Role of a shape key name in left/right pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// The mesh's reference key
    Base,
    /// `base + left marker`
    LeftSuffixed(String),
    /// `base + right marker`
    RightSuffixed(String),
    /// Left half of an alias pair, carrying the canonical name
    AliasLeft(String),
    /// Right half of an alias pair, carrying the canonical name
    AliasRight(String),
    /// Canonical alias name, carrying the generated (left, right) names
    AliasCanonical(String, String),
    Plain,
}

/// Names of a left/right pair and of the key they merge into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairNames {
    pub left: String,
    pub right: String,
    pub merged: String,
    /// Whether the pair comes from the alias table
    pub alias: bool,
}

/// Classifies names using an alias table and the two marker glyphs.
#[derive(Debug, Clone)]
pub struct NameResolver<'a> {
    aliases: Cow<'a, AliasTable>,
    left_marker: Cow<'a, str>,
    right_marker: Cow<'a, str>,
}

impl Default for NameResolver<'static> {
    fn default() -> Self {
        Self::mmd()
    }
}

impl NameResolver<'static> {
    /// Default markers with the built-in MMD table.
    pub fn mmd() -> Self {
        Self {
            aliases: Cow::Borrowed(AliasTable::mmd()),
            left_marker: Cow::Borrowed(DEFAULT_LEFT_MARKER),
            right_marker: Cow::Borrowed(DEFAULT_RIGHT_MARKER),
        }
    }

    /// Resolver for a validated configuration. The shared MMD table is
    /// reused when the configuration does not override it.
    pub fn from_config(config: &ShapeKeyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let aliases = if config.uses_mmd_aliases() {
            Cow::Borrowed(AliasTable::mmd())
        } else {
            Cow::Owned(AliasTable::from_pairs(config.alias_pairs.iter().cloned())?)
        };
        Ok(Self {
            aliases,
            left_marker: Cow::Owned(config.left_marker.clone()),
            right_marker: Cow::Owned(config.right_marker.clone()),
        })
    }
}

impl NameResolver<'_> {
    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn left_marker(&self) -> &str {
        &self.left_marker
    }

    pub fn right_marker(&self) -> &str {
        &self.right_marker
    }

    /// Classify a name. Alias entries take precedence over the suffix rule.
    pub fn classify(&self, name: &str) -> Role {
        if let Some(pair) = self.aliases.by_canonical(name) {
            return Role::AliasCanonical(pair.left.clone(), pair.right.clone());
        }
        if let Some((pair, side)) = self.aliases.by_half(name) {
            return match side {
                Side::Left => Role::AliasLeft(pair.canonical.clone()),
                Side::Right => Role::AliasRight(pair.canonical.clone()),
            };
        }
        if let Some(base) = name.strip_suffix(self.left_marker()) {
            return Role::LeftSuffixed(base.to_string());
        }
        if let Some(base) = name.strip_suffix(self.right_marker()) {
            return Role::RightSuffixed(base.to_string());
        }
        Role::Plain
    }

    /// Whether `name` ends with either marker glyph
    pub fn is_suffixed(&self, name: &str) -> bool {
        name.ends_with(self.left_marker()) || name.ends_with(self.right_marker())
    }

    pub fn left_name(&self, base: &str) -> String {
        format!("{base}{}", self.left_marker)
    }

    pub fn right_name(&self, base: &str) -> String {
        format!("{base}{}", self.right_marker)
    }

    /// Strip every trailing marker glyph.
    ///
    /// Used by the single-key split to derive the base name; it does not
    /// care whether the key is already one half of a pair.
    pub fn strip_markers<'n>(&self, name: &'n str) -> &'n str {
        let mut base = name;
        loop {
            if let Some(stripped) = base.strip_suffix(self.left_marker()) {
                base = stripped;
            } else if let Some(stripped) = base.strip_suffix(self.right_marker()) {
                base = stripped;
            } else {
                return base;
            }
        }
    }

    /// Pair names for a key that is one half of a pair: alias table first,
    /// then the suffix rule. `None` for plain and canonical names.
    pub fn counterpart(&self, name: &str) -> Option<PairNames> {
        match self.classify(name) {
            Role::AliasLeft(canonical) | Role::AliasRight(canonical) => {
                let pair = self.aliases.by_canonical(&canonical)?;
                Some(PairNames {
                    left: pair.left.clone(),
                    right: pair.right.clone(),
                    merged: canonical,
                    alias: true,
                })
            }
            Role::LeftSuffixed(base) | Role::RightSuffixed(base) => Some(PairNames {
                left: self.left_name(&base),
                right: self.right_name(&base),
                merged: base,
                alias: false,
            }),
            _ => None,
        }
    }

    /// MMD name for `canonical + marker`, if `canonical` is an alias key.
    ///
    /// Only a single trailing marker is considered.
    pub fn mmd_rename(&self, name: &str) -> Option<String> {
        if let Some(base) = name.strip_suffix(self.left_marker()) {
            return self.aliases.by_canonical(base).map(|pair| pair.left.clone());
        }
        if let Some(base) = name.strip_suffix(self.right_marker()) {
            return self.aliases.by_canonical(base).map(|pair| pair.right.clone());
        }
        None
    }
}

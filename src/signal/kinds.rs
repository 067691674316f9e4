use std::collections::HashMap;

use smallvec::SmallVec;

use crate::foundation::core::KindId;
use crate::foundation::error::{KinemaError, KinemaResult};

#[derive(Clone, Debug)]
struct KindInfo {
    name: String,
    /// `[self, ...ancestors]`, most specific first, deduplicated.
    mro: SmallVec<[KindId; 4]>,
}

/// Registry of object kinds and their precomputed ancestor lists.
///
/// Kinds stand in for classes: self-scoped slots, computation names and renderers are attached
/// to a kind and apply to all of its sub-kinds.
#[derive(Clone, Debug, Default)]
pub struct KindRegistry {
    kinds: Vec<KindInfo>,
    by_name: HashMap<String, KindId>,
}

impl KindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind deriving from `bases` (in priority order).
    ///
    /// The resolution order is `self` followed by each base's own order, keeping the first
    /// occurrence of shared ancestors.
    pub fn register(&mut self, name: impl Into<String>, bases: &[KindId]) -> KinemaResult<KindId> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(KinemaError::validation(format!(
                "kind `{name}` is already registered"
            )));
        }
        let idx = u16::try_from(self.kinds.len())
            .map_err(|_| KinemaError::validation("too many kinds registered"))?;
        let id = KindId(idx);

        let mut mro: SmallVec<[KindId; 4]> = SmallVec::new();
        mro.push(id);
        for &base in bases {
            for &k in self.mro(base)? {
                if !mro.contains(&k) {
                    mro.push(k);
                }
            }
        }

        self.kinds.push(KindInfo {
            name: name.clone(),
            mro,
        });
        self.by_name.insert(name, id);
        Ok(id)
    }

    /// Resolution order of `kind`, most specific first.
    pub fn mro(&self, kind: KindId) -> KinemaResult<&[KindId]> {
        self.kinds
            .get(usize::from(kind.0))
            .map(|k| k.mro.as_slice())
            .ok_or_else(|| KinemaError::validation(format!("unknown kind {kind:?}")))
    }

    /// Whether `kind` is `base` or derives from it.
    pub fn is_subkind(&self, kind: KindId, base: KindId) -> bool {
        self.mro(kind).is_ok_and(|mro| mro.contains(&base))
    }

    /// Registered name of `kind`.
    pub fn name(&self, kind: KindId) -> Option<&str> {
        self.kinds.get(usize::from(kind.0)).map(|k| k.name.as_str())
    }

    /// Look up a kind by name.
    pub fn lookup(&self, name: &str) -> Option<KindId> {
        self.by_name.get(name).copied()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/signal/kinds.rs"]
mod tests;

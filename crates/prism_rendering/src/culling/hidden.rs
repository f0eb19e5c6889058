//! Hierarchical hidden propagation.

use prism_core::{Instance, InstanceFlags};

/// Effective hidden state of every instance, resolved once per scene.
///
/// An instance is hidden if it hides itself, or if its parent is hidden and
/// it is not marked [`InstanceFlags::PARENT_VISIBILITY_EXEMPT`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HiddenResolver {
    hidden: Vec<bool>,
}

impl HiddenResolver {
    /// Resolves every parent chain. Each instance is visited once.
    ///
    /// Parent indices must be in range and acyclic, as guaranteed by
    /// `SceneSnapshot`.
    #[must_use]
    pub fn resolve(instances: &[Instance]) -> Self {
        let mut memo: Vec<Option<bool>> = vec![None; instances.len()];
        let mut chain = Vec::new();

        for start in 0..instances.len() {
            let mut above = false;
            let mut current = Some(start);
            while let Some(i) = current {
                if let Some(hidden) = memo[i] {
                    above = hidden;
                    break;
                }
                chain.push(i);
                current = instances[i].parent.map(|p| p as usize);
            }

            // Unwind root-most first
            for &i in chain.iter().rev() {
                let instance = &instances[i];
                above = instance.is_self_hidden()
                    || (above && !instance.flags.contains(InstanceFlags::PARENT_VISIBILITY_EXEMPT));
                memo[i] = Some(above);
            }
            chain.clear();
        }

        Self {
            hidden: memo.into_iter().map(|h| h.unwrap_or(false)).collect(),
        }
    }

    /// True if the instance at `position` is effectively hidden.
    #[inline]
    #[must_use]
    pub fn is_hidden(&self, position: usize) -> bool {
        self.hidden.get(position).copied().unwrap_or(false)
    }

    /// Number of effectively hidden instances.
    #[must_use]
    pub fn hidden_count(&self) -> usize {
        self.hidden.iter().filter(|&&h| h).count()
    }
}

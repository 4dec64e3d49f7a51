use crate::foundation::core::FrameIndex;
use crate::scene::model::{DataBinding, Effect, SceneDescriptor};

#[derive(Clone, Copy, Debug)]
/// Borrowed view of an effect that is active on a given frame.
pub struct EffectRef<'a> {
    /// Position in the descriptor's effect list (its z-order).
    pub z: usize,
    /// The effect itself.
    pub effect: &'a Effect,
}

/// Iterator over the effects active on one frame, in z-order.
pub struct ActiveEffects<'a> {
    frame: FrameIndex,
    inner: std::iter::Enumerate<std::slice::Iter<'a, Effect>>,
}

impl<'a> Iterator for ActiveEffects<'a> {
    type Item = EffectRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let frame = self.frame;
        self.inner
            .by_ref()
            .find(|(_, e)| e.range.contains(frame))
            .map(|(z, effect)| EffectRef { z, effect })
    }
}

impl SceneDescriptor {
    /// Effects with `start <= frame < end`, in descriptor order.
    pub fn active_effects_at(&self, frame: FrameIndex) -> Vec<EffectRef<'_>> {
        self.iter_active(frame).collect()
    }

    /// Allocation-free form of [`SceneDescriptor::active_effects_at`].
    pub fn iter_active(&self, frame: FrameIndex) -> ActiveEffects<'_> {
        ActiveEffects {
            frame,
            inner: self.effects().iter().enumerate(),
        }
    }

    /// Data binding referenced by `effect`, if it names one that exists.
    ///
    /// Unbound effects, and effects naming an unknown binding, render their static content.
    pub fn resolve_data_binding(&self, effect: &Effect) -> Option<&DataBinding> {
        effect
            .data_binding_id
            .as_deref()
            .and_then(|id| self.binding_by_id(id))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/timeline.rs"]
mod tests;

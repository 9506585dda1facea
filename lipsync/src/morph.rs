use crate::Error;
use std::collections::HashMap;

/// Morph-target (blend shape) weights of a single mesh plus its name→index dictionary.
///
/// The weight buffer has a fixed length decided at construction; writes outside of it are
/// ignored and every stored weight stays within `[0, 1]`.
#[derive(Clone, Debug, Default)]
pub struct MorphTargets {
    dictionary: HashMap<String, usize>,
    weights: Vec<f32>,
}

impl MorphTargets {
    pub fn new(dictionary: HashMap<String, usize>, len: usize) -> Result<Self, Error> {
        if let Some((name, index)) = dictionary.iter().find(|(_, index)| **index >= len) {
            return Err(Error::InvalidValue {
                message: format!("morph target '{name}' index {index} out of range (len {len})"),
            });
        }
        Ok(Self {
            dictionary,
            weights: vec![0.0; len],
        })
    }

    /// Builds a buffer whose indices follow the order of `names`.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut dictionary = HashMap::new();
        let mut len = 0usize;
        for name in names {
            dictionary.entry(name.into()).or_insert(len);
            len += 1;
        }
        Self {
            dictionary,
            weights: vec![0.0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.dictionary.get(name).copied()
    }

    pub fn dictionary(&self) -> &HashMap<String, usize> {
        &self.dictionary
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn weight(&self, index: usize) -> Option<f32> {
        self.weights.get(index).copied()
    }

    pub fn weight_by_name(&self, name: &str) -> Option<f32> {
        self.weight(self.index_of(name)?)
    }

    /// Returns `false` when `index` is outside the buffer.
    pub fn set_weight(&mut self, index: usize, weight: f32) -> bool {
        let Some(slot) = self.weights.get_mut(index) else {
            return false;
        };
        *slot = clamp_weight(weight);
        true
    }

    pub fn set_weight_by_name(&mut self, name: &str, weight: f32) -> Result<(), Error> {
        let index = self
            .index_of(name)
            .ok_or_else(|| Error::UnknownMorphTarget {
                name: name.to_string(),
            })?;
        self.set_weight(index, weight);
        Ok(())
    }

    pub fn decay_all(&mut self, step: f32) {
        for w in &mut self.weights {
            *w = decay_toward_rest(*w, step);
        }
    }

    pub fn decay_channels(&mut self, channels: &[usize], step: f32) {
        for &index in channels {
            if let Some(w) = self.weights.get_mut(index) {
                *w = decay_toward_rest(*w, step);
            }
        }
    }

    pub fn clear(&mut self) {
        self.weights.fill(0.0);
    }

    pub fn is_at_rest(&self) -> bool {
        self.weights.iter().all(|w| *w == 0.0)
    }
}

/// One decay step toward zero.
///
/// Anything left within half a step of zero lands exactly on zero, so a full-strength weight
/// rests after `ceil(1 / step)` steps despite the error repeated f32 subtraction accumulates.
pub(crate) fn decay_toward_rest(value: f32, step: f32) -> f32 {
    let next = value - step;
    if next <= step * 0.5 { 0.0 } else { next }
}

fn clamp_weight(weight: f32) -> f32 {
    if weight.is_nan() {
        0.0
    } else {
        weight.clamp(0.0, 1.0)
    }
}

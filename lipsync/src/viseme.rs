//! Viseme events and their mapping onto morph-target names.

use crate::MorphTargets;
use std::collections::BTreeMap;

/// Offset ticks (100 ns) per millisecond, as reported by cloud speech services.
pub const TICKS_PER_MILLISECOND: f64 = 10_000.0;

/// "This mouth shape becomes active `offset_ms` after speech playback started."
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VisemeEvent {
    pub id: u32,
    pub offset_ms: f64,
}

impl VisemeEvent {
    /// Negative and non-finite offsets are clamped to zero.
    pub fn new(id: u32, offset_ms: f64) -> Self {
        let offset_ms = if offset_ms.is_finite() && offset_ms >= 0.0 {
            offset_ms
        } else {
            0.0
        };
        Self { id, offset_ms }
    }

    pub fn from_ticks(id: u32, ticks: u64) -> Self {
        Self::new(id, ticks as f64 / TICKS_PER_MILLISECOND)
    }
}

const DEFAULT_VISEME_NAMES: [&str; 22] = [
    "viseme_sil",
    "viseme_PP",
    "viseme_AA",
    "viseme_TH",
    "viseme_O",
    "viseme_U",
    "viseme_I",
    "viseme_E",
    "viseme_FF",
    "viseme_kk",
    "viseme_CH",
    "viseme_SS",
    "viseme_nn",
    "viseme_R",
    "viseme_S",
    "viseme_DD",
    "viseme_T",
    "viseme_JJ",
    "viseme_Z",
    "viseme_L",
    "viseme_V",
    "viseme_sil",
];

/// Viseme id → morph-target name.
///
/// The default table covers provider ids `0..=21` with ReadyPlayerMe-style `viseme_*` names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisemeMap {
    names: BTreeMap<u32, String>,
}

impl Default for VisemeMap {
    fn default() -> Self {
        Self {
            names: DEFAULT_VISEME_NAMES
                .iter()
                .enumerate()
                .map(|(id, name)| (id as u32, (*name).to_string()))
                .collect(),
        }
    }
}

impl VisemeMap {
    pub fn empty() -> Self {
        Self {
            names: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, id: u32, morph_name: impl Into<String>) -> Option<String> {
        self.names.insert(id, morph_name.into())
    }

    pub fn name(&self, id: u32) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.names.iter().map(|(id, name)| (*id, name.as_str()))
    }

    pub fn resolve(&self, id: u32, morphs: &MorphTargets) -> Option<usize> {
        morphs.index_of(self.name(id)?)
    }

    /// Sorted, de-duplicated morph indices reachable from any viseme id.
    pub fn channels(&self, morphs: &MorphTargets) -> Vec<usize> {
        let mut out = self
            .names
            .values()
            .filter_map(|name| morphs.index_of(name))
            .collect::<Vec<_>>();
        out.sort_unstable();
        out.dedup();
        out
    }
}

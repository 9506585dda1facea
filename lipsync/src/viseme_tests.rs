use crate::{MorphTargets, VisemeEvent, VisemeMap};

#[test]
fn default_map_covers_provider_ids() {
    let map = VisemeMap::default();
    assert_eq!(map.len(), 22);
    assert_eq!(map.name(0), Some("viseme_sil"));
    assert_eq!(map.name(2), Some("viseme_AA"));
    assert_eq!(map.name(21), Some("viseme_sil"));
    assert_eq!(map.name(22), None);
}

#[test]
fn resolve_needs_both_a_name_and_a_morph_target() {
    let morphs = MorphTargets::from_names(["viseme_AA", "viseme_sil"]);
    let mut map = VisemeMap::default();
    assert_eq!(map.resolve(2, &morphs), Some(0));
    assert_eq!(map.resolve(21, &morphs), Some(1));
    assert_eq!(map.resolve(3, &morphs), None);
    assert_eq!(map.resolve(99, &morphs), None);

    map.insert(99, "viseme_AA");
    assert_eq!(map.resolve(99, &morphs), Some(0));
}

#[test]
fn channels_are_sorted_and_unique() {
    let morphs = MorphTargets::from_names(["eyeBlinkLeft", "viseme_sil", "viseme_PP"]);
    assert_eq!(VisemeMap::default().channels(&morphs), vec![1, 2]);
    assert!(VisemeMap::empty().channels(&morphs).is_empty());
}

#[test]
fn event_offsets_are_finite_and_never_negative() {
    assert_eq!(VisemeEvent::new(1, -5.0).offset_ms, 0.0);
    assert_eq!(VisemeEvent::new(1, f64::NAN).offset_ms, 0.0);
    assert_eq!(VisemeEvent::new(1, f64::INFINITY).offset_ms, 0.0);
    assert_eq!(VisemeEvent::new(1, f64::NEG_INFINITY).offset_ms, 0.0);
    assert_eq!(VisemeEvent::from_ticks(4, 2_500_000).offset_ms, 250.0);
}

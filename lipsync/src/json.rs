//! JSON loaders for engine configuration, clip libraries, viseme maps, Q&A tables and whole
//! scene manifests.

use crate::{
    AnimationClip, AvatarEngine, ClipLibrary, DecayScope, EngineConfig, Error, MorphTargets,
    QaEntry, QaTable, SpeechProvider, VisemeMap,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigDef {
    #[serde(default)]
    decay_step: Option<f32>,
    #[serde(default)]
    viseme_strength: Option<f32>,
    #[serde(default)]
    blend_duration: Option<f32>,
    #[serde(default)]
    decay_scope: Option<DecayScopeDef>,
    #[serde(default)]
    idle_clip: Option<String>,
    #[serde(default)]
    default_voice: Option<String>,
    #[serde(default)]
    fallback_answer: Option<String>,
}

#[derive(Debug, Deserialize)]
enum DecayScopeDef {
    #[serde(rename = "all")]
    All,
    #[serde(rename = "visemes")]
    Visemes,
}

#[derive(Debug, Deserialize)]
struct QaDef {
    q: String,
    a: String,
    #[serde(default)]
    anim: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClipDef {
    name: String,
    #[serde(default)]
    duration: f32,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MorphTargetsDef {
    List(Vec<String>),
    Map(BTreeMap<String, usize>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SceneDef {
    #[serde(default)]
    config: ConfigDef,
    #[serde(default)]
    clips: Vec<ClipDef>,
    morph_targets: MorphTargetsDef,
    #[serde(default)]
    viseme_map: Option<BTreeMap<String, String>>,
    #[serde(default)]
    qa: Vec<QaDef>,
}

fn parse<T: DeserializeOwned>(input: &str) -> Result<T, Error> {
    serde_json::from_str(input).map_err(|e| Error::JsonParse {
        message: e.to_string(),
    })
}

fn build_config(def: ConfigDef) -> Result<EngineConfig, Error> {
    let mut config = EngineConfig::default();
    if let Some(v) = def.decay_step {
        config.decay_step = v;
    }
    if let Some(v) = def.viseme_strength {
        config.viseme_strength = v;
    }
    if let Some(v) = def.blend_duration {
        config.blend_duration = v;
    }
    if let Some(v) = def.decay_scope {
        config.decay_scope = match v {
            DecayScopeDef::All => DecayScope::AllChannels,
            DecayScopeDef::Visemes => DecayScope::VisemeChannels,
        };
    }
    if let Some(v) = def.idle_clip {
        config.idle_clip = v;
    }
    if let Some(v) = def.default_voice {
        config.default_voice = v;
    }
    if let Some(v) = def.fallback_answer {
        config.fallback_answer = v;
    }
    config.validate()?;
    Ok(config)
}

fn build_clips(defs: Vec<ClipDef>) -> Result<ClipLibrary, Error> {
    let mut library = ClipLibrary::new();
    for def in defs {
        if library.clip(&def.name).is_some() {
            return Err(Error::JsonDuplicate {
                kind: "clip".to_string(),
                name: def.name,
            });
        }
        library.insert(AnimationClip::new(def.name, def.duration))?;
    }
    Ok(library)
}

fn build_morphs(def: MorphTargetsDef) -> Result<MorphTargets, Error> {
    match def {
        MorphTargetsDef::List(names) => {
            let mut seen = HashMap::new();
            for (i, name) in names.iter().enumerate() {
                if seen.insert(name.as_str(), i).is_some() {
                    return Err(Error::JsonDuplicate {
                        kind: "morph target".to_string(),
                        name: name.clone(),
                    });
                }
            }
            Ok(MorphTargets::from_names(names))
        }
        MorphTargetsDef::Map(map) => {
            let len = map.values().max().map(|max| max + 1).unwrap_or(0);
            MorphTargets::new(map.into_iter().collect(), len)
        }
    }
}

fn build_viseme_map(def: BTreeMap<String, String>) -> Result<VisemeMap, Error> {
    let mut map = VisemeMap::empty();
    for (key, name) in def {
        let id = key.trim().parse::<u32>().map_err(|_| Error::JsonParse {
            message: format!("viseme id '{key}' is not a non-negative integer"),
        })?;
        map.insert(id, name);
    }
    Ok(map)
}

fn build_qa(defs: Vec<QaDef>) -> QaTable {
    defs.into_iter()
        .map(|def| QaEntry {
            question: def.q,
            answer: def.a,
            animation: def.anim.filter(|a| !a.is_empty()),
        })
        .collect()
}

impl EngineConfig {
    pub fn from_json_str(input: &str) -> Result<Self, Error> {
        build_config(parse(input)?)
    }
}

impl ClipLibrary {
    /// `[{ "name": "Idle", "duration": 4.0 }, ...]`
    pub fn from_json_str(input: &str) -> Result<Self, Error> {
        build_clips(parse(input)?)
    }
}

impl VisemeMap {
    /// `{ "0": "viseme_sil", "1": "viseme_PP", ... }`
    pub fn from_json_str(input: &str) -> Result<Self, Error> {
        build_viseme_map(parse(input)?)
    }
}

impl QaTable {
    /// `[{ "q": "...", "a": "...", "anim": "Wave" }, ...]`
    pub fn from_json_str(input: &str) -> Result<Self, Error> {
        Ok(build_qa(parse(input)?))
    }
}

/// Everything needed to build an [`AvatarEngine`] for one avatar.
#[derive(Clone, Debug)]
pub struct Scene {
    pub config: EngineConfig,
    pub clips: Arc<ClipLibrary>,
    pub morphs: MorphTargets,
    pub visemes: VisemeMap,
    pub qa: QaTable,
}

impl Scene {
    pub fn from_json_str(input: &str) -> Result<Self, Error> {
        let def: SceneDef = parse(input)?;
        Ok(Self {
            config: build_config(def.config)?,
            clips: Arc::new(build_clips(def.clips)?),
            morphs: build_morphs(def.morph_targets)?,
            visemes: match def.viseme_map {
                Some(map) => build_viseme_map(map)?,
                None => VisemeMap::default(),
            },
            qa: build_qa(def.qa),
        })
    }

    pub fn into_engine<P: SpeechProvider>(
        self,
        provider: P,
    ) -> Result<AvatarEngine<P, QaTable>, Error> {
        Ok(
            AvatarEngine::new(self.config, provider, self.qa, self.morphs, self.clips)?
                .with_viseme_map(self.visemes),
        )
    }
}

use lipsync::json::Scene;
use lipsync::{AvatarEngine, EstimatedSpeech, QaTable};
use serde_json::json;
use std::path::PathBuf;

const DEFAULT_SCENE: &str = r#"{
  "clips": [
    { "name": "Idle", "duration": 4.0 },
    { "name": "Wave", "duration": 2.0 },
    { "name": "Dance", "duration": 5.0 }
  ],
  "morphTargets": [
    "viseme_sil", "viseme_PP", "viseme_FF", "viseme_TH", "viseme_DD", "viseme_kk",
    "viseme_CH", "viseme_SS", "viseme_nn", "viseme_RR", "viseme_AA", "viseme_E",
    "viseme_I", "viseme_O", "viseme_U", "viseme_R", "viseme_S", "viseme_T",
    "viseme_JJ", "viseme_Z", "viseme_L", "viseme_V"
  ],
  "qa": [
    { "q": "Merhaba.", "a": "Merhaba, ben Ahmet.", "anim": "Wave" },
    { "q": "Dans edebilir misin?", "a": "Tabii ki, izle!", "anim": "Dance" }
  ]
}"#;

fn load_scene(path: Option<&PathBuf>) -> Scene {
    let json = match path {
        Some(path) => std::fs::read_to_string(path).expect("read scene"),
        None => DEFAULT_SCENE.to_string(),
    };
    Scene::from_json_str(&json).expect("parse scene")
}

fn main() {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut positional = Vec::<String>::new();
    let mut scene_path: Option<PathBuf> = None;
    let mut fps = 60.0f64;

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--scene" => {
                scene_path = args.get(i + 1).map(PathBuf::from);
                i += 2;
            }
            "--fps" => {
                fps = args
                    .get(i + 1)
                    .and_then(|s| s.parse().ok())
                    .filter(|v: &f64| *v > 0.0)
                    .unwrap_or(60.0);
                i += 2;
            }
            other => {
                positional.push(other.to_string());
                i += 1;
            }
        }
    }

    let question = positional
        .first()
        .cloned()
        .unwrap_or_else(|| "Merhaba.".to_string());
    let seconds: f64 = positional
        .get(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(3.0);

    let scene = load_scene(scene_path.as_ref());
    let mut engine: AvatarEngine<EstimatedSpeech, QaTable> = scene
        .into_engine(EstimatedSpeech::default())
        .expect("build engine");

    let session = engine.speak_at(&question, "", 0.0);
    let frame_ms = 1000.0 / fps;
    let frames = (seconds * fps).ceil() as usize;

    let mut dump = Vec::with_capacity(frames);
    for frame in 0..frames {
        let now = frame as f64 * frame_ms;
        let report = engine.advance(now);

        let weights: serde_json::Map<String, serde_json::Value> = engine
            .morphs()
            .dictionary()
            .iter()
            .filter_map(|(name, &index)| {
                let w = engine.morphs().weight(index)?;
                (w > 0.0).then(|| (name.clone(), json!(w)))
            })
            .collect();
        let pose: Vec<_> = engine
            .animator()
            .pose()
            .into_iter()
            .map(|p| json!({"clip": p.clip, "time": p.time, "weight": p.weight}))
            .collect();
        let events: Vec<_> = report
            .animation_events
            .iter()
            .map(|e| format!("{e:?}"))
            .collect();

        dump.push(json!({
            "frame": frame,
            "timeMs": now,
            "popped": report.visemes.popped,
            "finished": report.visemes.finished,
            "active": engine.queue().active().index,
            "weights": weights,
            "pose": pose,
            "events": events,
        }));
    }

    let out = json!({
        "question": question,
        "session": session.id(),
        "fps": fps,
        "frames": dump,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&out).expect("serialize dump")
    );
}

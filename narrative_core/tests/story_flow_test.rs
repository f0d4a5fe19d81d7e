//! End-to-end flow: dial -> signal discovery -> trigger -> narrative graph -> choice.

use narrative_core::{
    EngineConfig, ManualScheduler, NarrativeGraph, Notification, NotificationKind,
    TriggerEvaluator,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use signal_rules::{FlagStore, MemoryFlagStore, Reception, SignalMatcher, SignalTable, WorldState};
use std::cell::RefCell;
use std::rc::Rc;

const CONFIG: &str = r#"
[signals]
noise_amplitude = 0.05

[triggers]
poll_interval_ms = 500
"#;

const SIGNALS: &str = r#"
[[signal]]
frequency = 91.1
tolerance = 0.1
base_strength = 0.8
payload_id = "intro_signal"

[[signal]]
frequency = 103.7
tolerance = 0.3
base_strength = 0.5
payload_id = "numbers_station"
is_noisy = true
"#;

const EVENTS: &str = r#"[
    {
        "id": "intro",
        "message": "A voice under the static: is anyone there?",
        "guard": "discovered_intro_signal",
        "choices": [
            {"text": "Answer", "outcome": "trigger_second_contact"},
            {"text": "Stay silent", "outcome": "set_stance=silent"},
            {"text": "Use the codebook", "outcome": "trigger_codes", "guard": "has_codebook"}
        ]
    },
    {
        "id": "second_contact",
        "message": "You hear me? Then listen carefully.",
        "guard": "event_intro"
    },
    {
        "id": "codes",
        "message": "Seven. Four. Nine.",
        "interferenceLevel": 0.6
    }
]"#;

const TRIGGERS: &str = r#"[
    {
        "id": "first_voice",
        "conditions": [{"type": "truthy", "path": "flags.discovered_intro_signal"}],
        "event": {"type": "narrative", "payload": "intro"},
        "oneTime": true
    }
]"#;

fn setup() -> (SignalMatcher, NarrativeGraph<MemoryFlagStore>, TriggerEvaluator) {
    let config = EngineConfig::from_toml_str(CONFIG).unwrap();
    let matcher = SignalMatcher::from_table(SignalTable::from_toml_str(SIGNALS).unwrap())
        .unwrap()
        .with_tuning(config.signals.clone())
        .unwrap();

    let mut graph = NarrativeGraph::with_settings(MemoryFlagStore::new(), config.narrative.clone());
    assert!(graph.load_events(EVENTS));

    let mut evaluator = TriggerEvaluator::new(&config.triggers);
    assert!(evaluator.load_triggers(TRIGGERS));

    (matcher, graph, evaluator)
}

#[test]
fn test_signal_scenario() {
    let (matcher, _, _) = setup();
    let mut rng = StdRng::seed_from_u64(91);

    let found = matcher.find_signal_at_frequency(91.1).unwrap();
    assert_eq!(found.payload_id, "intro_signal");
    let strength = matcher.calculate_strength_with_rng(91.1, found, &mut rng);
    assert!((0.75..=0.85).contains(&strength));

    assert!(matcher.find_signal_at_frequency(91.25).is_none());
    assert!(matches!(matcher.tune(91.25), Reception::Static { .. }));
}

#[test]
fn test_discovery_drives_story() {
    let (matcher, mut graph, mut evaluator) = setup();
    let mut scheduler = ManualScheduler::new();
    let mut world = WorldState::new();

    let events_seen = Rc::new(RefCell::new(Vec::new()));
    let sink = events_seen.clone();
    graph.subscribe(NotificationKind::NarrativeEvent, move |n| {
        if let Notification::NarrativeEvent(e) = n {
            sink.borrow_mut().push(e.id.clone());
        }
    });

    // Nothing discovered yet: the intro guard blocks manual triggering too.
    world.tune(88.0);
    let snapshot = world.snapshot_with_flags(graph.flags());
    assert!(evaluator
        .start(&mut scheduler, 0, &snapshot, &mut graph)
        .is_empty());
    assert!(!graph.trigger_event("intro"));

    // Tune in and record the discovery.
    world.tune(91.1);
    let found = matcher.match_at(world.dial).unwrap();
    assert!(matcher.record_discovery(&found, graph.flags_mut()));

    for tick in scheduler.advance_to(2_000) {
        let snapshot = world.snapshot_with_flags(graph.flags());
        evaluator.on_tick(tick.handle, tick.at_ms, &snapshot, &mut graph);
    }

    assert_eq!(*events_seen.borrow(), vec!["intro"]);
    assert_eq!(evaluator.state("first_voice").unwrap().fire_count, 1);

    let active = graph.current_event().unwrap();
    assert_eq!(active.id, "intro");
    assert_eq!(active.choices.len(), 2);

    assert!(graph.make_choice(0));
    assert_eq!(graph.current_event().unwrap().id, "second_contact");
    assert_eq!(graph.history(), ["intro", "second_contact"]);
    assert!(graph.flags().get_flag("choice_intro_0"));

    assert!(evaluator.stop(&mut scheduler));
    assert!(!evaluator.stop(&mut scheduler));
}

#[test]
fn test_progress_survives_reload() {
    let (_, mut graph, _) = setup();
    graph.flags_mut().set_flag("discovered_intro_signal", true);
    graph.trigger_event("intro");
    graph.make_choice(1);
    assert_eq!(graph.variable("stance"), Some("silent"));

    let saved = graph.flags().to_json().unwrap();
    let store = MemoryFlagStore::from_json(&saved).unwrap();
    let restored = NarrativeGraph::new(store);

    assert_eq!(restored.history(), ["intro"]);
    assert!(restored.has_triggered_event("intro"));
    assert_eq!(restored.variable("stance"), Some("silent"));
    assert!(restored.evaluate_condition("stance=silent"));
    assert!(restored.evaluate_condition("!event_second_contact"));
}

#[test]
fn test_guarded_choice_unlocks() {
    let (_, mut graph, _) = setup();
    graph.flags_mut().set_flag("discovered_intro_signal", true);
    graph.flags_mut().set_flag("has_codebook", true);

    graph.trigger_event("intro");
    assert_eq!(graph.current_event().unwrap().choices.len(), 3);
    assert!(graph.make_choice(2));

    let codes = graph.current_event().unwrap();
    assert_eq!(codes.id, "codes");
    assert_ne!(codes.message, "Seven. Four. Nine.");
}

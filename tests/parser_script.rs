use desk_driver::keyboard::KeyboardController;
use desk_driver::monitor::{ActivityMonitor, EventSource};
use desk_driver::motion::{MotionProfile, MotionSynthesizer};
use desk_driver::mouse::MouseController;
use desk_driver::parser::ActionParser;
use desk_driver::screen::{Point, ScreenMap};
use std::sync::Arc;


fn parser() -> (ActionParser, Arc<ActivityMonitor>) {
    let monitor = ActivityMonitor::new(500, 1000);
    let keyboard = KeyboardController::new(Arc::clone(&monitor));
    let mouse = MouseController::with_motion(
        Arc::clone(&monitor),
        ScreenMap::new(1920, 1080),
        MotionSynthesizer::with_seed(MotionProfile::default(), 9),
    );
    (
        ActionParser::new(keyboard, mouse, Arc::clone(&monitor)),
        monitor,
    )
}

#[test]
fn move_line_enqueues_a_single_move() {
    let (mut parser, monitor) = parser();
    parser.parse("MOVE 100 200 0.1").unwrap();

    assert_eq!(parser.mouse().inspect(), vec!["Move"]);
    assert!(parser.keyboard().is_empty());

    let events = monitor.action_history();
    let parser_moves: Vec<_> = events
        .iter()
        .filter(|e| e.source == EventSource::Parser && e.kind == "MOVE")
        .collect();
    assert_eq!(parser_moves.len(), 1);
    assert_eq!(
        parser_moves[0].data["tokens"],
        serde_json::json!(["MOVE", "100", "200", "0.1"])
    );

    let mouse_moves: Vec<_> = events
        .iter()
        .filter(|e| e.source == EventSource::Mouse && e.kind == "MOVE")
        .collect();
    assert_eq!(mouse_moves.len(), 1);
    assert_eq!(mouse_moves[0].data["x"], 100);
    assert_eq!(mouse_moves[0].data["duration"], 0.1);
}

#[test]
fn odd_path_coordinates_abort_on_line_one() {
    let (mut parser, _monitor) = parser();
    let err = parser.parse("PATH 1 2 3").unwrap_err();
    assert_eq!(err.line, 1);
    assert_eq!(err.text, "PATH 1 2 3");
    assert!(err.cause.to_string().contains("even number"));
    assert!(parser.mouse().is_empty());
}

#[test]
fn faults_carry_the_failing_line_number() {
    let (mut parser, _monitor) = parser();
    let err = parser.parse("ENTER\nMOVE 10 oops\nENTER").unwrap_err();
    assert_eq!(err.line, 2);
    assert!(err.cause.to_string().contains("invalid y"));
    // The first line was already applied and stays applied.
    assert_eq!(parser.keyboard().len(), 1);
}

#[test]
fn unknown_commands_are_rejected() {
    let (mut parser, _monitor) = parser();
    let err = parser.parse("SWIPE 1 2").unwrap_err();
    assert!(err.cause.to_string().contains("unknown command"));
}

#[test]
fn wrong_arity_is_rejected() {
    let (mut parser, _monitor) = parser();
    assert!(parser.parse("PRESS").is_err());
    assert!(parser.parse("PRESS a b").is_err());
    assert!(parser.parse("WAIT").is_err());
    assert!(parser.parse("MOVE 1").is_err());
    assert!(parser.parse("CLICK").is_err());
    assert!(parser.parse("CLICK nope").is_err());
}

#[test]
fn comments_and_blank_lines_are_skipped() {
    let (mut parser, monitor) = parser();
    parser.parse("# a comment\n\n   \nENTER\n").unwrap();
    assert_eq!(parser.keyboard().len(), 1);
    assert_eq!(monitor.action_history().len(), 2);
}

#[test]
fn commands_match_case_insensitively() {
    let (mut parser, monitor) = parser();
    parser.parse("move 5 5\nEnTeR").unwrap();
    assert_eq!(parser.mouse().len(), 1);
    assert_eq!(parser.keyboard().len(), 1);
    // The recorded command name is normalized to uppercase.
    let kinds: Vec<_> = monitor
        .action_history()
        .iter()
        .filter(|e| e.source == EventSource::Parser)
        .map(|e| e.kind.clone())
        .collect();
    assert_eq!(kinds, vec!["MOVE", "ENTER"]);
}

#[test]
fn quoted_text_survives_as_one_token() {
    let (mut parser, monitor) = parser();
    parser.parse("TYPE \"hello world\" again").unwrap();
    let events = monitor.action_history();
    let typed = events
        .iter()
        .find(|e| e.source == EventSource::Keyboard && e.kind == "TYPE")
        .unwrap();
    assert_eq!(typed.data["text"], "hello world again");
}

#[test]
fn unbalanced_quoting_is_a_fault() {
    let (mut parser, _monitor) = parser();
    let err = parser.parse("TYPE \"oops").unwrap_err();
    assert_eq!(err.line, 1);
    assert!(err.cause.to_string().contains("quoting"));
}

#[test]
fn scenario_records_six_events_in_order() {
    let (mut parser, monitor) = parser();
    parser.parse("TYPE hello\nENTER\nCLICK left\n").unwrap();

    let events = monitor.action_history();
    let observed: Vec<_> = events
        .iter()
        .map(|e| (e.source, e.kind.as_str()))
        .collect();
    assert_eq!(
        observed,
        vec![
            (EventSource::Parser, "TYPE"),
            (EventSource::Keyboard, "TYPE"),
            (EventSource::Parser, "ENTER"),
            (EventSource::Keyboard, "ENTER"),
            (EventSource::Parser, "CLICK"),
            (EventSource::Mouse, "CLICK"),
        ]
    );
    assert_eq!(parser.keyboard().inspect(), vec!["TypeText", "KeyTap"]);
    assert_eq!(parser.mouse().inspect(), vec!["Click"]);
}

#[test]
fn wait_lands_on_both_queues() {
    let (mut parser, _monitor) = parser();
    parser.parse("WAIT 0.5").unwrap();
    assert_eq!(parser.keyboard().inspect(), vec!["Wait"]);
    assert_eq!(parser.mouse().inspect(), vec!["Wait"]);
}

#[test]
fn move_n_maps_normalized_coordinates() {
    let (mut parser, monitor) = parser();
    parser.parse("MOVE_N 0.5 0.5").unwrap();
    let events = monitor.action_history();
    let queued = events
        .iter()
        .find(|e| e.source == EventSource::Mouse && e.kind == "MOVE")
        .unwrap();
    assert_eq!(queued.data["x"], 960);
    assert_eq!(queued.data["y"], 540);
}

#[test]
fn click_n_becomes_move_then_left_click() {
    let (mut parser, _monitor) = parser();
    parser.parse("CLICK_N 0.25 0.5").unwrap();
    assert_eq!(parser.mouse().inspect(), vec!["Move", "Click"]);
}

#[test]
fn line_honours_the_steps_suffix() {
    let (mut parser, monitor) = parser();
    parser.parse("LINE 0 0 100 100 STEPS 10").unwrap();
    assert_eq!(parser.mouse().inspect(), vec!["Path"]);
    let events = monitor.action_history();
    let queued = events
        .iter()
        .find(|e| e.source == EventSource::Mouse && e.kind == "PATH")
        .unwrap();
    assert_eq!(queued.data["points"].as_array().unwrap().len(), 11);
}

#[test]
fn line_without_count_after_steps_is_a_fault() {
    let (mut parser, _monitor) = parser();
    let err = parser.parse("LINE 0 0 10 10 STEPS").unwrap_err();
    assert!(err.cause.to_string().contains("STEPS"));
}

#[test]
fn path_queues_a_polyline() {
    let (mut parser, _monitor) = parser();
    parser.parse("PATH 0 0 50 50 100 0").unwrap();
    assert_eq!(parser.mouse().inspect(), vec!["Path"]);
}

#[test]
fn shortcut_requires_at_least_one_key() {
    let (mut parser, monitor) = parser();
    assert!(parser.parse("SHORTCUT").is_err());
    parser.parse("SHORTCUT ctrl shift t").unwrap();
    let events = monitor.action_history();
    let queued = events
        .iter()
        .find(|e| e.source == EventSource::Keyboard && e.kind == "SHORTCUT")
        .unwrap();
    assert_eq!(queued.data["keys"], serde_json::json!(["ctrl", "shift", "t"]));
}

#[test]
fn queued_coordinates_are_clamped_to_screen() {
    let monitor = ActivityMonitor::new(64, 64);
    let keyboard = KeyboardController::new(Arc::clone(&monitor));
    // Noise and overshoot off so the trajectory cannot wander transiently.
    let profile = MotionProfile {
        overshoot_chance: 0.0,
        noise_scale: 0.0,
        smoothing_factor: 1.0,
        ..MotionProfile::default()
    };
    let mouse = MouseController::with_motion(
        Arc::clone(&monitor),
        ScreenMap::new(1920, 1080),
        MotionSynthesizer::with_seed(profile, 9),
    );
    let mut parser = ActionParser::new(keyboard, mouse, monitor);

    parser.parse("MOVE 99999 -5").unwrap();
    let backend = mock_backend::MockBackend::new();
    parser.mouse_mut().execute(&backend, true).unwrap();
    // Every injected position stays inside the 1920x1080 screen.
    for call in backend.calls() {
        if let mock_backend::Call::Move(p) = call {
            assert!((0..1920).contains(&p.x), "x out of range: {p}");
            assert!((0..1080).contains(&p.y), "y out of range: {p}");
        }
    }
}

#[test]
fn hold_and_release_queue_key_state_changes() {
    let (mut parser, _monitor) = parser();
    parser.parse("HOLD shift\nPRESS a\nRELEASE shift").unwrap();
    assert_eq!(
        parser.keyboard().inspect(),
        vec!["KeyDown", "KeyTap", "KeyUp"]
    );
}

#[test]
fn parse_failure_leaves_earlier_instructions_enqueued() {
    let (mut parser, _monitor) = parser();
    let err = parser.parse("MOVE 10 10\nCLICK left\nBOOM").unwrap_err();
    assert_eq!(err.line, 3);
    assert_eq!(parser.mouse().inspect(), vec!["Move", "Click"]);
}

#[test]
fn parsed_move_executes_to_the_exact_target_when_overshooting() {
    let monitor = ActivityMonitor::new(64, 64);
    let keyboard = KeyboardController::new(Arc::clone(&monitor));
    let profile = MotionProfile {
        overshoot_chance: 1.0,
        ..MotionProfile::default()
    };
    let mouse = MouseController::with_motion(
        Arc::clone(&monitor),
        ScreenMap::new(1920, 1080),
        MotionSynthesizer::with_seed(profile, 3),
    );
    let mut parser = ActionParser::new(keyboard, mouse, monitor);
    parser.parse("MOVE 800 400").unwrap();

    let backend = mock_backend::MockBackend::new();
    parser.mouse_mut().execute(&backend, true).unwrap();
    let last_move = backend
        .calls()
        .into_iter()
        .rev()
        .find_map(|c| match c {
            mock_backend::Call::Move(p) => Some(p),
            _ => None,
        })
        .unwrap();
    assert_eq!(last_move, Point::new(800, 400));
}

#[test]
fn inspect_preserves_enqueue_order() {
    let (mut parser, _monitor) = parser();
    parser
        .parse("MOVE 1 1\nWAIT 0.1\nCLICK right\nLINE 0 0 10 10")
        .unwrap();
    assert_eq!(
        parser.mouse().inspect(),
        vec!["Move", "Wait", "Click", "Path"]
    );
}

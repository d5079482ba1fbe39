//! Command interpretation against recording collaborators

mod common;

use common::{services, RecordingBackend, RecordingJog};
use pendantlink_communication::{
    CommandInterpreter, CompactFrame, Interpretation, LcdFrame, PeerMessage, PendantAction,
    SyncFrame,
};
use pendantlink_core::{BridgeError, Collaborators, Units};
use std::sync::Arc;

fn sync_interpreter() -> CommandInterpreter {
    CommandInterpreter::new(Arc::new(SyncFrame::new(true)))
}

#[test]
fn test_send_job_dispatched_once() {
    let (backend, jog, collaborators) = services(Units::MM);
    let outcome = sync_interpreter().apply("KEY:25", &collaborators);

    assert_eq!(
        outcome,
        Interpretation::Key {
            code: 25,
            action: Some(PendantAction::SendJob)
        }
    );
    assert_eq!(backend.calls(), vec!["send_job"]);
    assert!(jog.calls().is_empty());
}

#[test]
fn test_command_table() {
    let expected_backend: &[(i32, &str)] = &[
        (12, "zero A"),
        (13, "zero Z"),
        (14, "zero Y"),
        (15, "zero X"),
        (16, "gcode G53 G0 A0"),
        (17, "gcode G53 G0 Z0"),
        (18, "gcode G53 G0 Y0"),
        (19, "gcode G53 G0 X0"),
        (22, "return_to_zero"),
        (23, "home"),
        (25, "send_job"),
        (26, "pause_resume"),
        (27, "cancel"),
    ];
    let expected_jog: &[(i32, &str)] = &[
        (0, "jog_z -1"),
        (1, "jog_abc -1 0 0"),
        (2, "jog_abc 1 0 0"),
        (3, "jog_z 1"),
        (4, "jog_xy 0 -1"),
        (5, "jog_xy 1 0"),
        (6, "jog_xy 0 1"),
        (7, "jog_xy -1 0"),
    ];

    let interpreter = sync_interpreter();
    for (code, call) in expected_backend {
        let (backend, jog, collaborators) = services(Units::MM);
        interpreter.apply(&format!("KEY:{}", code), &collaborators);
        assert_eq!(backend.calls(), vec![call.to_string()], "code {}", code);
        assert!(jog.calls().is_empty(), "code {}", code);
    }
    for (code, call) in expected_jog {
        let (backend, jog, collaborators) = services(Units::MM);
        interpreter.apply(&format!("KEY:{}", code), &collaborators);
        assert_eq!(jog.calls(), vec![call.to_string()], "code {}", code);
        assert!(backend.calls().is_empty(), "code {}", code);
    }
}

#[test]
fn test_step_size_applies_to_all_groups() {
    let (_backend, jog, collaborators) = services(Units::MM);
    let interpreter = sync_interpreter();

    for (code, step) in [(8, 0.001), (9, 0.01), (10, 0.1), (11, 1.0)] {
        interpreter.apply(&format!("KEY:{}", code), &collaborators);
        assert_eq!(jog.steps(), (step, step, step), "code {}", code);
    }
}

#[test]
fn test_unmapped_codes_are_ignored() {
    let (backend, jog, collaborators) = services(Units::MM);
    let interpreter = sync_interpreter();

    for code in [20, 21, 24, 99, -7] {
        let outcome = interpreter.apply(&format!("KEY:{}", code), &collaborators);
        assert_eq!(outcome, Interpretation::Key { code, action: None });
    }
    assert!(backend.calls().is_empty());
    assert!(jog.calls().is_empty());
}

#[test]
fn test_malformed_key() {
    let (backend, _jog, collaborators) = services(Units::MM);
    let outcome = sync_interpreter().apply("KEY:twelve", &collaborators);

    assert_eq!(
        outcome,
        Interpretation::Rejected(BridgeError::MalformedCommand {
            line: "KEY:twelve".to_string()
        })
    );
    assert!(backend.calls().is_empty());
}

#[test]
fn test_collaborator_unavailable() {
    let collaborators = Collaborators::new();
    let outcome = sync_interpreter().apply("KEY:25", &collaborators);

    match outcome {
        Interpretation::Rejected(BridgeError::CollaboratorUnavailable { service }) => {
            assert_eq!(service, "MachineBackend")
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[test]
fn test_late_registration() {
    let (backend, jog, _) = services(Units::MM);
    let collaborators = Collaborators::new();
    let interpreter = sync_interpreter();

    assert!(matches!(
        interpreter.apply("KEY:23", &collaborators),
        Interpretation::Rejected(_)
    ));

    collaborators.register_backend(backend.clone());
    collaborators.register_jog(jog);
    interpreter.apply("KEY:23", &collaborators);
    assert_eq!(backend.calls(), vec!["home"]);
}

#[test]
fn test_collaborator_failure_is_contained() {
    let (backend, _jog, collaborators) = services(Units::MM);
    backend.set_failing(true);

    let outcome = sync_interpreter().apply("KEY:27", &collaborators);
    assert_eq!(
        outcome,
        Interpretation::Key {
            code: 27,
            action: Some(PendantAction::Cancel)
        }
    );
    assert_eq!(backend.calls(), vec!["cancel"]);
}

#[test]
fn test_signals_per_variant() {
    let (backend, _jog, collaborators) = services(Units::MM);

    let compact = CommandInterpreter::new(Arc::new(CompactFrame));
    assert_eq!(
        compact.apply("NANO", &collaborators),
        Interpretation::Signal(PeerMessage::Ping)
    );
    assert_eq!(
        compact.apply("REQ", &collaborators),
        Interpretation::Signal(PeerMessage::Request)
    );

    let lcd = CommandInterpreter::new(Arc::new(LcdFrame));
    assert_eq!(
        lcd.apply("KEY:-1", &collaborators),
        Interpretation::Signal(PeerMessage::Heartbeat)
    );
    assert_eq!(lcd.apply("garbage", &collaborators), Interpretation::Ignored);

    assert!(backend.calls().is_empty());
}

#[test]
fn test_explicit_collaborators_cover_every_code() {
    let interpreter = sync_interpreter();

    for code in 0..=27 {
        let backend = RecordingBackend::new();
        let jog = RecordingJog::new(Units::MM);
        let outcome = interpreter.apply_with(&format!("KEY:{}", code), &backend, &jog);

        let action = PendantAction::from_code(code);
        assert_eq!(outcome, Interpretation::Key { code, action }, "code {}", code);

        let dispatched = backend.calls().len() + jog.calls().len();
        match code {
            // one call per axis group
            8..=11 => {
                assert_eq!(jog.calls().len(), 3, "code {}", code);
                assert!(backend.calls().is_empty(), "code {}", code);
            }
            20 | 21 | 24 => assert_eq!(dispatched, 0, "code {}", code),
            _ => assert_eq!(dispatched, 1, "code {}", code),
        }
    }
}

#[test]
fn test_explicit_collaborators_malformed_and_signal() {
    let interpreter = sync_interpreter();
    let backend = RecordingBackend::new();
    let jog = RecordingJog::new(Units::INCH);

    assert_eq!(
        interpreter.apply_with("KEY:", &backend, &jog),
        Interpretation::Rejected(BridgeError::MalformedCommand {
            line: "KEY:".to_string()
        })
    );
    assert_eq!(
        interpreter.apply_with("REQ", &backend, &jog),
        Interpretation::Signal(PeerMessage::Request)
    );
    assert_eq!(interpreter.apply_with("hello", &backend, &jog), Interpretation::Ignored);

    assert_eq!(
        interpreter.apply_with("KEY:22", &backend, &jog),
        Interpretation::Key {
            code: 22,
            action: Some(PendantAction::ReturnToZero)
        }
    );
    assert_eq!(backend.calls(), vec!["return_to_zero"]);
    assert!(jog.calls().is_empty());
}

//! Tests for chord matching through the session entry points.

mod common;

use common::{BODY, Fixture, collect_diagnostics};
use framestep::{
    Disposition, Error, InputTarget, KeyCode, KeyInput, MediaHost, Rect, SettingsStore, Wheel,
};
use serde_json::json;

const VIDEO: Rect = Rect::new(300.0, 100.0, 200.0, 100.0);

fn press(key: &str) -> KeyInput {
    KeyInput::from_key(key)
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_period_steps_forward_one_frame() {
    let fx = Fixture::new();
    let video = fx.doc.video(BODY, VIDEO);
    let mut session = fx.session();

    let disposition = session.key_down(&press("."), InputTarget::document());

    assert_eq!(disposition, Disposition::Consumed);
    assert!(close(fx.doc.current_time(&video), 1.0 / 60.0));
    assert_eq!(fx.presentation.shows(), vec![VIDEO]);
}

#[test]
fn test_extra_held_key_blocks_chord() {
    let fx = Fixture::new();
    let video = fx.doc.video(BODY, VIDEO);
    let mut session = fx.session();

    session.key_down(&KeyInput::from_code(KeyCode(17)), InputTarget::document());
    let disposition = session.key_down(&press("."), InputTarget::document());

    assert_eq!(disposition, Disposition::Ignored);
    assert_eq!(fx.doc.current_time(&video), 0.0);
    assert!(fx.doc.seeks().is_empty());
}

#[test]
fn test_shift_steps_ten_frames() {
    let fx = Fixture::new();
    let video = fx.doc.video(BODY, VIDEO);
    let mut session = fx.session();

    session.key_down(&KeyInput::modifier_key("ShiftLeft"), InputTarget::document());
    session.key_down(&press("."), InputTarget::document());

    assert!(close(fx.doc.current_time(&video), 10.0 / 60.0));
}

#[test]
fn test_editable_target_is_ignored() {
    let fx = Fixture::new();
    let video = fx.doc.video(BODY, VIDEO);
    let mut session = fx.session();

    let disposition = session.key_down(&press("."), InputTarget::editable());

    assert_eq!(disposition, Disposition::Ignored);
    assert!(session.modifiers().held.is_empty());
    assert_eq!(fx.doc.current_time(&video), 0.0);
}

#[test]
fn test_key_release_in_text_field_is_applied() {
    let fx = Fixture::new();
    fx.doc.video(BODY, VIDEO);
    let mut session = fx.session();

    session.key_down(&press("."), InputTarget::document());
    assert!(session.modifiers().held.contains(&KeyCode::PERIOD));

    session.key_up(&press("."), InputTarget::editable());
    assert!(session.modifiers().held.is_empty());
}

#[test]
fn test_wheel_chord_is_one_shot() {
    let fx = Fixture::new();
    let video = fx.doc.video(BODY, VIDEO);
    let mut session = fx.session();
    fx.settings
        .set("next_shortcut", json!({ "ctrl": true, "wheel": 1, "keys": {} }))
        .unwrap();

    assert_eq!(
        session.key_down(&KeyInput::modifier_key("ControlLeft"), InputTarget::document()),
        Disposition::Ignored
    );
    assert_eq!(session.wheel(3.0, InputTarget::document()), Disposition::Consumed);
    assert!(close(fx.doc.current_time(&video), 1.0 / 60.0));

    // Scrolling up does not match a scroll-down chord.
    assert_eq!(session.wheel(-3.0, InputTarget::document()), Disposition::Ignored);

    session.wheel(3.0, InputTarget::document());
    session.key_down(&press("."), InputTarget::document());
    assert_eq!(session.modifiers().wheel, Wheel::None);
    assert!(close(fx.doc.current_time(&video), 2.0 / 60.0));
}

#[test]
fn test_no_target_and_hidden_surface_skips_evaluation() {
    let fx = Fixture::new();
    let mut session = fx.session();
    let diagnostics = collect_diagnostics(&session);

    let disposition = session.key_down(&press("."), InputTarget::document());

    assert_eq!(disposition, Disposition::Ignored);
    assert!(diagnostics.lock().is_empty());
}

#[test]
fn test_visible_surface_allows_evaluation_without_target() {
    use framestep::Presentation;

    let fx = Fixture::new();
    let mut session = fx.session();
    let diagnostics = collect_diagnostics(&session);
    fx.presentation.show(VIDEO).unwrap();

    let disposition = session.key_down(&press("."), InputTarget::document());

    assert_eq!(disposition, Disposition::Consumed);
    assert_eq!(*diagnostics.lock(), vec![Error::no_target("scrub")]);
}

#[test]
fn test_all_matching_chords_fire_in_table_order() {
    let fx = Fixture::new();
    let video = fx.doc.video(BODY, VIDEO);
    let mut session = fx.session();
    fx.settings
        .set("decrease_framerate", json!({ "keys": { "190": { "key": "." } } }))
        .unwrap();

    session.key_down(&press("."), InputTarget::document());

    // decrease_framerate precedes next_shortcut, so the step uses 59 fps.
    assert_eq!(session.frame_rate(), 59.0);
    assert!(close(fx.doc.current_time(&video), 1.0 / 59.0));
}

#[test]
fn test_show_failure_is_swallowed() {
    let fx = Fixture::new();
    let video = fx.doc.video(BODY, VIDEO);
    fx.presentation.set_fail_show(true);
    let mut session = fx.session();
    let diagnostics = collect_diagnostics(&session);

    session.key_down(&press("."), InputTarget::document());

    assert!(close(fx.doc.current_time(&video), 1.0 / 60.0));
    assert!(diagnostics.lock().is_empty());
}

#[test]
fn test_hide_shortcut_toggles_collapsed_flag() {
    let fx = Fixture::new();
    fx.doc.video(BODY, VIDEO);
    let mut session = fx.session();

    session.key_down(&press("h"), InputTarget::document());
    assert!(fx.presentation.collapsed());
    assert_eq!(fx.settings.get("hidden"), Some(json!(true)));

    session.key_up(&press("h"), InputTarget::document());
    session.key_down(&press("h"), InputTarget::document());
    assert!(!fx.presentation.collapsed());
    assert!(!session.preferences().hidden());
}

#[test]
fn test_dead_key_matches_by_physical_code() {
    let fx = Fixture::new();
    fx.doc.video(BODY, VIDEO);
    let mut session = fx.session();

    let input = KeyInput {
        code: "BracketRight".into(),
        key: "Dead".into(),
        key_code: 0,
    };
    session.key_down(&input, InputTarget::document());

    assert_eq!(session.frame_rate(), 61.0);
}

#[test]
fn test_focus_lost_releases_everything() {
    let fx = Fixture::new();
    fx.doc.video(BODY, VIDEO);
    let mut session = fx.session();

    session.key_down(&KeyInput::modifier_key("AltLeft"), InputTarget::document());
    session.key_down(&press("["), InputTarget::document());
    session.focus_lost();

    assert!(!session.modifiers().alt);
    assert!(session.modifiers().held.is_empty());
}

//! Scene duration resolution.
//!
//! One place computes the authoritative length of every scene so the base
//! clip, the audio mux, and the final concat all agree on timing.

use kamishibai_project_model::{DurationMode, Scene};

/// Quiet interval inserted before and after narration audio in auto mode,
/// so narration never starts or ends flush against a hard cut.
pub const SILENCE_PAD_SECS: f64 = 1.0;

/// Compute a scene duration from its policy and the narration audio length.
///
/// - No narration: the fixed-seconds value is the bare scene length.
/// - Narration with `Fixed`: fixed-seconds wins; the audio is muxed anyway
///   and truncated by the mux stage's shortest-stream rule.
/// - Narration with `Auto`: audio length plus leading and trailing padding.
pub fn resolve(mode: DurationMode, fixed_seconds: f64, narration_secs: Option<f64>) -> f64 {
    match (narration_secs, mode) {
        (None, _) => fixed_seconds,
        (Some(_), DurationMode::Fixed) => fixed_seconds,
        (Some(audio), DurationMode::Auto) => audio + 2.0 * SILENCE_PAD_SECS,
    }
}

/// Resolve a scene's duration and write it back to the scene, so a later
/// re-resolution (even after a mode switch and back) is idempotent.
pub fn resolve_scene(scene: &mut Scene, narration_secs: Option<f64>) -> f64 {
    let secs = resolve(scene.duration_mode, scene.fixed_seconds, narration_secs);
    scene.resolved_seconds = Some(secs);
    secs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_narration_uses_fixed_seconds() {
        assert_eq!(resolve(DurationMode::Auto, 3.0, None), 3.0);
        assert_eq!(resolve(DurationMode::Fixed, 5.5, None), 5.5);
    }

    #[test]
    fn test_fixed_mode_ignores_audio_length() {
        assert_eq!(resolve(DurationMode::Fixed, 2.0, Some(10.0)), 2.0);
    }

    #[test]
    fn test_auto_mode_pads_audio_both_sides() {
        // 1.40 s of narration resolves to 3.40 s.
        let secs = resolve(DurationMode::Auto, 3.0, Some(1.40));
        assert!((secs - 3.40).abs() < 1e-9);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let mut scene = Scene::new();
        scene.narration_text = "こんにちは".to_string();

        let first = resolve_scene(&mut scene, Some(1.40));
        let second = resolve_scene(&mut scene, Some(1.40));
        assert_eq!(first, second);
        assert_eq!(scene.resolved_seconds, Some(first));

        // A round trip through fixed mode does not poison the auto value.
        scene.duration_mode = DurationMode::Fixed;
        resolve_scene(&mut scene, Some(1.40));
        scene.duration_mode = DurationMode::Auto;
        let third = resolve_scene(&mut scene, Some(1.40));
        assert_eq!(third, first);
    }
}

use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::config::ViewerConfig;
use crate::host::{Fullscreen, SpeechSynth, Utterance, UtteranceId};
use crate::input::{action_for, Key, KeyAction};
use crate::math::ViewTransform;
use crate::state::ViewerState;
use crate::timer::RepeatingTimer;
use crate::tour::{Scene, Tour};

/// Called with the new scene id after every successful scene switch
pub type LocationListener = Box<dyn FnMut(&str)>;

/// Turns user input into [`ViewerState`] changes and hotspot clicks into
/// scene transitions.
///
/// Host capabilities are optional. When one is missing, or refuses a
/// request, the matching toggle does nothing. The controller never
/// reports errors to its host.
pub struct PanoramaController {
    tour: Rc<Tour>,
    config: ViewerConfig,
    state: ViewerState,
    auto_rotate: RepeatingTimer,
    speech: Option<Box<dyn SpeechSynth>>,
    fullscreen: Option<Box<dyn Fullscreen>>,
    on_location_change: Option<LocationListener>,
    last_utterance: u64,
}

impl PanoramaController {
    /// Creates a controller showing the tour's start scene
    ///
    /// `config` is expected to have passed [`ViewerConfig::validate`]. Inverted
    /// zoom bounds do not panic; `zoom_max` wins.
    pub fn new(tour: Rc<Tour>, config: ViewerConfig) -> Self {
        let state = ViewerState::new(tour.start(), config.zoom_default);
        let auto_rotate =
            RepeatingTimer::new(Duration::from_millis(config.auto_rotate_period_ms));
        PanoramaController {
            tour,
            config,
            state,
            auto_rotate,
            speech: None,
            fullscreen: None,
            on_location_change: None,
            last_utterance: 0,
        }
    }

    pub fn with_speech(mut self, speech: Box<dyn SpeechSynth>) -> Self {
        self.speech = Some(speech);
        self
    }

    pub fn with_fullscreen(mut self, fullscreen: Box<dyn Fullscreen>) -> Self {
        self.fullscreen = Some(fullscreen);
        self
    }

    pub fn set_location_listener(&mut self, listener: impl FnMut(&str) + 'static) {
        self.on_location_change = Some(Box::new(listener));
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn current_scene(&self) -> Option<&Scene> {
        self.tour.get(&self.state.scene)
    }

    pub fn view_transform(&self) -> ViewTransform {
        ViewTransform::new(self.state.rotation, self.state.zoom)
    }

    /// Moves to `target`, facing forward at default zoom.
    ///
    /// Unknown targets are ignored and `false` is returned.
    pub fn switch_scene(&mut self, target: &str) -> bool {
        if !self.tour.contains(target) {
            log::debug!("ignoring switch to unknown scene `{target}`");
            return false;
        }

        self.stop_narration();
        self.stop_auto_rotate();
        self.state.scene = target.to_string();
        self.state.reset_view(self.config.zoom_default);
        log::info!("scene changed to `{target}`");

        if let Some(listener) = self.on_location_change.as_mut() {
            listener(target);
        }
        true
    }

    /// Scene chosen from outside the viewer; re-selecting the current scene does nothing
    pub fn select_scene(&mut self, id: &str) -> bool {
        if id == self.state.scene {
            return false;
        }
        self.switch_scene(id)
    }

    pub fn next_scene(&mut self) -> bool {
        self.cycle_scene(1)
    }

    pub fn previous_scene(&mut self) -> bool {
        self.cycle_scene(-1)
    }

    fn cycle_scene(&mut self, step: isize) -> bool {
        let Some(target) = self.tour.cycle(&self.state.scene, step).map(str::to_string) else {
            return false;
        };
        self.switch_scene(&target)
    }

    /// Follows the link of a hotspot on the current scene.
    ///
    /// Returns `false` for informational hotspots and dangling links.
    pub fn activate_hotspot(&mut self, index: usize) -> bool {
        let target = self
            .current_scene()
            .and_then(|scene| scene.hotspots.get(index))
            .and_then(|hotspot| hotspot.target.clone());
        match target {
            Some(target) => self.switch_scene(&target),
            None => false,
        }
    }

    pub fn begin_drag(&mut self, x: f64, y: f64) {
        self.state.drag = Some((x, y));
    }

    pub fn continue_drag(&mut self, x: f64, y: f64) {
        let Some((last_x, _)) = self.state.drag else {
            return;
        };
        self.state.rotate_by((x - last_x) * self.config.drag_sensitivity);
        self.state.drag = Some((x, y));
    }

    pub fn end_drag(&mut self) {
        self.state.drag = None;
    }

    pub fn adjust_rotation(&mut self, delta: f64) {
        self.state.rotate_by(delta);
    }

    pub fn adjust_zoom(&mut self, delta: i32) {
        self.state
            .zoom_by(delta, self.config.zoom_min, self.config.zoom_max);
    }

    pub fn reset_view(&mut self) {
        self.state.reset_view(self.config.zoom_default);
    }

    pub fn toggle_hotspots(&mut self) {
        self.state.show_hotspots = !self.state.show_hotspots;
    }

    /// Keyboard focus; bindings are ignored while inactive
    pub fn set_active(&mut self, active: bool) {
        self.state.active = active;
    }

    pub fn toggle_auto_rotate(&mut self) {
        if self.state.auto_rotate {
            self.stop_auto_rotate();
        } else {
            self.state.auto_rotate = true;
            self.auto_rotate.start(Instant::now());
        }
    }

    fn stop_auto_rotate(&mut self) {
        self.state.auto_rotate = false;
        self.auto_rotate.cancel();
    }

    /// One auto-rotate step
    pub fn tick(&mut self) {
        self.state.rotate_by(self.config.auto_rotate_step);
    }

    /// When the host should call [`PanoramaController::poll`] next
    pub fn next_deadline(&self) -> Option<Instant> {
        self.auto_rotate.deadline()
    }

    /// Applies elapsed auto-rotate ticks and finished narrations.
    ///
    /// Returns `true` when the state changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        let mut changed = false;

        let ticks = self.auto_rotate.due(now);
        for _ in 0..ticks {
            self.tick();
        }
        changed |= ticks > 0;

        if let Some(speech) = self.speech.as_mut() {
            while let Some(id) = speech.poll_finished() {
                if self.state.narration == Some(id) {
                    self.state.narration = None;
                    changed = true;
                } else {
                    log::debug!("ignoring completion of stale utterance {}", id.0);
                }
            }
        }

        changed
    }

    /// Starts reading the current scene aloud, or stops the reading in progress
    pub fn toggle_narration(&mut self) {
        if self.state.narration.is_some() {
            self.stop_narration();
            return;
        }

        let Some(speech) = self.speech.as_mut() else {
            log::debug!("narration requested but speech synthesis is unavailable");
            return;
        };
        let Some(scene) = self.tour.get(&self.state.scene) else {
            return;
        };

        self.last_utterance += 1;
        let utterance = Utterance {
            id: UtteranceId(self.last_utterance),
            text: &scene.narration,
            rate: self.config.speech.rate,
            pitch: self.config.speech.pitch,
            volume: self.config.speech.volume,
        };
        match speech.speak(&utterance) {
            Ok(()) => self.state.narration = Some(utterance.id),
            Err(err) => log::debug!("narration skipped: {err}"),
        }
    }

    fn stop_narration(&mut self) {
        if self.state.narration.take().is_some() {
            if let Some(speech) = self.speech.as_mut() {
                speech.cancel();
            }
        }
    }

    pub fn toggle_fullscreen(&mut self) {
        let Some(host) = self.fullscreen.as_mut() else {
            log::debug!("fullscreen requested but the host cannot provide it");
            return;
        };
        let entering = !self.state.fullscreen;
        let result = if entering { host.enter() } else { host.exit() };
        match result {
            Ok(()) => self.state.fullscreen = entering,
            Err(err) => log::debug!("fullscreen change refused: {err}"),
        }
    }

    /// Applies the key binding for `key`.
    ///
    /// Returns `true` when the key was consumed, in which case the host
    /// should skip its own handling (space must not scroll the page).
    pub fn handle_key(&mut self, key: Key) -> bool {
        if !self.state.active {
            return false;
        }
        let Some(action) = action_for(key) else {
            return false;
        };
        self.perform(action);
        true
    }

    pub fn perform(&mut self, action: KeyAction) {
        let config = &self.config;
        let (key_rotate, key_zoom) = (config.key_rotate_step, config.key_zoom_step);
        let (button_rotate, button_zoom) = (config.button_rotate_step, config.button_zoom_step);

        match action {
            KeyAction::RotateLeft => self.adjust_rotation(-key_rotate),
            KeyAction::RotateRight => self.adjust_rotation(key_rotate),
            KeyAction::ZoomIn => self.adjust_zoom(key_zoom),
            KeyAction::ZoomOut => self.adjust_zoom(-key_zoom),
            KeyAction::NudgeLeft => self.adjust_rotation(-button_rotate),
            KeyAction::NudgeRight => self.adjust_rotation(button_rotate),
            KeyAction::StepZoomIn => self.adjust_zoom(button_zoom),
            KeyAction::StepZoomOut => self.adjust_zoom(-button_zoom),
            KeyAction::ToggleAutoRotate => self.toggle_auto_rotate(),
            KeyAction::ToggleNarration => self.toggle_narration(),
            KeyAction::ToggleFullscreen => self.toggle_fullscreen(),
            KeyAction::ToggleHotspots => self.toggle_hotspots(),
            KeyAction::NextScene => {
                self.next_scene();
            }
            KeyAction::PreviousScene => {
                self.previous_scene();
            }
            KeyAction::ActivateHotspot(index) => {
                self.activate_hotspot(index);
            }
            KeyAction::ResetView => self.reset_view(),
        }
    }

    /// Cancels narration and auto-rotation and leaves fullscreen
    pub fn shutdown(&mut self) {
        self.stop_narration();
        self.stop_auto_rotate();
        if self.state.fullscreen {
            self.toggle_fullscreen();
        }
    }
}

impl Drop for PanoramaController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HostError;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct SpeechLog {
        spoken: Vec<(UtteranceId, String, f32)>,
        cancels: usize,
        finished: VecDeque<UtteranceId>,
        refuse: bool,
    }

    struct FakeSpeech(Rc<RefCell<SpeechLog>>);

    impl SpeechSynth for FakeSpeech {
        fn speak(&mut self, utterance: &Utterance<'_>) -> Result<(), HostError> {
            let mut log = self.0.borrow_mut();
            if log.refuse {
                return Err(HostError::Unavailable("speech synthesis"));
            }
            log.spoken
                .push((utterance.id, utterance.text.to_string(), utterance.rate));
            Ok(())
        }

        fn cancel(&mut self) {
            self.0.borrow_mut().cancels += 1;
        }

        fn poll_finished(&mut self) -> Option<UtteranceId> {
            self.0.borrow_mut().finished.pop_front()
        }
    }

    struct FakeFullscreen {
        calls: Rc<RefCell<Vec<bool>>>,
        accept: bool,
    }

    impl Fullscreen for FakeFullscreen {
        fn enter(&mut self) -> Result<(), HostError> {
            self.calls.borrow_mut().push(true);
            if self.accept {
                Ok(())
            } else {
                Err(HostError::Unavailable("fullscreen"))
            }
        }

        fn exit(&mut self) -> Result<(), HostError> {
            self.calls.borrow_mut().push(false);
            Ok(())
        }
    }

    fn controller() -> PanoramaController {
        PanoramaController::new(Rc::new(Tour::monastery()), ViewerConfig::default())
    }

    fn with_speech() -> (PanoramaController, Rc<RefCell<SpeechLog>>) {
        let log = Rc::new(RefCell::new(SpeechLog::default()));
        let controller = controller().with_speech(Box::new(FakeSpeech(log.clone())));
        (controller, log)
    }

    fn recording(controller: &mut PanoramaController) -> Rc<RefCell<Vec<String>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        controller.set_location_listener(move |id| sink.borrow_mut().push(id.to_string()));
        seen
    }

    #[test]
    fn starts_at_tour_start_facing_forward() {
        let c = controller();
        assert_eq!(c.state().scene(), "main-hall");
        assert_eq!(c.state().rotation(), 0.0);
        assert_eq!(c.state().zoom(), 100);
        assert!(c.state().shows_hotspots());
        assert_eq!(c.current_scene().map(|s| s.name.as_str()), Some("Main Hall"));
    }

    #[test]
    fn rotation_stays_in_range() {
        let mut c = controller();
        let mut delta = 17.0;
        for i in 0..500 {
            delta = (delta * 7.0 + f64::from(i)) % 1000.0 - 500.0;
            c.adjust_rotation(delta);
            let rotation = c.state().rotation();
            assert!((0.0..360.0).contains(&rotation), "{rotation} after {delta}");
        }
    }

    #[test]
    fn rotation_wraps_past_full_turn() {
        let mut c = controller();
        c.adjust_rotation(350.0);
        assert_eq!(c.state().rotation(), 350.0);
        c.adjust_rotation(20.0);
        assert_eq!(c.state().rotation(), 10.0);
        c.adjust_rotation(-15.0);
        assert_eq!(c.state().rotation(), 355.0);
    }

    #[test]
    fn zoom_stays_in_range() {
        let mut c = controller();
        for delta in [30, 45, -200, 10, 500, -7, -60, 90, -1000, 20] {
            c.adjust_zoom(delta);
            assert!((50..=200).contains(&c.state().zoom()));
        }
    }

    #[test]
    fn zoom_clamps_at_maximum() {
        let mut c = controller();
        c.adjust_zoom(90);
        assert_eq!(c.state().zoom(), 190);
        c.adjust_zoom(20);
        assert_eq!(c.state().zoom(), 200);
    }

    #[test]
    fn valid_switch_resets_view_and_notifies_once() {
        let mut c = controller();
        let seen = recording(&mut c);
        c.adjust_rotation(42.0);
        c.adjust_zoom(30);

        assert!(c.switch_scene("ancient-library"));
        assert_eq!(c.state().scene(), "ancient-library");
        assert_eq!(c.state().rotation(), 0.0);
        assert_eq!(c.state().zoom(), 100);
        assert_eq!(*seen.borrow(), ["ancient-library"]);
    }

    #[test]
    fn invalid_switch_changes_nothing() {
        let mut c = controller();
        let seen = recording(&mut c);
        c.adjust_rotation(42.0);
        let before = c.state().clone();

        assert!(!c.switch_scene("crypt"));
        assert_eq!(c.state(), &before);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn hotspot_navigates_to_its_target() {
        let mut c = controller();
        let seen = recording(&mut c);
        c.adjust_rotation(120.0);
        c.adjust_zoom(-30);

        // "Stone Pillars" on the main hall
        assert!(c.activate_hotspot(1));
        assert_eq!(c.state().scene(), "sacred-chapel");
        assert_eq!(c.state().rotation(), 0.0);
        assert_eq!(c.state().zoom(), 100);
        assert_eq!(*seen.borrow(), ["sacred-chapel"]);
    }

    #[test]
    fn informational_and_missing_hotspots_do_not_navigate() {
        let mut c = controller();
        let seen = recording(&mut c);
        assert!(!c.activate_hotspot(0));
        assert!(!c.activate_hotspot(99));
        assert_eq!(c.state().scene(), "main-hall");
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn dangling_hotspot_is_ignored() {
        let mut tour = Tour::monastery().scenes().to_vec();
        tour[0].hotspots[1].target = Some("bell-tower".into());
        let tour = Tour::new(None, tour).unwrap();
        let mut c = PanoramaController::new(Rc::new(tour), ViewerConfig::default());
        let seen = recording(&mut c);

        assert!(!c.activate_hotspot(1));
        assert_eq!(c.state().scene(), "main-hall");
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn select_scene_skips_current_scene() {
        let mut c = controller();
        let seen = recording(&mut c);
        assert!(!c.select_scene("main-hall"));
        assert!(!c.select_scene("crypt"));
        assert!(c.select_scene("peaceful-garden"));
        assert_eq!(*seen.borrow(), ["peaceful-garden"]);
    }

    #[test]
    fn scene_selector_cycles() {
        let mut c = controller();
        assert!(c.previous_scene());
        assert_eq!(c.state().scene(), "peaceful-garden");
        assert!(c.next_scene());
        assert!(c.next_scene());
        assert_eq!(c.state().scene(), "sacred-chapel");
    }

    #[test]
    fn drag_rotates_by_half_the_horizontal_delta() {
        let mut c = controller();
        c.begin_drag(100.0, 50.0);
        assert!(c.state().is_dragging());
        c.continue_drag(140.0, 80.0);
        assert_eq!(c.state().rotation(), 20.0);
        c.continue_drag(80.0, 80.0);
        assert_eq!(c.state().rotation(), 350.0);
        c.end_drag();
        assert!(!c.state().is_dragging());
        c.continue_drag(400.0, 0.0);
        assert_eq!(c.state().rotation(), 350.0);
    }

    #[test]
    fn drag_without_begin_is_ignored() {
        let mut c = controller();
        c.continue_drag(300.0, 10.0);
        assert_eq!(c.state().rotation(), 0.0);
        assert!(!c.state().is_dragging());
    }

    #[test]
    fn auto_rotate_adds_one_degree_per_tick() {
        let mut c = controller();
        c.adjust_rotation(355.0);
        c.toggle_auto_rotate();
        assert!(c.state().is_auto_rotating());

        let first = c.next_deadline().unwrap();
        let period = Duration::from_millis(50);
        assert!(c.poll(first + period * 9));
        assert_eq!(c.state().rotation(), 5.0);

        c.toggle_auto_rotate();
        assert!(!c.state().is_auto_rotating());
        assert_eq!(c.next_deadline(), None);
        assert!(!c.poll(first + period * 100));
        assert_eq!(c.state().rotation(), 5.0);
    }

    #[test]
    fn manual_ticks_wrap() {
        let mut c = controller();
        c.adjust_rotation(359.0);
        c.tick();
        assert_eq!(c.state().rotation(), 0.0);
    }

    #[test]
    fn switching_scene_cancels_auto_rotate_and_narration() {
        let (mut c, log) = with_speech();
        c.toggle_auto_rotate();
        c.toggle_narration();
        assert!(c.state().is_narrating());

        assert!(c.switch_scene("sacred-chapel"));
        assert!(!c.state().is_auto_rotating());
        assert_eq!(c.next_deadline(), None);
        assert!(!c.state().is_narrating());
        assert_eq!(log.borrow().cancels, 1);
    }

    #[test]
    fn narration_reads_current_scene() {
        let (mut c, log) = with_speech();
        c.switch_scene("ancient-library");
        c.toggle_narration();

        let expected = c.current_scene().unwrap().narration.clone();
        let spoken = &log.borrow().spoken;
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].1, expected);
        assert_eq!(spoken[0].2, 0.8);
    }

    #[test]
    fn narration_toggles_off_with_cancel() {
        let (mut c, log) = with_speech();
        c.toggle_narration();
        c.toggle_narration();
        assert!(!c.state().is_narrating());
        assert_eq!(log.borrow().cancels, 1);
    }

    #[test]
    fn completion_clears_narration() {
        let (mut c, log) = with_speech();
        c.toggle_narration();
        let id = log.borrow().spoken[0].0;
        log.borrow_mut().finished.push_back(id);
        assert!(c.poll(Instant::now()));
        assert!(!c.state().is_narrating());
    }

    #[test]
    fn stale_completion_is_ignored() {
        let (mut c, log) = with_speech();
        c.toggle_narration();
        c.toggle_narration();
        c.toggle_narration();
        let (first, second) = {
            let log = log.borrow();
            (log.spoken[0].0, log.spoken[1].0)
        };
        assert_ne!(first, second);

        log.borrow_mut().finished.push_back(first);
        assert!(!c.poll(Instant::now()));
        assert!(c.state().is_narrating());

        log.borrow_mut().finished.push_back(second);
        assert!(c.poll(Instant::now()));
        assert!(!c.state().is_narrating());
    }

    #[test]
    fn narration_without_speech_is_a_no_op() {
        let mut c = controller();
        c.toggle_narration();
        assert!(!c.state().is_narrating());

        let (mut c, log) = with_speech();
        log.borrow_mut().refuse = true;
        c.toggle_narration();
        assert!(!c.state().is_narrating());
    }

    #[test]
    fn fullscreen_follows_host_answer() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut c = controller().with_fullscreen(Box::new(FakeFullscreen {
            calls: calls.clone(),
            accept: true,
        }));
        c.toggle_fullscreen();
        assert!(c.state().is_fullscreen());
        c.toggle_fullscreen();
        assert!(!c.state().is_fullscreen());
        assert_eq!(*calls.borrow(), [true, false]);

        let mut refused = controller().with_fullscreen(Box::new(FakeFullscreen {
            calls: Rc::new(RefCell::new(Vec::new())),
            accept: false,
        }));
        refused.toggle_fullscreen();
        assert!(!refused.state().is_fullscreen());

        let mut absent = controller();
        absent.toggle_fullscreen();
        assert!(!absent.state().is_fullscreen());
    }

    #[test]
    fn key_bindings_apply_only_while_active() {
        let (mut c, _log) = with_speech();
        assert!(c.handle_key(Key::Right));
        assert!(c.handle_key(Key::Right));
        assert!(c.handle_key(Key::Left));
        assert_eq!(c.state().rotation(), 5.0);
        assert!(c.handle_key(Key::Up));
        assert_eq!(c.state().zoom(), 110);
        assert!(c.handle_key(Key::Down));
        assert!(c.handle_key(Key::Down));
        assert_eq!(c.state().zoom(), 90);
        assert!(c.handle_key(Key::Space));
        assert!(c.state().is_auto_rotating());
        assert!(c.handle_key(Key::Char('v')));
        assert!(c.state().is_narrating());
        assert!(!c.handle_key(Key::Char('x')));

        c.set_active(false);
        assert!(!c.handle_key(Key::Right));
        assert!(!c.handle_key(Key::Space));
        assert_eq!(c.state().rotation(), 5.0);
        assert!(c.state().is_auto_rotating());
    }

    #[test]
    fn button_steps_and_reset() {
        let mut c = controller();
        c.perform(KeyAction::NudgeLeft);
        assert_eq!(c.state().rotation(), 345.0);
        c.perform(KeyAction::StepZoomIn);
        assert_eq!(c.state().zoom(), 120);
        c.perform(KeyAction::ResetView);
        assert_eq!(c.state().rotation(), 0.0);
        assert_eq!(c.state().zoom(), 100);
    }

    #[test]
    fn shutdown_stops_timer_and_leaves_fullscreen() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut c = controller().with_fullscreen(Box::new(FakeFullscreen {
            calls: calls.clone(),
            accept: true,
        }));
        c.adjust_rotation(30.0);
        c.toggle_auto_rotate();
        c.toggle_fullscreen();
        assert!(c.next_deadline().is_some());

        c.shutdown();
        assert_eq!(c.next_deadline(), None);
        assert!(!c.state().is_auto_rotating());
        assert!(!c.state().is_fullscreen());
        assert_eq!(*calls.borrow(), [true, false]);

        assert!(!c.poll(Instant::now() + Duration::from_secs(60)));
        assert_eq!(c.state().rotation(), 30.0);

        drop(c);
        assert_eq!(*calls.borrow(), [true, false]);
    }

    #[test]
    fn inverted_zoom_bounds_do_not_panic() {
        let config = ViewerConfig {
            zoom_min: 150,
            zoom_max: 80,
            ..ViewerConfig::default()
        };
        let mut c = PanoramaController::new(Rc::new(Tour::monastery()), config);
        c.adjust_zoom(500);
        assert_eq!(c.state().zoom(), 80);
        c.adjust_zoom(-500);
        assert_eq!(c.state().zoom(), 80);
    }

    #[test]
    fn drop_cancels_pending_speech() {
        let (mut c, log) = with_speech();
        c.toggle_narration();
        drop(c);
        assert_eq!(log.borrow().cancels, 1);
    }
}

use crate::controller::PanoramaController;
use crate::graphics::{
    draw_hotspot, draw_panorama, draw_tooltip, hotspot_cell, Canvas, Rect, Skyline,
    CELL_HEIGHT_PX, CELL_WIDTH_PX,
};
use crate::input::{Key, KeyAction};
use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::style::Color;
use std::io::{self, Write};
use std::time::{Duration, Instant};

/// Longest wait between polls, so finished narrations are noticed promptly
const IDLE_POLL: Duration = Duration::from_millis(100);

/// Whether the event loop should keep going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Clickable element of the overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Hotspot(usize),
    Button(KeyAction),
    Narration,
    Fullscreen,
}

/// Terminal view of a panorama controller
pub struct PanoramaWidget {
    controller: PanoramaController,
    canvas: Canvas,
    /// Clickable regions from the last paint
    regions: Vec<(Rect, Target)>,
    hovered: Option<usize>,
    /// Informational hotspot whose tooltip stays open
    pinned: Option<usize>,
    debug: bool,
    dirty: bool,
    frames_since_last_update: usize,
    last_fps_calculation: Instant,
    fps: f64,
}

impl PanoramaWidget {
    pub fn new(controller: PanoramaController, width: u16, height: u16) -> Self {
        PanoramaWidget {
            controller,
            canvas: Canvas::new(width, height),
            regions: Vec::new(),
            hovered: None,
            pinned: None,
            debug: false,
            dirty: true,
            frames_since_last_update: 0,
            last_fps_calculation: Instant::now(),
            fps: 0.0,
        }
    }

    /// How long the event loop may block waiting for input
    pub fn poll_timeout(&self, now: Instant) -> Duration {
        match self.controller.next_deadline() {
            Some(deadline) => deadline.saturating_duration_since(now).min(IDLE_POLL),
            None => IDLE_POLL,
        }
    }

    /// Advances timers and picks up finished narrations
    pub fn update(&mut self, now: Instant) {
        if self.controller.poll(now) {
            self.dirty = true;
        }
    }

    /// Handle a terminal event
    pub fn event(&mut self, event: &Event) -> Flow {
        match event {
            Event::Key(key_event) => return self.key(key_event),
            Event::Mouse(mouse_event) => self.mouse(mouse_event),
            Event::FocusGained => self.controller.set_active(true),
            Event::FocusLost => {
                self.controller.set_active(false);
                self.controller.end_drag();
            }
            Event::Resize(width, height) => self.canvas.resize(*width, *height),
            _ => return Flow::Continue,
        }
        self.dirty = true;
        Flow::Continue
    }

    fn key(&mut self, key_event: &KeyEvent) -> Flow {
        if key_event.modifiers.contains(KeyModifiers::CONTROL)
            && key_event.code == KeyCode::Char('c')
        {
            return Flow::Quit;
        }
        let Some(key) = Key::from_event(key_event) else {
            return Flow::Continue;
        };
        match key {
            Key::Esc | Key::Char('q' | 'Q') => return Flow::Quit,
            Key::Char('d' | 'D') => self.debug = !self.debug,
            _ => {
                let scene = self.controller.state().scene().to_string();
                if !self.controller.handle_key(key) {
                    return Flow::Continue;
                }
                if self.controller.state().scene() != scene {
                    self.pinned = None;
                    self.hovered = None;
                }
            }
        }
        self.dirty = true;
        Flow::Continue
    }

    fn mouse(&mut self, mouse_event: &MouseEvent) {
        let (col, row) = (mouse_event.column, mouse_event.row);
        // Pointer position in pixels, at the centre of the cell
        let x = (f64::from(col) + 0.5) * CELL_WIDTH_PX;
        let y = (f64::from(row) + 0.5) * CELL_HEIGHT_PX;
        let zoom_step = self.controller.config().key_zoom_step;

        match mouse_event.kind {
            MouseEventKind::Down(MouseButton::Left) => match self.target_at(col, row) {
                Some(target) => self.click(target),
                None => {
                    self.pinned = None;
                    self.controller.begin_drag(x, y);
                }
            },
            MouseEventKind::Drag(MouseButton::Left) => self.controller.continue_drag(x, y),
            MouseEventKind::Up(MouseButton::Left) => self.controller.end_drag(),
            MouseEventKind::Moved => {
                self.hovered = match self.target_at(col, row) {
                    Some(Target::Hotspot(index)) => Some(index),
                    _ => None,
                };
            }
            MouseEventKind::ScrollUp => self.controller.adjust_zoom(zoom_step),
            MouseEventKind::ScrollDown => self.controller.adjust_zoom(-zoom_step),
            _ => {}
        }
    }

    fn target_at(&self, col: u16, row: u16) -> Option<Target> {
        self.regions
            .iter()
            .rev()
            .find(|(rect, _)| rect.contains(col, row))
            .map(|&(_, target)| target)
    }

    fn click(&mut self, target: Target) {
        match target {
            Target::Hotspot(index) => {
                if self.controller.activate_hotspot(index) {
                    self.pinned = None;
                    self.hovered = None;
                } else {
                    self.pinned = Some(index);
                }
            }
            Target::Button(action) => {
                self.controller.perform(action);
                if matches!(action, KeyAction::NextScene | KeyAction::PreviousScene) {
                    self.pinned = None;
                    self.hovered = None;
                }
            }
            Target::Narration => self.controller.toggle_narration(),
            Target::Fullscreen => self.controller.toggle_fullscreen(),
        }
    }

    /// Area the panorama occupies: the whole canvas in fullscreen, an inset frame otherwise
    fn viewport(&self) -> Rect {
        let bounds = self.canvas.bounds();
        if self.controller.state().is_fullscreen() {
            bounds
        } else {
            bounds.inset((bounds.width / 12).max(1), (bounds.height / 10).max(1))
        }
    }

    /// Paint the viewer if anything changed since the last paint
    pub fn paint(&mut self, out: &mut impl Write) -> io::Result<()> {
        if !self.dirty {
            return Ok(());
        }
        self.dirty = false;

        // Update FPS calculation
        self.frames_since_last_update += 1;
        let now = Instant::now();
        let duration = now.duration_since(self.last_fps_calculation);
        if duration.as_secs_f64() >= 1.0 {
            self.fps = self.frames_since_last_update as f64 / duration.as_secs_f64();
            self.frames_since_last_update = 0;
            self.last_fps_calculation = now;
        }

        self.render();
        self.canvas.flush(out)
    }

    /// Draws the current state into the canvas and records clickable regions
    fn render(&mut self) {
        self.canvas.clear();
        self.regions.clear();

        let view = self.viewport();
        if view.width < 20 || view.height < 8 {
            self.canvas
                .draw_text(0, 0, "Terminal too small", Color::White, Color::Reset, true);
            return;
        }
        if !self.controller.state().is_fullscreen() {
            self.canvas.draw_frame(view, Color::DarkGrey);
        }

        let transform = self.controller.view_transform();
        let Some(scene) = self.controller.current_scene().cloned() else {
            return;
        };
        draw_panorama(&mut self.canvas, view, &Skyline::for_image(&scene.image), &transform);

        // Hotspots
        let state = self.controller.state().clone();
        let mut tooltip = None;
        if state.shows_hotspots() {
            for (index, hotspot) in scene.hotspots.iter().enumerate() {
                let Some((col, row)) = hotspot_cell(view, hotspot, &transform) else {
                    continue;
                };
                draw_hotspot(&mut self.canvas, col, row, index, hotspot);
                self.regions.push((Rect::new(col, row, 2, 1), Target::Hotspot(index)));
                if self.hovered == Some(index) || self.pinned == Some(index) {
                    tooltip = Some((col, row, hotspot));
                }
            }
        }

        // Top bar
        let bar = Color::Rgb { r: 0, g: 0, b: 0 };
        let title = format!(" {} - Current view ", scene.name);
        self.canvas
            .draw_text(view.x + 1, view.y, &title, Color::White, bar, true);
        let fullscreen_label = if state.is_fullscreen() { "[minimize]" } else { "[fullscreen]" };
        let voice_label = if state.is_narrating() { "[voice ■]" } else { "[voice ▶]" };
        let right = view.right().saturating_sub(1);
        let fullscreen_x = right.saturating_sub(fullscreen_label.chars().count() as u16);
        let voice_x = fullscreen_x.saturating_sub(voice_label.chars().count() as u16 + 1);
        self.button(voice_x, view.y, voice_label, Target::Narration, state.is_narrating());
        self.button(fullscreen_x, view.y, fullscreen_label, Target::Fullscreen, false);

        // Scene selector
        let selector_row = view.bottom() - 3;
        let mut x = self.button(
            view.x + 1,
            selector_row,
            "[<]",
            Target::Button(KeyAction::PreviousScene),
            false,
        );
        x = self
            .canvas
            .draw_text(x + 1, selector_row, &scene.name, Color::White, bar, false);
        self.button(x + 1, selector_row, "[>]", Target::Button(KeyAction::NextScene), false);

        // Rotation and zoom controls
        let controls_row = view.bottom() - 2;
        let auto_label = if state.is_auto_rotating() { "[pause]" } else { "[play]" };
        let mut x = view.x + 1;
        x = self.button(x, controls_row, "[<-]", Target::Button(KeyAction::NudgeLeft), false) + 1;
        x = self.button(
            x,
            controls_row,
            auto_label,
            Target::Button(KeyAction::ToggleAutoRotate),
            state.is_auto_rotating(),
        ) + 1;
        x = self.button(x, controls_row, "[->]", Target::Button(KeyAction::NudgeRight), false) + 3;
        x = self.button(x, controls_row, "[-]", Target::Button(KeyAction::StepZoomOut), false) + 1;
        x = self
            .canvas
            .draw_text(x, controls_row, &format!("{}%", state.zoom()), Color::White, bar, false)
            + 1;
        self.button(x, controls_row, "[+]", Target::Button(KeyAction::StepZoomIn), false);

        let direction = format!(" Direction: {}° ", state.rotation().round() as i64 % 360);
        let direction_x =
            view.x + (view.width.saturating_sub(direction.chars().count() as u16)) / 2;
        self.canvas
            .draw_text(direction_x.max(x + 5), controls_row, &direction, Color::White, bar, false);

        // Help text
        let help = "Drag to rotate · Arrow keys to navigate · Space to auto-rotate \
                    · V for voice guide · Q to quit";
        let help: String = help.chars().take(usize::from(view.width - 2)).collect();
        self.canvas
            .draw_text(view.x + 1, view.bottom() - 1, &help, Color::Grey, Color::Reset, false);

        if let Some((col, row, hotspot)) = tooltip {
            draw_tooltip(&mut self.canvas, view, col, row, hotspot);
        }

        // Add debug info if debug mode is enabled
        if self.debug {
            let lines = [
                format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
                format!("Scene: {}", state.scene()),
                format!("Rotation: {:.2}", state.rotation()),
                format!("Zoom: {}%", state.zoom()),
                format!("FPS: {:.2}", self.fps),
                format!("Focused: {}", state.is_active()),
                format!("Dragging: {}", state.is_dragging()),
            ];
            for (i, line) in lines.iter().enumerate() {
                self.canvas
                    .draw_text(view.x + 1, view.y + 2 + i as u16, line, Color::Green, bar, false);
            }
        }
    }

    /// Draws a clickable label and returns the column after it
    fn button(&mut self, x: u16, y: u16, label: &str, target: Target, lit: bool) -> u16 {
        let (fg, bg) = if lit {
            (Color::Black, Color::Yellow)
        } else {
            (Color::White, Color::Rgb { r: 0, g: 0, b: 0 })
        };
        let end = self.canvas.draw_text(x, y, label, fg, bg, lit);
        self.regions
            .push((Rect::new(x, y, end.saturating_sub(x), 1), target));
        end
    }
}

//! Canvas2D backend and requestAnimationFrame render loop (wasm only)

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Affine2, Vec2};
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use super::{Surface, render_frame};
use crate::scene::{Rgb, Scene};

/// Canvas2D paint surface with a centered, y-up world coordinate system
pub struct CanvasSurface {
    ctx: CanvasRenderingContext2d,
    width: f32,
    height: f32,
    /// device = translate(center) * flip-y, applied in front of every world
    /// transform
    base: Affine2,
    current: Affine2,
}

impl CanvasSurface {
    pub fn new(canvas: &HtmlCanvasElement) -> Option<Self> {
        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")
            .ok()??
            .dyn_into()
            .ok()?;
        let width = canvas.width() as f32;
        let height = canvas.height() as f32;
        let base = Affine2::from_translation(Vec2::new(width / 2.0, height / 2.0))
            * Affine2::from_scale(Vec2::new(1.0, -1.0));
        Some(Self {
            ctx,
            width,
            height,
            base,
            current: Affine2::IDENTITY,
        })
    }

    fn apply(&self, m: Affine2) {
        let _ = self.ctx.set_transform(
            m.matrix2.x_axis.x as f64,
            m.matrix2.x_axis.y as f64,
            m.matrix2.y_axis.x as f64,
            m.matrix2.y_axis.y as f64,
            m.translation.x as f64,
            m.translation.y as f64,
        );
    }
}

impl Surface for CanvasSurface {
    fn begin_frame(&mut self) {
        let _ = self.ctx.reset_transform();
        self.ctx
            .clear_rect(0.0, 0.0, self.width as f64, self.height as f64);
    }

    fn set_transform(&mut self, world: Affine2) {
        self.current = self.base * world;
        self.apply(self.current);
    }

    fn fill_rect(&mut self, center: Vec2, size: Vec2, color: Rgb) {
        self.ctx.set_fill_style_str(&color.css());
        self.ctx.fill_rect(
            (center.x - size.x / 2.0) as f64,
            (center.y - size.y / 2.0) as f64,
            size.x as f64,
            size.y as f64,
        );
    }

    fn stroke_rect(&mut self, center: Vec2, size: Vec2, color: Rgb, line_width: f32) {
        self.ctx.set_stroke_style_str(&color.css());
        self.ctx.set_line_width(line_width as f64);
        self.ctx.stroke_rect(
            (center.x - size.x / 2.0) as f64,
            (center.y - size.y / 2.0) as f64,
            size.x as f64,
            size.y as f64,
        );
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Rgb) {
        self.ctx.begin_path();
        let _ = self.ctx.arc(
            center.x as f64,
            center.y as f64,
            radius as f64,
            0.0,
            std::f64::consts::TAU,
        );
        self.ctx.set_fill_style_str(&color.css());
        self.ctx.fill();
    }

    fn stroke_circle(&mut self, center: Vec2, radius: f32, color: Rgb, line_width: f32) {
        self.ctx.begin_path();
        let _ = self.ctx.arc(
            center.x as f64,
            center.y as f64,
            radius as f64,
            0.0,
            std::f64::consts::TAU,
        );
        self.ctx.set_stroke_style_str(&color.css());
        self.ctx.set_line_width(line_width as f64);
        self.ctx.stroke();
    }

    fn fill_text(&mut self, text: &str, origin: Vec2, size_px: f32, color: Rgb) {
        // the base transform flips y for world space; un-flip so glyphs
        // render upright
        let unflipped = self.current * Affine2::from_scale(Vec2::new(1.0, -1.0));
        self.apply(unflipped);
        self.ctx.set_fill_style_str(&color.css());
        self.ctx.set_font(&format!("bold {}px monospace", size_px as u32));
        self.ctx.set_text_align("center");
        let _ = self
            .ctx
            .fill_text(text, origin.x as f64, (-origin.y) as f64);
        self.apply(self.current);
    }
}

/// Continuous render loop over a shared scene. Starting twice is a no-op;
/// once stopped, create a new loop rather than restarting.
pub struct RenderLoop {
    scene: Rc<RefCell<Scene>>,
    surface: Rc<RefCell<CanvasSurface>>,
    running: Rc<std::cell::Cell<bool>>,
}

impl RenderLoop {
    pub fn new(scene: Rc<RefCell<Scene>>, surface: CanvasSurface) -> Self {
        Self {
            scene,
            surface: Rc::new(RefCell::new(surface)),
            running: Rc::new(std::cell::Cell::new(false)),
        }
    }

    pub fn start(&self) {
        if self.running.get() {
            return;
        }
        self.running.set(true);
        schedule_frame(
            self.scene.clone(),
            self.surface.clone(),
            self.running.clone(),
        );
    }

    pub fn stop(&self) {
        self.running.set(false);
    }
}

fn schedule_frame(
    scene: Rc<RefCell<Scene>>,
    surface: Rc<RefCell<CanvasSurface>>,
    running: Rc<std::cell::Cell<bool>>,
) {
    let window = web_sys::window().expect("no window");
    let closure = Closure::once(move |_time: f64| {
        if !running.get() {
            return;
        }
        render_frame(&scene.borrow(), &mut *surface.borrow_mut());
        schedule_frame(scene, surface, running);
    });
    let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
    closure.forget();
}

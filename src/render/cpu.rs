use crate::foundation::core::{Canvas, Point, Rect, Rgba8};
use crate::foundation::error::{RecapError, RecapResult};
use crate::foundation::math::blend_channel;
use crate::render::backend::{FrameRGBA, Rasterizer};
use crate::render::palette::Palette;
use crate::replay::model::{AgentState, ReplaySample};
use crate::timeline::schedule::{BattleFrame, FrameDescriptor, FrameKind, IntroCard, OutroCard};
use image::RgbaImage;
use std::sync::Arc;

const REFERENCE_WIDTH: f64 = 1280.0;
const REFERENCE_HEIGHT: f64 = 720.0;

/// Options for [`SchematicRasterizer`].
#[derive(Clone, Debug)]
pub struct CpuRasterOpts {
    pub canvas: Canvas,
    /// Side length of the square arena in game units, centered on the origin.
    pub arena_size: f64,
}

impl Default for CpuRasterOpts {
    fn default() -> Self {
        Self {
            canvas: Canvas::default(),
            arena_size: 40.0,
        }
    }
}

/// Deterministic CPU rasterizer drawing the arena, agents and overlays as flat shapes.
///
/// Layout is authored against a 1280x720 reference and scaled to the configured canvas. Text is
/// not drawn; captions and titles are shown as bars sized to their content.
pub struct SchematicRasterizer {
    opts: CpuRasterOpts,
    palette: Arc<Palette>,
    sx: f64,
    sy: f64,
    arena: Rect,
    arena_bg: RgbaImage,
    intro_bg: RgbaImage,
    outro_bg: RgbaImage,
}

impl SchematicRasterizer {
    pub fn new(opts: CpuRasterOpts, palette: Arc<Palette>) -> RecapResult<Self> {
        opts.canvas.validate()?;
        if opts.arena_size.is_nan() || opts.arena_size <= 0.0 {
            return Err(RecapError::validation("arena_size must be > 0"));
        }
        let (w, h) = (opts.canvas.width, opts.canvas.height);
        let sx = f64::from(w) / REFERENCE_WIDTH;
        let sy = f64::from(h) / REFERENCE_HEIGHT;
        let arena = Rect::new(
            80.0 * sx,
            80.0 * sy,
            f64::from(w) - 80.0 * sx,
            f64::from(h) - 160.0 * sy,
        );

        let mut arena_bg = gradient(w, h, Rgba8::rgb(5, 0, 20), Rgba8::rgb(15, 5, 40));
        draw_arena_floor(&mut arena_bg, arena);
        let intro_bg = gradient(w, h, Rgba8::rgb(3, 0, 20), Rgba8::rgb(13, 5, 50));
        let outro_bg = gradient(w, h, Rgba8::rgb(5, 3, 25), Rgba8::rgb(20, 11, 65));

        Ok(Self {
            opts,
            palette,
            sx,
            sy,
            arena,
            arena_bg,
            intro_bg,
            outro_bg,
        })
    }

    fn rect(&self, x0: f64, y0: f64, x1: f64, y1: f64) -> Rect {
        Rect::new(x0 * self.sx, y0 * self.sy, x1 * self.sx, y1 * self.sy)
    }

    fn pt(&self, x: f64, y: f64) -> Point {
        Point::new(x * self.sx, y * self.sy)
    }

    fn scaled(&self, v: f64) -> f64 {
        v * self.sx.min(self.sy)
    }

    fn world_to_screen(&self, x: f64, z: f64) -> Point {
        let half = self.opts.arena_size / 2.0;
        Point::new(
            self.arena.x0 + (x + half) / self.opts.arena_size * self.arena.width(),
            self.arena.y0 + (z + half) / self.opts.arena_size * self.arena.height(),
        )
    }

    fn draw_battle(&self, img: &mut RgbaImage, desc: &FrameDescriptor<'_>, b: &BattleFrame<'_>) {
        let w = REFERENCE_WIDTH;
        let h = REFERENCE_HEIGHT;

        // Header and sample progress.
        fill_rect(img, self.rect(0.0, 0.0, w, 60.0), Rgba8::rgba(5, 5, 25, 220));
        fill_rect(img, self.rect(0.0, 60.0, w, 61.0), Rgba8::rgba(0, 200, 255, 100));
        let sample_progress = b.sample_index as f64 / b.sample_count.saturating_sub(1).max(1) as f64;
        fill_rect(img, self.rect(20.0, 56.0, w - 20.0, 60.0), Rgba8::rgba(20, 40, 60, 200));
        fill_rect(
            img,
            self.rect(20.0, 56.0, 20.0 + (w - 40.0) * sample_progress, 60.0),
            Rgba8::rgba(0, 200, 255, 200),
        );

        if b.kill_flash > 0 {
            fill_rect(
                img,
                self.rect(0.0, 0.0, w, h),
                self.palette.kill_flash.with_alpha(b.kill_flash),
            );
        }

        for proj in &b.sample.projectiles {
            let p = self.world_to_screen(proj.x, proj.z);
            let color = self.palette.weapon_color(&proj.weapon);
            for r in (2..=6).rev() {
                let alpha = 30 + (6 - r) * 20;
                fill_circle(img, p, self.scaled(f64::from(r)), color.with_alpha(alpha as u8));
            }
            fill_circle(img, p, self.scaled(2.0), color);
        }

        for agent in &b.sample.agents {
            self.draw_agent(img, agent);
        }

        self.draw_scorecards(img, b.sample);

        if !b.decisions.is_empty() {
            let top = h - 155.0;
            fill_rect(img, self.rect(0.0, top - 5.0, w - 225.0, h - 5.0), Rgba8::rgba(5, 10, 30, 200));
            fill_rect(img, self.rect(0.0, top - 5.0, w - 225.0, top - 4.0), Rgba8::rgba(0, 200, 255, 80));
            for (i, decision) in b.decisions.iter().enumerate() {
                let y = top + 18.0 + i as f64 * 36.0;
                let color = b
                    .sample
                    .agents
                    .iter()
                    .find(|a| a.name == decision.actor)
                    .map(|a| self.palette.agent_color(&a.name, a.color.as_deref()))
                    .unwrap_or(Rgba8::rgb(255, 255, 255));
                let name_w = 8.0 * decision.actor.chars().count() as f64;
                fill_rect(img, self.rect(15.0, y, 15.0 + name_w, y + 12.0), color);
                let caption_w = 7.0 * decision.caption().chars().count() as f64;
                fill_rect(
                    img,
                    self.rect(15.0, y + 16.0, (15.0 + caption_w).min(w - 240.0), y + 28.0),
                    Rgba8::rgba(200, 220, 255, 200),
                );
            }
        }

        if let Some(hl) = b.highlight {
            let banner = self.rect(w / 2.0 - 250.0, h / 2.0 - 60.0, w / 2.0 + 250.0, h / 2.0 + 40.0);
            fill_rect(img, banner, self.palette.banner_color(hl.kind));
            stroke_rect(img, banner, self.scaled(2.0), Rgba8::rgba(255, 255, 255, 180));
            let title_w = (18.0 * hl.title.chars().count() as f64).min(460.0);
            fill_rect(
                img,
                self.rect(w / 2.0 - title_w / 2.0, h / 2.0 - 48.0, w / 2.0 + title_w / 2.0, h / 2.0 - 14.0),
                Rgba8::rgb(255, 255, 255),
            );
            let desc_w = (8.0 * hl.description.chars().count() as f64).min(460.0);
            fill_rect(
                img,
                self.rect(w / 2.0 - desc_w / 2.0, h / 2.0 + 4.0, w / 2.0 + desc_w / 2.0, h / 2.0 + 20.0),
                Rgba8::rgba(255, 255, 255, 220),
            );
        }

        // Footer with overall playback progress.
        fill_rect(img, self.rect(0.0, h - 30.0, w, h), Rgba8::rgba(5, 5, 25, 200));
        fill_rect(
            img,
            self.rect(0.0, h - 3.0, w * desc.progress(), h),
            Rgba8::rgba(100, 150, 200, 180),
        );
    }

    fn draw_agent(&self, img: &mut RgbaImage, agent: &AgentState) {
        let p = self.world_to_screen(agent.x, agent.z);
        let color = self.palette.agent_color(&agent.name, agent.color.as_deref());
        let r10 = self.scaled(10.0);

        if !agent.is_alive {
            let grey = Rgba8::rgba(100, 100, 100, 180);
            let d = Point::new(r10, r10);
            draw_line(img, p - d.to_vec2(), p + d.to_vec2(), self.scaled(2.0), grey);
            let e = Point::new(r10, -r10);
            draw_line(img, p - e.to_vec2(), p + e.to_vec2(), self.scaled(2.0), grey);
            return;
        }

        let reach = self.scaled(18.0);
        let tip = Point::new(p.x + agent.rotation.cos() * reach, p.y + agent.rotation.sin() * reach);
        draw_line(img, p, tip, self.scaled(2.0), color.with_alpha(180));

        for r in (9..=20).rev().step_by(3) {
            let alpha = 80u32.saturating_sub((r - 8) * 8);
            fill_circle(img, p, self.scaled(f64::from(r)), color.with_alpha(alpha as u8));
        }
        fill_circle(img, p, r10 + self.scaled(2.0), Rgba8::rgba(255, 255, 255, 200));
        fill_circle(img, p, r10, color.with_alpha(220));
        fill_circle(img, p, self.scaled(4.0), self.palette.weapon_color(&agent.weapon));

        let ratio = agent.health_ratio();
        let bar = Rect::new(p.x - self.scaled(20.0), p.y + self.scaled(14.0), p.x + self.scaled(20.0), p.y + self.scaled(18.0));
        fill_rect(img, bar, Rgba8::rgba(40, 40, 40, 180));
        fill_rect(
            img,
            Rect::new(bar.x0, bar.y0, bar.x0 + bar.width() * ratio, bar.y1),
            health_color(ratio).with_alpha(220),
        );

        if agent.kills > 0 {
            let badge = Point::new(p.x + self.scaled(20.0), p.y - self.scaled(6.0));
            fill_circle(img, badge, self.scaled(8.0), Rgba8::rgba(255, 50, 50, 220));
        }
    }

    fn draw_scorecards(&self, img: &mut RgbaImage, sample: &ReplaySample) {
        let w = REFERENCE_WIDTH;
        let x = w - 220.0;
        fill_rect(img, self.rect(x - 10.0, 65.0, w - 5.0, REFERENCE_HEIGHT - 10.0), Rgba8::rgba(5, 10, 30, 180));

        let mut y = 98.0;
        for agent in &sample.agents {
            let color = self.palette.agent_color(&agent.name, agent.color.as_deref());
            let bg = if agent.is_alive {
                Rgba8::rgba(10, 30, 50, 180)
            } else {
                Rgba8::rgba(30, 10, 10, 150)
            };
            fill_rect(img, self.rect(x - 5.0, y - 3.0, w - 8.0, y + 72.0), bg);
            fill_rect(img, self.rect(x - 5.0, y - 3.0, x - 2.0, y + 72.0), color.with_alpha(200));
            if agent.is_alive {
                let ratio = agent.health_ratio();
                fill_rect(img, self.rect(x + 2.0, y + 50.0, x + 182.0, y + 55.0), Rgba8::rgba(30, 30, 30, 200));
                fill_rect(
                    img,
                    self.rect(x + 2.0, y + 50.0, x + 2.0 + 180.0 * ratio, y + 55.0),
                    health_color(ratio).with_alpha(220),
                );
            }
            y += 82.0;
        }
    }

    fn draw_intro(&self, img: &mut RgbaImage, card: &IntroCard<'_>) {
        let (w, h) = (REFERENCE_WIDTH, REFERENCE_HEIGHT);
        let fade = card.fade;
        fill_rect(
            img,
            self.rect(w / 2.0 - 200.0, h / 2.0 - 120.0, w / 2.0 + 200.0, h / 2.0 - 64.0),
            Rgba8::rgb(0, 240, 255).faded(fade),
        );
        fill_rect(
            img,
            self.rect(w / 2.0 - 180.0, h / 2.0 - 50.0, w / 2.0 + 180.0, h / 2.0 - 26.0),
            Rgba8::rgb(200, 200, 255).faded(fade),
        );

        let agents = &card.replay.agents;
        if !agents.is_empty() && fade > 0.5 {
            let agent_fade = ((fade - 0.5) * 2.0).min(1.0);
            let n = agents.len() as f64;
            let even_shift = if agents.len() % 2 == 0 { 110.0 } else { 0.0 };
            for (i, agent) in agents.iter().enumerate() {
                let color = self.palette.agent_color(&agent.name, agent.color.as_deref());
                let c = self.pt(
                    w / 2.0 + (i as f64 - (n / 2.0).floor()) * 220.0 + even_shift,
                    h / 2.0 + 80.0,
                );
                for r in (32..=40).rev().step_by(2) {
                    fill_circle(img, c, self.scaled(f64::from(r)), color.with_alpha(40).faded(agent_fade));
                }
                fill_circle(img, c, self.scaled(32.0), Rgba8::rgb(255, 255, 255).with_alpha(200).faded(agent_fade));
                fill_circle(img, c, self.scaled(30.0), color.with_alpha(200).faded(agent_fade));
            }
        }

        if fade > 0.7 {
            let badge_fade = ((fade - 0.7) * 3.0).min(1.0);
            fill_rect(
                img,
                self.rect(w - 280.0, h - 60.0, w - 10.0, h - 10.0),
                Rgba8::rgba(20, 40, 80, 200).faded(badge_fade),
            );
        }
    }

    fn draw_outro(&self, img: &mut RgbaImage, card: &OutroCard<'_>) {
        let (w, h) = (REFERENCE_WIDTH, REFERENCE_HEIGHT);
        let fade = card.fade;
        let replay = card.replay;
        let mvp_color = replay
            .roster_color(&replay.mvp_name)
            .and_then(|hex| Rgba8::from_hex(hex).ok())
            .unwrap_or(Rgba8::rgb(255, 215, 0));

        fill_rect(
            img,
            self.rect(w / 2.0 - 160.0, 80.0, w / 2.0 + 160.0, 116.0),
            Rgba8::rgb(255, 215, 0).faded(fade),
        );
        let panel = self.rect(w / 2.0 - 300.0, 160.0, w / 2.0 + 300.0, 380.0);
        fill_rect(img, panel, Rgba8::rgba(10, 20, 50, 220).faded(fade));
        stroke_rect(img, panel, self.scaled(3.0), mvp_color.with_alpha(200).faded(fade));

        let name_w = (44.0 * replay.mvp_name.chars().count() as f64).min(560.0);
        fill_rect(
            img,
            self.rect(w / 2.0 - name_w / 2.0, 210.0, w / 2.0 + name_w / 2.0, 266.0),
            mvp_color.faded(fade),
        );

        // One bar per stat, length scaled against the match total.
        let total = f64::from(replay.total_kills.max(1));
        let stats = [
            f64::from(replay.mvp_kills) / total,
            if replay.mvp_tokens > 0 { 1.0 } else { 0.0 },
            1.0,
        ];
        for (i, share) in stats.into_iter().enumerate() {
            let x = w / 2.0 - 220.0 + i as f64 * 220.0;
            fill_rect(
                img,
                self.rect(x, 330.0, x + 160.0 * share.clamp(0.0, 1.0), 350.0),
                Rgba8::rgb(255, 255, 255).faded(fade),
            );
        }

        if fade > 0.5 {
            let hl_fade = ((fade - 0.5) * 2.0).min(1.0);
            for (i, hl) in replay.top_highlights(3).iter().enumerate() {
                let y = 440.0 + i as f64 * 30.0;
                let color = self.palette.banner_color(hl.kind);
                fill_rect(img, self.rect(w / 2.0 - 300.0, y, w / 2.0 - 288.0, y + 12.0), color.faded(hl_fade));
                let text_w = (7.0 * (hl.title.chars().count() + hl.description.chars().count().min(73)) as f64).min(560.0);
                fill_rect(
                    img,
                    self.rect(w / 2.0 - 280.0, y, w / 2.0 - 280.0 + text_w, y + 12.0),
                    Rgba8::rgba(200, 220, 255, 220).faded(hl_fade),
                );
            }
        }

        if fade > 0.6 {
            let badge_fade = ((fade - 0.6) * 2.5).min(1.0);
            for i in 0..4 {
                let x = 50.0 + f64::from(i) * 200.0;
                fill_rect(
                    img,
                    self.rect(x, h - 70.0, x + 160.0, h - 30.0),
                    Rgba8::rgba(50, 150, 255, 60).faded(badge_fade),
                );
            }
        }
    }
}

impl Rasterizer for SchematicRasterizer {
    fn canvas(&self) -> Canvas {
        self.opts.canvas
    }

    fn render(&mut self, desc: &FrameDescriptor<'_>) -> RecapResult<FrameRGBA> {
        let img = match desc.kind {
            FrameKind::Intro(card) => {
                let mut img = self.intro_bg.clone();
                self.draw_intro(&mut img, &card);
                img
            }
            FrameKind::Battle(b) => {
                let mut img = self.arena_bg.clone();
                self.draw_battle(&mut img, desc, &b);
                img
            }
            FrameKind::Outro(card) => {
                let mut img = self.outro_bg.clone();
                self.draw_outro(&mut img, &card);
                img
            }
        };

        // Backgrounds are opaque and blending never touches alpha.
        Ok(FrameRGBA {
            width: self.opts.canvas.width,
            height: self.opts.canvas.height,
            data: img.into_raw(),
            premultiplied: true,
        })
    }
}

fn health_color(ratio: f64) -> Rgba8 {
    if ratio > 0.5 {
        Rgba8::rgb(0, 255, 100)
    } else if ratio > 0.25 {
        Rgba8::rgb(255, 200, 0)
    } else {
        Rgba8::rgb(255, 50, 50)
    }
}

fn gradient(width: u32, height: u32, top: Rgba8, bottom: Rgba8) -> RgbaImage {
    let lerp = |a: u8, b: u8, t: f64| (f64::from(a) + (f64::from(b) - f64::from(a)) * t) as u8;
    RgbaImage::from_fn(width, height, |_, y| {
        let t = f64::from(y) / f64::from(height);
        image::Rgba([
            lerp(top.r, bottom.r, t),
            lerp(top.g, bottom.g, t),
            lerp(top.b, bottom.b, t),
            255,
        ])
    })
}

fn draw_arena_floor(img: &mut RgbaImage, arena: Rect) {
    let grid = Rgba8::rgba(30, 60, 80, 120);
    let steps = 8;
    for i in 0..=steps {
        let t = f64::from(i) / f64::from(steps);
        let gx = arena.x0 + t * arena.width();
        let gy = arena.y0 + t * arena.height();
        fill_rect(img, Rect::new(gx, arena.y0, gx + 1.0, arena.y1), grid);
        fill_rect(img, Rect::new(arena.x0, gy, arena.x1, gy + 1.0), grid);
    }
    for w in (1..=4).rev() {
        let inset = f64::from(w);
        stroke_rect(
            img,
            Rect::new(arena.x0 - inset, arena.y0 - inset, arena.x1 + inset, arena.y1 + inset),
            1.0,
            Rgba8::rgba(0, 200, 255, (60 + w * 20) as u8),
        );
    }
}

fn blend_px(img: &mut RgbaImage, x: u32, y: u32, c: Rgba8) {
    let px = img.get_pixel_mut(x, y);
    px.0[0] = blend_channel(px.0[0], c.r, c.a);
    px.0[1] = blend_channel(px.0[1], c.g, c.a);
    px.0[2] = blend_channel(px.0[2], c.b, c.a);
}

// Pixel-index span covering `[lo, hi)` clipped to `[0, max)`.
fn span(lo: f64, hi: f64, max: u32) -> std::ops::Range<u32> {
    let lo = lo.floor().max(0.0).min(f64::from(max)) as u32;
    let hi = hi.ceil().max(0.0).min(f64::from(max)) as u32;
    lo..hi.max(lo)
}

fn fill_rect(img: &mut RgbaImage, rect: Rect, c: Rgba8) {
    if c.a == 0 {
        return;
    }
    let (w, h) = img.dimensions();
    let rect = rect.abs();
    for y in span(rect.y0, rect.y1, h) {
        for x in span(rect.x0, rect.x1, w) {
            blend_px(img, x, y, c);
        }
    }
}

fn stroke_rect(img: &mut RgbaImage, rect: Rect, width: f64, c: Rgba8) {
    let r = rect.abs();
    fill_rect(img, Rect::new(r.x0, r.y0, r.x1, r.y0 + width), c);
    fill_rect(img, Rect::new(r.x0, r.y1 - width, r.x1, r.y1), c);
    fill_rect(img, Rect::new(r.x0, r.y0 + width, r.x0 + width, r.y1 - width), c);
    fill_rect(img, Rect::new(r.x1 - width, r.y0 + width, r.x1, r.y1 - width), c);
}

fn fill_circle(img: &mut RgbaImage, center: Point, radius: f64, c: Rgba8) {
    if c.a == 0 || radius <= 0.0 {
        return;
    }
    let (w, h) = img.dimensions();
    for y in span(center.y - radius, center.y + radius, h) {
        for x in span(center.x - radius, center.x + radius, w) {
            let p = Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
            if p.distance(center) <= radius {
                blend_px(img, x, y, c);
            }
        }
    }
}

fn draw_line(img: &mut RgbaImage, a: Point, b: Point, width: f64, c: Rgba8) {
    if c.a == 0 {
        return;
    }
    let (w, h) = img.dimensions();
    let half = (width / 2.0).max(0.5);
    let ab = b - a;
    let len2 = ab.hypot2();
    for y in span(a.y.min(b.y) - half, a.y.max(b.y) + half, h) {
        for x in span(a.x.min(b.x) - half, a.x.max(b.x) + half, w) {
            let p = Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
            let t = if len2 > 0.0 {
                ((p - a).dot(ab) / len2).clamp(0.0, 1.0)
            } else {
                0.0
            };
            if p.distance(a + ab * t) <= half {
                blend_px(img, x, y, c);
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;

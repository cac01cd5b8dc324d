//! CGA-class video adapter.
//!
//! Owns a 16 KiB framebuffer aliased across `[0xB8000, 0xC0000)`, the CRT
//! index/data register pair, the mode-control and color-control registers,
//! and a wall-clock-driven scanline counter. A background render task
//! wakes at 30 Hz, snapshots the framebuffer under a reader lock, and
//! pushes a decoded surface to the host (§6). The emulation thread only
//! ever takes the writer lock for the instant of a byte write.

use super::font8x8;
use crate::bus::{IoDevice, MemoryDevice};
use crate::error::Result;
use crate::peripherals::Peripheral;
use log::info;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

pub const FRAMEBUFFER_SIZE: usize = 0x4000;
const MEM_BASE: u32 = 0xB8000;
const MEM_END: u32 = 0xBFFFF;
const PORT_BASE: u16 = 0x3D0;
const PORT_END: u16 = 0x3DF;

const SCANLINE_PERIOD: Duration = Duration::from_nanos(31_469);
const SCANLINES_PER_FRAME: u32 = 525;
const FIRST_VSYNC_SCANLINE: u32 = 480;
const RENDER_HZ: u64 = 30;

/// Host-facing presentation surface (§6 external interface). The render
/// task calls `render_graphics` with a rasterized 640x200 RGBA frame for
/// every mode (CGA graphics modes directly, text modes via the 8x8 font
/// table) and additionally calls `render_text` with the raw cell/attribute
/// pairs whenever the current mode is text — a cheaper alternative a
/// headless, pixel-incapable host (our own demo binary among them) can use
/// instead of decoding the rasterized frame.
pub trait HostSurface: Send + Sync {
    fn render_graphics(&self, pixels: &[u8], bg: (u8, u8, u8));
    fn render_text(&self, cells: &[(u8, u8)], blink_enabled: bool, bg_index: u8, cursor: Option<(u8, u8)>);
    fn set_title(&self, title: &str);
}

struct Registers {
    crt_index: u8,
    crt: [u8; 256],
    mode_control: u8,
    color_control: u8,
    cursor_visible: bool,
    scanline: u32,
    last_scanline_tick: Instant,
}

impl Registers {
    fn new() -> Self {
        Self {
            crt_index: 0,
            crt: [0; 256],
            mode_control: 0x01,
            color_control: 0x00,
            cursor_visible: true,
            scanline: 0,
            last_scanline_tick: Instant::now(),
        }
    }

    fn cursor_position(&self) -> u16 {
        ((self.crt[0x0E] as u16) << 8) | self.crt[0x0F] as u16
    }
}

/// Shared state touched by both the emulation thread (via the memory/IO
/// device wrappers) and the render task.
struct Shared {
    framebuffer: RwLock<[u8; FRAMEBUFFER_SIZE]>,
    regs: Mutex<Registers>,
    dirty: AtomicBool,
    cycles: AtomicU64,
}

impl Shared {
    fn new() -> Self {
        use rand::RngCore;
        let mut fb = [0u8; FRAMEBUFFER_SIZE];
        rand::thread_rng().fill_bytes(&mut fb);
        Self {
            framebuffer: RwLock::new(fb),
            regs: Mutex::new(Registers::new()),
            dirty: AtomicBool::new(true),
            cycles: AtomicU64::new(0),
        }
    }

    fn reset(&self) {
        use rand::RngCore;
        rand::thread_rng().fill_bytes(&mut *self.framebuffer.write().unwrap());
        *self.regs.lock().unwrap() = Registers::new();
        self.dirty.store(true, Ordering::Relaxed);
        self.cycles.store(0, Ordering::Relaxed);
    }
}

struct MemDevice(Arc<Shared>);

impl MemoryDevice for MemDevice {
    fn read_byte(&self, addr: u32) -> u8 {
        let idx = (addr as usize) & (FRAMEBUFFER_SIZE - 1);
        self.0.framebuffer.read().unwrap()[idx]
    }

    fn write_byte(&mut self, addr: u32, value: u8) {
        let idx = (addr as usize) & (FRAMEBUFFER_SIZE - 1);
        self.0.framebuffer.write().unwrap()[idx] = value;
        self.0.dirty.store(true, Ordering::Relaxed);
    }

    fn device_name(&self) -> &str {
        "cga"
    }
}

struct IoDeviceImpl(Arc<Shared>);

impl IoDevice for IoDeviceImpl {
    fn port_in(&mut self, port: u16) -> u8 {
        let mut regs = self.0.regs.lock().unwrap();
        match port {
            0x3D0 | 0x3D2 | 0x3D4 | 0x3D6 => regs.crt_index,
            0x3D1 | 0x3D3 | 0x3D5 | 0x3D7 => regs.crt[regs.crt_index as usize],
            0x3D8 => regs.mode_control,
            0x3D9 => regs.color_control,
            0x3DA => {
                // Reading the status register clears the "not in active
                // display" latch bit in the returned value; the underlying
                // scanline counter that derives it is timestamp-driven and
                // unaffected (§4.6).
                status_byte(&regs) & !0x01
            }
            _ => 0,
        }
    }

    fn port_out(&mut self, port: u16, value: u8) {
        let mut regs = self.0.regs.lock().unwrap();
        match port {
            0x3D0 | 0x3D2 | 0x3D4 | 0x3D6 => regs.crt_index = value & 0x1F,
            0x3D1 | 0x3D3 | 0x3D5 | 0x3D7 => {
                let index = regs.crt_index as usize;
                regs.crt[index] = value;
                if index == 0x0A {
                    regs.cursor_visible = value & 0x20 == 0;
                }
            }
            0x3D8 => regs.mode_control = value,
            0x3D9 => regs.color_control = value,
            _ => {}
        }
    }
}

fn status_byte(regs: &Registers) -> u8 {
    let not_active_display = regs.scanline >= 200 && regs.scanline < FIRST_VSYNC_SCANLINE;
    let vsync = regs.scanline >= FIRST_VSYNC_SCANLINE;
    (not_active_display as u8) | ((vsync as u8) << 3)
}

/// The CGA peripheral: owns the shared state, the render thread handle,
/// and the host surface it pushes frames to.
pub struct Cga {
    shared: Arc<Shared>,
    host: Arc<dyn HostSurface>,
    render_thread: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    last_mips_report: Instant,
}

impl Cga {
    pub fn new(host: Arc<dyn HostSurface>) -> Self {
        Self {
            shared: Arc::new(Shared::new()),
            host,
            render_thread: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            last_mips_report: Instant::now(),
        }
    }

    /// Advances the scanline counter by elapsed wall time. Cycle count is
    /// accepted for the uniform peripheral `step` signature and accumulated
    /// into the MIPS counter; the scanline timer itself is timestamp-driven
    /// per §4.6, not derived from instruction cycles.
    fn advance_scanline(&self) {
        let mut regs = self.shared.regs.lock().unwrap();
        let now = Instant::now();
        while now.duration_since(regs.last_scanline_tick) >= SCANLINE_PERIOD {
            regs.last_scanline_tick += SCANLINE_PERIOD;
            regs.scanline = (regs.scanline + 1) % SCANLINES_PER_FRAME;
        }
    }
}

impl Peripheral for Cga {
    fn name(&self) -> &'static str {
        "cga"
    }

    fn install(&mut self, bus: &mut crate::bus::MemoryBus, io: &mut crate::bus::IoBus) -> Result<()> {
        let mem: Rc<RefCell<dyn MemoryDevice>> = Rc::new(RefCell::new(MemDevice(Arc::clone(&self.shared))));
        bus.install(mem, MEM_BASE, MEM_END)?;
        let io_dev: Rc<RefCell<dyn IoDevice>> = Rc::new(RefCell::new(IoDeviceImpl(Arc::clone(&self.shared))));
        io.install(io_dev, PORT_BASE, PORT_END)?;

        let shared = Arc::clone(&self.shared);
        let host = Arc::clone(&self.host);
        let shutdown = Arc::clone(&self.shutdown);
        self.render_thread = Some(std::thread::spawn(move || render_loop(shared, host, shutdown)));
        info!("cga: installed at {:#07x}..={:#07x}, ports {:#06x}..={:#06x}", MEM_BASE, MEM_END, PORT_BASE, PORT_END);
        Ok(())
    }

    fn reset(&mut self) {
        self.shared.reset();
    }

    fn step(&mut self, cycles: u32) -> Result<()> {
        self.shared.cycles.fetch_add(cycles as u64, Ordering::Relaxed);
        self.advance_scanline();
        if self.last_mips_report.elapsed() >= Duration::from_secs(1) {
            let cycles_total = self.shared.cycles.swap(0, Ordering::Relaxed);
            self.host.set_title(&format!("{:.3} MIPS", cycles_total as f64 / 1_000_000.0));
            self.last_mips_report = Instant::now();
        }
        Ok(())
    }

    fn close(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.render_thread.take() {
            let _ = handle.join();
        }
    }
}

fn render_loop(shared: Arc<Shared>, host: Arc<dyn HostSurface>, shutdown: Arc<AtomicBool>) {
    let period = Duration::from_millis(1000 / RENDER_HZ);
    let mut last_blink_phase = false;
    let mut elapsed_ms: u64 = 0;
    loop {
        std::thread::sleep(period);
        if shutdown.load(Ordering::Relaxed) {
            return;
        }
        elapsed_ms += period.as_millis() as u64;
        let blink_phase = (elapsed_ms / 266) % 2 == 0;
        let dirty = shared.dirty.swap(false, Ordering::Relaxed);
        if !dirty && blink_phase == last_blink_phase {
            continue;
        }
        last_blink_phase = blink_phase;

        let fb = *shared.framebuffer.read().unwrap();
        let regs_snapshot = {
            let regs = shared.regs.lock().unwrap();
            (regs.mode_control, regs.color_control, regs.cursor_visible, regs.cursor_position())
        };
        let (mode, color, cursor_visible, cursor_pos) = regs_snapshot;
        present(&*host, &fb, mode, color, cursor_visible, cursor_pos, blink_phase);
    }
}

fn present(
    host: &dyn HostSurface,
    fb: &[u8; FRAMEBUFFER_SIZE],
    mode: u8,
    color: u8,
    cursor_visible: bool,
    cursor_pos: u16,
    blink_phase: bool,
) {
    let graphics = mode & 0x02 != 0;
    let bg_index = color & 0x0F;
    let bg = palette_bg_rgb(bg_index);

    if !graphics {
        let forty_col = mode & 0x01 == 0;
        let blink_enabled = mode & 0x20 != 0;
        let cols: usize = if forty_col { 40 } else { 80 };
        let mut cells = Vec::with_capacity(80 * 25);
        for row in 0..25usize {
            for col in 0..cols {
                let base = (row * cols + col) * 2;
                cells.push((fb[base], fb[base + 1]));
            }
        }
        let cursor_row = (cursor_pos / 80) as u8;
        let cursor_col = (cursor_pos % 80) as u8;
        let cursor = if cursor_visible && blink_phase {
            Some((cursor_col, cursor_row))
        } else {
            None
        };
        host.render_text(&cells, blink_enabled, bg_index, cursor);

        let pixels = rasterize_text(&cells, cols, blink_enabled, cursor, blink_phase);
        host.render_graphics(&pixels, bg);
    } else if mode & 0x10 != 0 {
        // 640x200x1bpp high-res.
        let mut pixels = vec![0u8; 640 * 200 * 4];
        for y in 0..200usize {
            for x in 0..640usize {
                let base = (y >> 1) * 80 + (y & 1) * 8192 + (x >> 3);
                let bit = 7 - (x & 7);
                let lit = (fb[base] >> bit) & 1 != 0;
                let rgb = if lit { (0xFF, 0xFF, 0xFF) } else { bg };
                put_pixel(&mut pixels, x, y, rgb);
            }
        }
        host.render_graphics(&pixels, bg);
    } else {
        // 320x200x2bpp medium-res.
        let palette_select = color & 0x20 != 0;
        let intensity = color & 0x10 != 0;
        let palette = medium_res_palette(palette_select, intensity);
        let mut pixels = vec![0u8; 640 * 200 * 4];
        for y in 0..200usize {
            for x in 0..320usize {
                let base = (y >> 1) * 80 + (y & 1) * 8192 + (x >> 2);
                let shift = 6 - 2 * (x & 3);
                let index = (fb[base] >> shift) & 0x03;
                let rgb = palette[index as usize];
                // Each logical pixel is doubled horizontally to fill the
                // 640-wide surface, matching the 320-column mode's actual
                // dot clock relative to the 640-wide high-res mode.
                put_pixel(&mut pixels, x * 2, y, rgb);
                put_pixel(&mut pixels, x * 2 + 1, y, rgb);
            }
        }
        host.render_graphics(&pixels, bg);
    }
}

fn put_pixel(pixels: &mut [u8], x: usize, y: usize, rgb: (u8, u8, u8)) {
    let p = (y * 640 + x) * 4;
    pixels[p] = rgb.0;
    pixels[p + 1] = rgb.1;
    pixels[p + 2] = rgb.2;
    pixels[p + 3] = 0xFF;
}

/// Rasterize 80/40-column text cells into a 640x200 RGBA frame using the
/// 8x8 font table, overlaying a blinking underline cursor when visible.
fn rasterize_text(
    cells: &[(u8, u8)],
    cols: usize,
    blink_enabled: bool,
    cursor: Option<(u8, u8)>,
    blink_phase: bool,
) -> Vec<u8> {
    let mut pixels = vec![0u8; 640 * 200 * 4];
    let col_width = 640 / cols;
    for row in 0..25usize {
        for col in 0..cols {
            let (ch, attr) = cells[row * cols + col];
            let (glyph, fg, bg) = rasterize_cell(ch, attr, blink_enabled, blink_phase);
            for (gy, bits) in glyph.iter().enumerate() {
                for gx in 0..8usize {
                    let lit = (bits >> (7 - gx)) & 1 != 0;
                    let rgb = if lit { fg } else { bg };
                    let px = col * col_width;
                    for dupe in 0..(col_width / 8).max(1) {
                        put_pixel(&mut pixels, px + gx + dupe * 8, row * 8 + gy, rgb);
                    }
                }
            }
        }
    }
    if let Some((cx, cy)) = cursor {
        let px = cx as usize * col_width;
        let py = cy as usize * 8 + 7;
        for dx in 0..col_width {
            put_pixel(&mut pixels, px + dx, py, (0xFF, 0xFF, 0xFF));
        }
    }
    pixels
}

fn palette_bg_rgb(index: u8) -> (u8, u8, u8) {
    const CGA16: [(u8, u8, u8); 16] = [
        (0, 0, 0), (0, 0, 170), (0, 170, 0), (0, 170, 170),
        (170, 0, 0), (170, 0, 170), (170, 85, 0), (170, 170, 170),
        (85, 85, 85), (85, 85, 255), (85, 255, 85), (85, 255, 255),
        (255, 85, 85), (255, 85, 255), (255, 255, 85), (255, 255, 255),
    ];
    CGA16[(index & 0x0F) as usize]
}

fn medium_res_palette(palette_select: bool, intensity: bool) -> [(u8, u8, u8); 4] {
    let i = if intensity { 0xFFu8 } else { 0xAA };
    if palette_select {
        [(0, 0, 0), (0, i, i), (i, 0, i), (i, i, i)] // palette 1: cyan/magenta/white
    } else {
        [(0, 0, 0), (0, i, 0), (i, 0, 0), (i, i, 0)] // palette 0: green/red/yellow
    }
}

/// Rasterize a text-mode cell's glyph, honoring blink/intensity per the
/// attribute byte and mode-control bit 5 (§4.6, §GLOSSARY).
pub fn rasterize_cell(ch: u8, attr: u8, blink_enabled: bool, blink_phase: bool) -> ([u8; 8], (u8, u8, u8), (u8, u8, u8)) {
    let glyph = font8x8::glyph(ch);
    let fg_index = attr & 0x0F;
    let bg_index = if blink_enabled {
        (attr >> 4) & 0x07
    } else {
        (attr >> 4) & 0x0F
    };
    let blinking = blink_enabled && attr & 0x80 != 0;
    let fg = if blinking && !blink_phase {
        palette_bg_rgb(bg_index)
    } else {
        palette_bg_rgb(fg_index)
    };
    let bg = palette_bg_rgb(bg_index);
    (glyph, fg, bg)
}

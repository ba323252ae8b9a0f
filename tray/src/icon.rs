use image::{ImageBuffer, Rgba, RgbaImage};
use juice_core::state::drawing_bucket;
use juice_core::{BatteryError, BatteryState, IconKind};
use tray_icon::Icon;

pub const WIDTH: u32 = 30;
pub const HEIGHT: u32 = 16;

// Battery body outline, inclusive bounds
const BODY_LEFT: u32 = 0;
const BODY_RIGHT: u32 = 25;
const BODY_TOP: u32 = 2;
const BODY_BOTTOM: u32 = 13;

// Capacity bar area inside the outline
const FILL_LEFT: u32 = 2;
const FILL_WIDTH: u32 = 22;
const FILL_TOP: u32 = 4;
const FILL_BOTTOM: u32 = 11;

/// Black; the menu bar renders it as a template image.
const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Lightning bolt, in pixel coordinates.
const BOLT: [(f32, f32); 6] = [
    (15.0, 3.0),
    (8.0, 9.0),
    (12.5, 9.0),
    (10.0, 14.0),
    (17.0, 7.0),
    (12.5, 7.0),
];

/// Width in pixels of the capacity bar for a percentage.
///
/// Widths step in whole drawing buckets so that states the redraw gate
/// considers equal also render identically.
pub fn fill_width(percentage: u8, granularity: f64) -> u32 {
    let max = drawing_bucket(100, granularity).max(1);
    let bucket = drawing_bucket(percentage, granularity).clamp(0, max);
    ((bucket as f64 * f64::from(FILL_WIDTH)) / max as f64).round() as u32
}

/// Whether the fill is too narrow to draw and the low-battery image is used.
pub fn is_low(percentage: u8, granularity: f64) -> bool {
    drawing_bucket(percentage, granularity) < 2
}

/// Composite the menu-bar image for `kind`.
pub fn render(kind: &IconKind, granularity: f64) -> RgbaImage {
    let mut img = ImageBuffer::from_pixel(WIDTH, HEIGHT, CLEAR);

    match kind {
        IconKind::State(BatteryState::Discharging(p)) => match p.value() {
            Some(p) if is_low(p, granularity) => draw_low(&mut img),
            Some(p) => {
                draw_outline(&mut img);
                let width = fill_width(p, granularity);
                if width > 0 {
                    fill_rect(&mut img, FILL_LEFT, FILL_TOP, FILL_LEFT + width - 1, FILL_BOTTOM, INK);
                }
            }
            None => draw_outline(&mut img),
        },
        IconKind::State(BatteryState::Charging(_)) => {
            draw_outline(&mut img);
            draw_bolt(&mut img, INK);
        }
        IconKind::State(BatteryState::ChargedAndPlugged) => {
            draw_outline(&mut img);
            fill_rect(&mut img, FILL_LEFT, FILL_TOP, FILL_LEFT + FILL_WIDTH - 1, FILL_BOTTOM, INK);
            draw_bolt(&mut img, CLEAR);
        }
        // dead battery
        IconKind::Error(BatteryError::ConnectionAlreadyOpen) => draw_dashed_outline(&mut img),
        IconKind::Error(BatteryError::ServiceNotFound(_)) => {
            draw_outline(&mut img);
            draw_cross(&mut img);
        }
    }

    img
}

/// Convert a rendered image into a tray icon.
pub fn to_icon(img: RgbaImage) -> Result<Icon, tray_icon::BadIcon> {
    let (width, height) = img.dimensions();
    Icon::from_rgba(img.into_raw(), width, height)
}

fn fill_rect(img: &mut RgbaImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgba<u8>) {
    for y in y0..=y1.min(HEIGHT - 1) {
        for x in x0..=x1.min(WIDTH - 1) {
            img.put_pixel(x, y, color);
        }
    }
}

fn draw_outline(img: &mut RgbaImage) {
    fill_rect(img, BODY_LEFT, BODY_TOP, BODY_RIGHT, BODY_TOP, INK);
    fill_rect(img, BODY_LEFT, BODY_BOTTOM, BODY_RIGHT, BODY_BOTTOM, INK);
    fill_rect(img, BODY_LEFT, BODY_TOP, BODY_LEFT, BODY_BOTTOM, INK);
    fill_rect(img, BODY_RIGHT, BODY_TOP, BODY_RIGHT, BODY_BOTTOM, INK);
    // terminal nub
    fill_rect(img, BODY_RIGHT + 1, 5, BODY_RIGHT + 2, 10, INK);
}

fn draw_dashed_outline(img: &mut RgbaImage) {
    draw_outline(img);
    for x in (BODY_LEFT + 2..BODY_RIGHT).step_by(4) {
        fill_rect(img, x, BODY_TOP, x + 1, BODY_TOP, CLEAR);
        fill_rect(img, x, BODY_BOTTOM, x + 1, BODY_BOTTOM, CLEAR);
    }
    for y in (BODY_TOP + 2..BODY_BOTTOM).step_by(4) {
        fill_rect(img, BODY_LEFT, y, BODY_LEFT, y + 1, CLEAR);
        fill_rect(img, BODY_RIGHT, y, BODY_RIGHT, y + 1, CLEAR);
    }
}

/// Outline with a sliver of charge left.
fn draw_low(img: &mut RgbaImage) {
    draw_outline(img);
    fill_rect(img, FILL_LEFT, FILL_TOP, FILL_LEFT + 1, FILL_BOTTOM, INK);
}

fn draw_cross(img: &mut RgbaImage) {
    let (w, h) = (FILL_WIDTH as f32, (FILL_BOTTOM - FILL_TOP) as f32);
    for x in 0..FILL_WIDTH {
        let y = (x as f32 * h / w).round() as u32;
        img.put_pixel(FILL_LEFT + x, FILL_TOP + y, INK);
        img.put_pixel(FILL_LEFT + x, FILL_BOTTOM - y, INK);
    }
}

fn draw_bolt(img: &mut RgbaImage, color: Rgba<u8>) {
    for y in BODY_TOP..=BODY_BOTTOM {
        for x in BODY_LEFT..=BODY_RIGHT {
            if inside(&BOLT, x as f32 + 0.5, y as f32 + 0.5) {
                img.put_pixel(x, y, color);
            }
        }
    }
}

/// Even-odd point-in-polygon test.
fn inside(poly: &[(f32, f32)], x: f32, y: f32) -> bool {
    let mut result = false;
    let mut j = poly.len() - 1;
    for i in 0..poly.len() {
        let (xi, yi) = poly[i];
        let (xj, yj) = poly[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            result = !result;
        }
        j = i;
    }
    result
}

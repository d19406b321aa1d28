//! Renders EHP breakdowns as a stacked horizontal bar chart.
//!
//! The chart is drawn directly into a bitmap, one panel per kit, all panels
//! sharing a single scale so bar lengths are comparable across kits. Labels
//! and exact numbers travel in the embed next to the image, which keeps the
//! bitmap free of text rendering.

use crate::ehp::EhpBreakdown;
use crate::error::{DeepdexError, Result};
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

/// Filename used for the chart attachment and its `attachment://` reference.
pub const ATTACHMENT_NAME: &str = "kit_breakdown.png";

const WIDTH: u32 = 720;
const PADDING: u32 = 16;
const BAR_HEIGHT: u32 = 22;
const BAR_GAP: u32 = 8;
const PANEL_GAP: u32 = 24;
/// Four health segments plus the total and EHP bars.
const BARS_PER_PANEL: u32 = 6;
const PANEL_HEIGHT: u32 =
    2 * PADDING + BARS_PER_PANEL * BAR_HEIGHT + (BARS_PER_PANEL - 1) * BAR_GAP;

const BACKGROUND: Rgba<u8> = Rgba([0x2B, 0x2D, 0x31, 0xFF]);
const TRACK: Rgba<u8> = Rgba([0x1E, 0x1F, 0x22, 0xFF]);
const SEGMENT: Rgba<u8> = Rgba([0x58, 0x65, 0xF2, 0xFF]);
const TOTAL: Rgba<u8> = Rgba([0xFE, 0xE7, 0x5C, 0xFF]);
const EHP_BAR: Rgba<u8> = Rgba([0x57, 0xF2, 0x87, 0xFF]);

/// Renders one panel per breakdown, stacked top to bottom, and encodes the
/// result as a PNG.
pub fn render_breakdown(panels: &[EhpBreakdown]) -> Result<Vec<u8>> {
    if panels.is_empty() {
        return Err(DeepdexError::Render(
            "No breakdown panels to render".to_string(),
        ));
    }

    let count = panels.len() as u32;
    let height = count * PANEL_HEIGHT + (count - 1) * PANEL_GAP;
    let mut image = RgbaImage::from_pixel(WIDTH, height, BACKGROUND);

    // Shared scale across panels so the kits are visually comparable.
    let scale_max = panels.iter().map(|p| p.ehp).fold(1.0_f64, f64::max);

    for (index, panel) in panels.iter().enumerate() {
        let top = index as u32 * (PANEL_HEIGHT + PANEL_GAP);
        draw_panel(&mut image, panel, top, scale_max);
    }

    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

fn draw_panel(image: &mut RgbaImage, panel: &EhpBreakdown, top: u32, scale_max: f64) {
    let mut bars: Vec<(f64, Rgba<u8>)> = panel
        .segments
        .iter()
        .map(|segment| (segment.hp, SEGMENT))
        .collect();
    bars.push((panel.total_hp, TOTAL));
    bars.push((panel.ehp, EHP_BAR));

    let usable = WIDTH - 2 * PADDING;
    for (row, &(value, color)) in bars.iter().enumerate() {
        let y = top + PADDING + row as u32 * (BAR_HEIGHT + BAR_GAP);
        fill_rect(image, PADDING, y, usable, BAR_HEIGHT, TRACK);

        let width = ((value / scale_max) * f64::from(usable)).round() as u32;
        fill_rect(image, PADDING, y, width.min(usable), BAR_HEIGHT, color);
    }
}

fn fill_rect(image: &mut RgbaImage, x: u32, y: u32, width: u32, height: u32, color: Rgba<u8>) {
    for dy in 0..height {
        for dx in 0..width {
            let (px, py) = (x + dx, y + dy);
            if px < image.width() && py < image.height() {
                image.put_pixel(px, py, color);
            }
        }
    }
}

use std::path::Path;

use anyhow::{anyhow, bail, Result};
use cv2::prelude::*;
use opencv as cv2;

pub mod chart;
pub mod layout;
pub mod table;

pub use chart::{BarChart, BarGroup, LineChart, Series};
pub use table::TableImage;

use layout::Area;

const FONT: i32 = cv2::imgproc::FONT_HERSHEY_SIMPLEX;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb`
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 {
            bail!("expected #rrggbb, got {hex:?}");
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| anyhow!("expected #rrggbb, got {hex:?}"))
        };
        Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    /// OpenCV images are BGR
    fn scalar(&self) -> cv2::core::Scalar {
        cv2::core::Scalar::new(self.b as f64, self.g as f64, self.r as f64, 0.0)
    }
}

pub const WHITE: Color = Color::rgb(255, 255, 255);
pub const BLACK: Color = Color::rgb(0, 0, 0);
pub const GRID: Color = Color::rgb(220, 220, 220);
pub const HIGHLIGHT: Color = Color::rgb(0xa1, 0xd9, 0x9b);

/// Line and bar colors, one per tracker
const PALETTE: [Color; 10] = [
    Color::rgb(31, 119, 180),
    Color::rgb(255, 127, 14),
    Color::rgb(44, 160, 44),
    Color::rgb(214, 39, 40),
    Color::rgb(148, 103, 189),
    Color::rgb(140, 86, 75),
    Color::rgb(227, 119, 194),
    Color::rgb(127, 127, 127),
    Color::rgb(188, 189, 34),
    Color::rgb(23, 190, 207),
];

pub fn palette(index: usize) -> Color {
    PALETTE[index % PALETTE.len()]
}

/// Where a text anchor sits relative to the string
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Anchor {
    Left,
    Center,
    Right,
}

/// Font scale and stroke of a text element
#[derive(Clone, Copy, Debug)]
pub struct TextStyle {
    pub scale: f64,
    pub thickness: i32,
    pub color: Color,
}

impl TextStyle {
    pub const fn new(scale: f64, thickness: i32) -> Self {
        Self {
            scale,
            thickness,
            color: BLACK,
        }
    }
}

pub const TITLE: TextStyle = TextStyle::new(0.7, 2);
pub const LABEL: TextStyle = TextStyle::new(0.55, 1);
pub const SMALL: TextStyle = TextStyle::new(0.45, 1);

/// Width and height above the baseline of a rendered string
pub fn text_size(text: &str, style: TextStyle) -> Result<(i32, i32)> {
    let mut baseline = 0;
    let size = cv2::imgproc::get_text_size(text, FONT, style.scale, style.thickness, &mut baseline)?;
    Ok((size.width, size.height))
}

/// White RGB drawing surface
pub struct Canvas {
    mat: cv2::core::Mat,
    width: i32,
    height: i32,
}

impl Canvas {
    pub fn new(width: i32, height: i32) -> Result<Canvas> {
        if width <= 0 || height <= 0 {
            bail!("cannot create a {width} x {height} canvas");
        }
        let mat = cv2::core::Mat::new_rows_cols_with_default(height, width, cv2::core::CV_8UC3, WHITE.scalar())?;
        Ok(Canvas { mat, width, height })
    }

    pub fn area(&self) -> Area {
        Area::new(0, 0, self.width, self.height)
    }

    pub fn line(&mut self, from: (i32, i32), to: (i32, i32), color: Color, thickness: i32) -> Result<()> {
        cv2::imgproc::line(
            &mut self.mat,
            cv2::core::Point::new(from.0, from.1),
            cv2::core::Point::new(to.0, to.1),
            color.scalar(),
            thickness,
            cv2::imgproc::LINE_AA,
            0,
        )?;
        Ok(())
    }

    pub fn polyline(&mut self, points: &[(i32, i32)], color: Color, thickness: i32) -> Result<()> {
        for pair in points.windows(2) {
            self.line(pair[0], pair[1], color, thickness)?;
        }
        Ok(())
    }

    pub fn fill(&mut self, area: Area, color: Color) -> Result<()> {
        self.rectangle(area, color, cv2::imgproc::FILLED)
    }

    pub fn outline(&mut self, area: Area, color: Color) -> Result<()> {
        self.rectangle(area, color, 1)
    }

    fn rectangle(&mut self, area: Area, color: Color, thickness: i32) -> Result<()> {
        cv2::imgproc::rectangle(
            &mut self.mat,
            cv2::core::Rect::new(area.x, area.y, area.width, area.height),
            color.scalar(),
            thickness,
            cv2::imgproc::LINE_8,
            0,
        )?;
        Ok(())
    }

    /// Draw `text` with its baseline at `y`, positioned horizontally around `x`
    pub fn text(&mut self, text: &str, x: i32, y: i32, anchor: Anchor, style: TextStyle) -> Result<()> {
        let (width, _) = text_size(text, style)?;
        let left = match anchor {
            Anchor::Left => x,
            Anchor::Center => x - width / 2,
            Anchor::Right => x - width,
        };
        cv2::imgproc::put_text(
            &mut self.mat,
            text,
            cv2::core::Point::new(left, y),
            FONT,
            style.scale,
            style.color.scalar(),
            style.thickness,
            cv2::imgproc::LINE_AA,
            false,
        )?;
        Ok(())
    }

    /// Draw `text` vertically centered on `y`
    pub fn text_middle(&mut self, text: &str, x: i32, y: i32, anchor: Anchor, style: TextStyle) -> Result<()> {
        let (_, height) = text_size(text, style)?;
        self.text(text, x, y + height / 2, anchor, style)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let filename = path
            .to_str()
            .ok_or_else(|| anyhow!("non utf-8 path {}", path.display()))?;
        if !cv2::imgcodecs::imwrite(filename, &self.mat, &cv2::core::Vector::new())? {
            bail!("failed to write {}", path.display());
        }
        Ok(())
    }

    /// BGR value of one pixel
    pub fn pixel(&self, x: i32, y: i32) -> Result<[u8; 3]> {
        let value = self.mat.at_2d::<cv2::core::Vec3b>(y, x)?;
        Ok([value[0], value[1], value[2]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color() {
        assert_eq!(Color::from_hex("#a1d99b").unwrap(), HIGHLIGHT);
        assert_eq!(Color::from_hex("000000").unwrap(), BLACK);
        assert!(Color::from_hex("#a1d9").is_err());
        assert!(Color::from_hex("#zzzzzz").is_err());
        assert_eq!(palette(0), palette(10));
    }

    #[test]
    fn test_canvas() {
        let mut canvas = Canvas::new(40, 30).unwrap();
        assert_eq!(canvas.pixel(5, 5).unwrap(), [255, 255, 255]);
        canvas.fill(Area::new(0, 0, 10, 10), HIGHLIGHT).unwrap();
        assert_eq!(canvas.pixel(5, 5).unwrap(), [0x9b, 0xd9, 0xa1]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("canvas.png");
        canvas.save(&path).unwrap();
        assert!(path.is_file());

        assert!(Canvas::new(0, 10).is_err());
    }
}

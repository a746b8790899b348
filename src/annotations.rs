//! Ground truth annotations.
//!
//! Annotation exports come as CVAT style XML with one `box` element per
//! annotated frame, in pixel coordinates. They are stored as a text file
//! with one line per frame:
//!
//! ```text
//! 0,0.512500,0.433333,0.075000,0.133333,0
//! 1
//! 2,0.515625,0.431944,0.075000,0.133333,1
//! ```
//!
//! i.e. `frame,cx,cy,w,h,occluded` normalized by the image size, or a bare
//! frame index when the frame has no box.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{anyhow, bail, Context as AnyhowContext, Result};
use tracing::debug;

use crate::evaluation::BBox;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// Box center and size as fractions of the image size
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizedBox {
    pub cx: f64,
    pub cy: f64,
    pub w: f64,
    pub h: f64,
    pub occluded: u32,
}

impl NormalizedBox {
    pub fn from_corners(xtl: f64, ytl: f64, xbr: f64, ybr: f64, size: ImageSize, occluded: u32) -> Self {
        let width = size.width as f64;
        let height = size.height as f64;
        Self {
            cx: (xtl + (xbr - xtl) / 2.) / width,
            cy: (ytl + (ybr - ytl) / 2.) / height,
            w: (xbr - xtl) / width,
            h: (ybr - ytl) / height,
            occluded,
        }
    }

    /// Pixel rectangle anchored at the top-left corner
    pub fn to_pixels(&self, size: ImageSize) -> BBox {
        let width = size.width as f64;
        let height = size.height as f64;
        let w = self.w * width;
        let h = self.h * height;
        BBox {
            x: (self.cx * width - w / 2.).round() as i32,
            y: (self.cy * height - h / 2.).round() as i32,
            width: w.round() as i32,
            height: h.round() as i32,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AnnotationTrack {
    pub size: ImageSize,
    pub total_frames: u32,
    pub boxes: BTreeMap<u32, NormalizedBox>,
}

fn child_text<'a, 'input: 'a>(node: roxmltree::Node<'a, 'input>, path: &[&str]) -> Option<&'a str> {
    let mut current = node;
    for name in path {
        current = current.children().find(|n| n.has_tag_name(*name))?;
    }
    current.text().map(str::trim)
}

/// Text of the first `path` found below any descendant called `anchor`.
fn find_text<'a, 'input: 'a>(
    doc: &'a roxmltree::Document<'input>,
    anchor: &str,
    path: &[&str],
) -> Result<&'a str> {
    doc.descendants()
        .filter(|n| n.has_tag_name(anchor))
        .find_map(|n| child_text(n, path))
        .ok_or_else(|| anyhow!("missing element {}/{}", anchor, path.join("/")))
}

fn parse_u32(text: &str, what: &str) -> Result<u32> {
    text.parse().with_context(|| format!("{what} is not an integer: {text:?}"))
}

fn box_attribute(node: roxmltree::Node, name: &str) -> Result<f64> {
    let value = node
        .attribute(name)
        .ok_or_else(|| anyhow!("box without attribute {name}"))?;
    value
        .parse()
        .with_context(|| format!("box attribute {name} is not a number: {value:?}"))
}

/// Only plain digit strings count as an occlusion flag.
fn occlusion_flag(value: Option<&str>) -> u32 {
    match value {
        Some(v) if !v.is_empty() && v.chars().all(|c| c.is_ascii_digit()) => v.parse().unwrap_or(0),
        _ => 0,
    }
}

pub fn parse_xml(text: &str) -> Result<AnnotationTrack> {
    let doc = roxmltree::Document::parse(text).context("malformed annotation XML")?;

    let width = parse_u32(find_text(&doc, "original_size", &["width"])?, "original_size/width")?;
    let height = parse_u32(find_text(&doc, "original_size", &["height"])?, "original_size/height")?;
    if width == 0 || height == 0 {
        bail!("image size must be positive, got {width} x {height}");
    }
    let size = ImageSize { width, height };

    let total_frames = parse_u32(find_text(&doc, "meta", &["job", "size"])?, "meta/job/size")?;

    let mut boxes = BTreeMap::new();
    for node in doc.descendants().filter(|n| n.has_tag_name("box")) {
        let frame = node
            .attribute("frame")
            .ok_or_else(|| anyhow!("box without attribute frame"))?;
        let frame = parse_u32(frame, "box frame")?;
        let normalized = NormalizedBox::from_corners(
            box_attribute(node, "xtl")?,
            box_attribute(node, "ytl")?,
            box_attribute(node, "xbr")?,
            box_attribute(node, "ybr")?,
            size,
            occlusion_flag(node.attribute("occluded")),
        );
        boxes.insert(frame, normalized);
    }
    debug!("parsed {} boxes over {} frames", boxes.len(), total_frames);

    Ok(AnnotationTrack {
        size,
        total_frames,
        boxes,
    })
}

pub fn write_text<W: Write>(track: &AnnotationTrack, writer: &mut W) -> Result<()> {
    for frame in 0..track.total_frames {
        match track.boxes.get(&frame) {
            Some(b) => writeln!(
                writer,
                "{},{:.6},{:.6},{:.6},{:.6},{}",
                frame, b.cx, b.cy, b.w, b.h, b.occluded
            )?,
            None => writeln!(writer, "{}", frame)?,
        }
    }
    Ok(())
}

pub fn convert_xml_to_txt(input: &Path, output: &Path) -> Result<AnnotationTrack> {
    let text = fs::read_to_string(input).with_context(|| format!("cannot read {}", input.display()))?;
    let track = parse_xml(&text).with_context(|| format!("cannot convert {}", input.display()))?;

    let file = File::create(output).with_context(|| format!("cannot create {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    write_text(&track, &mut writer)?;
    writer.flush()?;
    Ok(track)
}

/// Parse the per-frame text format. Index `i` of the result holds frame `i`.
pub fn read_text<R: BufRead>(reader: R) -> Result<Vec<Option<NormalizedBox>>> {
    let mut frames: Vec<Option<NormalizedBox>> = vec![];
    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let frame: usize = fields[0]
            .parse()
            .with_context(|| format!("line {}: bad frame index {:?}", line_number + 1, fields[0]))?;

        let value = match fields.len() {
            1 => None,
            5 | 6 => {
                let mut v = [0.; 4];
                for (i, field) in fields[1..5].iter().enumerate() {
                    v[i] = field
                        .parse()
                        .with_context(|| format!("line {}: bad coordinate {:?}", line_number + 1, field))?;
                }
                let occluded = occlusion_flag(fields.get(5).copied());
                Some(NormalizedBox {
                    cx: v[0],
                    cy: v[1],
                    w: v[2],
                    h: v[3],
                    occluded,
                })
            }
            n => bail!("line {}: expected 1, 5 or 6 fields, got {}", line_number + 1, n),
        };

        if frames.len() <= frame {
            frames.resize(frame + 1, None);
        }
        frames[frame] = value;
    }
    Ok(frames)
}

pub fn load_text(path: &Path) -> Result<Vec<Option<NormalizedBox>>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    read_text(BufReader::new(file)).with_context(|| format!("cannot parse {}", path.display()))
}

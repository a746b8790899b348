/// Pixel rectangle of a figure region
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Area {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Area {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Shrink by the given margins, never below one pixel
    pub fn inset(&self, left: i32, top: i32, right: i32, bottom: i32) -> Area {
        Area {
            x: self.x + left,
            y: self.y + top,
            width: (self.width - left - right).max(1),
            height: (self.height - top - bottom).max(1),
        }
    }

    /// Split horizontally into `n` equal columns
    pub fn columns(&self, n: usize) -> Vec<Area> {
        if n == 0 {
            return vec![];
        }
        let width = self.width / n as i32;
        (0..n as i32)
            .map(|i| Area::new(self.x + i * width, self.y, width, self.height))
            .collect()
    }
}

/// Closed value range shown along one axis
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Axis {
    pub min: f64,
    pub max: f64,
}

impl Axis {
    /// Range covering every finite value, widened when degenerate. An empty
    /// input gives `0..1`.
    pub fn covering<I: IntoIterator<Item = f64>>(values: I) -> Axis {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values.into_iter().filter(|v| v.is_finite()) {
            min = min.min(v);
            max = max.max(v);
        }
        if !min.is_finite() {
            return Axis { min: 0., max: 1. };
        }
        if max - min < f64::EPSILON {
            let pad = if min.abs() > f64::EPSILON { min.abs() * 0.1 } else { 1. };
            return Axis {
                min: min - pad,
                max: max + pad,
            };
        }
        Axis { min, max }
    }

    /// Same range with 5% head room on both ends
    pub fn padded(&self) -> Axis {
        let pad = (self.max - self.min) * 0.05;
        Axis {
            min: self.min - pad,
            max: self.max + pad,
        }
    }

    /// Extend the range down or up so that it contains zero
    pub fn with_zero(&self) -> Axis {
        Axis {
            min: self.min.min(0.),
            max: self.max.max(0.),
        }
    }

    /// Linear map from data space to `[start, end]` pixels
    pub fn to_pixel(&self, value: f64, start: i32, end: i32) -> i32 {
        let t = (value - self.min) / (self.max - self.min);
        (start as f64 + t * (end - start) as f64).round() as i32
    }

    pub fn ticks(&self, target: usize) -> Vec<f64> {
        nice_ticks(self.min, self.max, target)
    }
}

/// Round `range` to 1, 2, 5 or 10 times a power of ten.
fn nice_number(range: f64, round: bool) -> f64 {
    let exponent = range.log10().floor();
    let fraction = range / 10_f64.powf(exponent);
    let nice = if round {
        if fraction < 1.5 {
            1.
        } else if fraction < 3. {
            2.
        } else if fraction < 7. {
            5.
        } else {
            10.
        }
    } else if fraction <= 1. {
        1.
    } else if fraction <= 2. {
        2.
    } else if fraction <= 5. {
        5.
    } else {
        10.
    };
    nice * 10_f64.powf(exponent)
}

/// Tick spacing for roughly `target` ticks over `[min, max]`
pub fn tick_step(min: f64, max: f64, target: usize) -> f64 {
    let range = nice_number(max - min, false);
    nice_number(range / (target.max(2) - 1) as f64, true)
}

/// Round tick positions inside `[min, max]`
pub fn nice_ticks(min: f64, max: f64, target: usize) -> Vec<f64> {
    if !(max > min) {
        return vec![min];
    }
    let step = tick_step(min, max, target);
    let scale = 10_f64.powi(tick_decimals(step) as i32 + 2);
    let first = (min / step).ceil() * step;
    let mut ticks = vec![];
    let mut i = 0;
    loop {
        let tick = first + i as f64 * step;
        if tick > max + step * 1e-9 {
            break;
        }
        // snap values like 0.6000000000000001
        ticks.push((tick * scale).round() / scale);
        i += 1;
    }
    ticks
}

fn tick_decimals(step: f64) -> usize {
    if step >= 1. {
        0
    } else {
        (-step.log10().floor()) as usize
    }
}

/// Label for a tick with just enough decimals for `step`
pub fn format_tick(value: f64, step: f64) -> String {
    let decimals = tick_decimals(step);
    let text = format!("{:.*}", decimals, value);
    if text.starts_with('-') && text[1..].chars().all(|c| c == '0' || c == '.') {
        text[1..].to_string()
    } else {
        text
    }
}

use std::fmt::Display;

/// Rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    /// X coordinate of the top-left corner.
    pub x: f32,
    /// Y coordinate of the top-left corner.
    pub y: f32,
    /// Width of the rectangle.
    pub width: f32,
    /// Height of the rectangle.
    pub height: f32,
}

/// Rectangle position used for chaining constructors.
pub struct RectPosition {
    pub x: f32,
    pub y: f32,
}

impl RectPosition {
    /// Makes a rectangle with the given size.
    pub fn with_size(&self, width: f32, height: f32) -> Rect {
        Rect {
            x: self.x,
            y: self.y,
            width,
            height,
        }
    }
}

impl Rect {
    /// Starts a rectangle with the given position.
    pub fn at(x: f32, y: f32) -> RectPosition {
        RectPosition { x, y }
    }

    /// Makes a rectangle from its center and size.
    pub fn centered_at(cx: f32, cy: f32, width: f32, height: f32) -> Rect {
        Rect::at(cx - width / 2.0, cy - height / 2.0).with_size(width, height)
    }

    /// Right end of the rectangle.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom end of the rectangle.
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Quantizes the rectangle to whole pixels, truncating toward zero.
    pub fn to_pixel_rect(&self) -> PixelRect {
        PixelRect {
            x: self.x as i32,
            y: self.y as i32,
            width: self.width as i32,
            height: self.height as i32,
        }
    }

    /// Gets the rectangle as a tuple of (x, y, width, height).
    pub fn to_xywh(&self) -> (f32, f32, f32, f32) {
        (self.x, self.y, self.width, self.height)
    }
}

impl Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{x: {}, y: {}, width: {}, height: {}}}",
            self.x, self.y, self.width, self.height
        )
    }
}

/// Integer rectangle covering the half-open pixel range `[x, x + width) × [y, y + height)`.
///
/// Overlap between detections is measured on this grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelRect {
    /// Number of pixels covered; zero for empty or inverted rectangles.
    pub fn area(&self) -> i64 {
        if self.width <= 0 || self.height <= 0 {
            0
        } else {
            self.width as i64 * self.height as i64
        }
    }

    /// Intersects two rectangles, or `None` when they do not share a pixel.
    pub fn intersection(&self, other: &PixelRect) -> Option<PixelRect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = (self.x as i64 + self.width as i64).min(other.x as i64 + other.width as i64);
        let bottom = (self.y as i64 + self.height as i64).min(other.y as i64 + other.height as i64);

        let width = right - left as i64;
        let height = bottom - top as i64;
        if width <= 0 || height <= 0 {
            return None;
        }

        Some(PixelRect {
            x: left,
            y: top,
            width: width as i32,
            height: height as i32,
        })
    }

    /// Intersection over union. Two empty rectangles count as a full overlap.
    pub fn iou(&self, other: &PixelRect) -> f32 {
        if self.area() + other.area() <= 0 {
            return 1.0;
        }
        let intersection = self.intersection(other).map_or(0, |rect| rect.area());
        let union = self.area() + other.area() - intersection;
        (intersection as f64 / union as f64) as f32
    }
}

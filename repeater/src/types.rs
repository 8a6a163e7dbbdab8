/// Identifies a visual element handed out by an [`crate::ElementFactory`].
///
/// The repeater never owns the element itself; it only tracks metadata keyed by this id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElementId(pub u64);

pub type ItemKey = u64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Orientation {
    #[default]
    Vertical,
    Horizontal,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    pub const INFINITE: Size = Size {
        width: f64::INFINITY,
        height: f64::INFINITY,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// A window without bounds. Layouts treat it as "realize everything".
    pub const INFINITE: Rect = Rect {
        x: 0.0,
        y: 0.0,
        width: f64::INFINITY,
        height: f64::INFINITY,
    };

    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn is_infinite(&self) -> bool {
        self.width.is_infinite() || self.height.is_infinite()
    }
}

impl Orientation {
    pub fn major(self, size: Size) -> f64 {
        match self {
            Self::Vertical => size.height,
            Self::Horizontal => size.width,
        }
    }

    pub fn minor(self, size: Size) -> f64 {
        match self {
            Self::Vertical => size.width,
            Self::Horizontal => size.height,
        }
    }

    pub fn major_start(self, rect: Rect) -> f64 {
        match self {
            Self::Vertical => rect.y,
            Self::Horizontal => rect.x,
        }
    }

    pub fn major_size(self, rect: Rect) -> f64 {
        self.major(rect.size())
    }

    pub fn major_end(self, rect: Rect) -> f64 {
        self.major_start(rect) + self.major_size(rect)
    }

    pub fn minor_start(self, rect: Rect) -> f64 {
        match self {
            Self::Vertical => rect.x,
            Self::Horizontal => rect.y,
        }
    }

    pub fn minor_size(self, rect: Rect) -> f64 {
        self.minor(rect.size())
    }

    pub fn size(self, major: f64, minor: f64) -> Size {
        match self {
            Self::Vertical => Size::new(minor, major),
            Self::Horizontal => Size::new(major, minor),
        }
    }

    pub fn rect(self, major_start: f64, minor_start: f64, major: f64, minor: f64) -> Rect {
        match self {
            Self::Vertical => Rect::new(minor_start, major_start, minor, major),
            Self::Horizontal => Rect::new(major_start, minor_start, major, minor),
        }
    }

    /// Overlap test along the major axis only (edges count as touching).
    pub fn intersects_major(self, window: Rect, bounds: Rect) -> bool {
        self.major_start(bounds) <= self.major_end(window)
            && self.major_end(bounds) >= self.major_start(window)
    }
}

//! Flow-layout container
//!
//! Children are placed left to right and wrap onto a new row when the next
//! child would overflow the available width. Each row is as tall as its
//! tallest child.

/// Width/height pair in toolkit logical pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    /// Horizontal size
    pub width: f64,
    /// Vertical size
    pub height: f64,
}

impl Extent {
    /// Create a new extent
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Position and size assigned to one child by [`FlowLayout::arrange`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Index of the child in insertion order
    pub index: usize,
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Assigned size (the child's preferred size)
    pub size: Extent,
}

/// A container that arranges children in wrapping rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowLayout {
    /// Preferred size of each child, in insertion order
    children: Vec<Extent>,
    /// Gap between neighbours, both horizontally and vertically
    spacing: f64,
}

impl FlowLayout {
    /// Create an empty container with no spacing
    #[must_use]
    pub const fn new() -> Self {
        Self {
            children: Vec::new(),
            spacing: 0.0,
        }
    }

    /// Create an empty container with the given spacing between children
    #[must_use]
    pub const fn with_spacing(spacing: f64) -> Self {
        Self {
            children: Vec::new(),
            spacing,
        }
    }

    /// Append a child with its preferred size
    pub fn push(&mut self, preferred: Extent) {
        self.children.push(preferred);
    }

    /// Number of children
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// True when the container has no children
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Compute child placements for the given available width
    ///
    /// A child wider than `available_width` still gets a row of its own.
    #[must_use]
    pub fn arrange(&self, available_width: f64) -> Vec<Placement> {
        let mut placements = Vec::with_capacity(self.children.len());
        let mut x = 0.0;
        let mut y = 0.0;
        let mut row_height: f64 = 0.0;

        for (index, size) in self.children.iter().copied().enumerate() {
            let row_started = x > 0.0;
            if row_started && x + size.width > available_width {
                y += row_height + self.spacing;
                x = 0.0;
                row_height = 0.0;
            }

            placements.push(Placement { index, x, y, size });
            x += size.width + self.spacing;
            row_height = row_height.max(size.height);
        }

        placements
    }

    /// Total height needed to show every child at the given width
    #[must_use]
    pub fn required_height(&self, available_width: f64) -> f64 {
        self.arrange(available_width)
            .iter()
            .map(|p| p.y + p.size.height)
            .fold(0.0, f64::max)
    }
}

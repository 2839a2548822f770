//! Line-based geometry for the 4D visualizer.
//!
//! Shapes are built as lists of [`Line`]s and then indexed into a [`Geometry`]: a
//! deduplicated point list plus [`LineIndices`] pairs. Points are 4D spatial vectors
//! `(x, y, z, q)`. They carry no homogeneous component, which the matrix product adds
//! implicitly.
//!
//! # Quick Start
//!
//! ```
//! use tesseract::Geometry;
//!
//! let tesseract = Geometry::tesseract(1.0).unwrap();
//! assert_eq!(tesseract.points.len(), 16);
//! assert_eq!(tesseract.lines.len(), 32);
//!
//! let axis = Geometry::axis();
//! assert!(!axis.four_dimensional);
//! ```
//!
//! # Builders
//!
//! | Builder | Points | Lines | 4D |
//! |---------|--------|-------|----|
//! | [`Geometry::tesseract`] | 16 | 32 | yes |
//! | [`Geometry::pentachoron`] | 5 | 10 | yes |
//! | [`Geometry::axis`] | 5 | 4 | no |
//! | [`Geometry::grid`] | 121 | 218 | no |

use std::fmt;

use crate::error::{MathError, Result};
use crate::vector::VectorN;

/// Spatial dimension of geometry points.
pub const POINT_DIMENSION: usize = 4;

/// Palette entries a line can be drawn with.
///
/// Colors are resolved to actual values by the renderer, so switching palettes never
/// requires rebuilding geometry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SymbolicColor {
    #[default]
    Primary,
    Accent,
    X,
    Y,
    Z,
    Q,
}

impl SymbolicColor {
    pub const ALL: [SymbolicColor; 6] = [
        SymbolicColor::Primary,
        SymbolicColor::Accent,
        SymbolicColor::X,
        SymbolicColor::Y,
        SymbolicColor::Z,
        SymbolicColor::Q,
    ];

    /// Position of this color in [`ALL`](Self::ALL), used as the palette index.
    pub fn index(self) -> u32 {
        self as u32
    }
}

/// A line between two points. `color` overrides the geometry's color.
#[derive(Clone, Debug, PartialEq)]
pub struct Line {
    pub start: VectorN,
    pub end: VectorN,
    pub color: Option<SymbolicColor>,
}

impl Line {
    pub fn new(start: VectorN, end: VectorN) -> Self {
        Self {
            start,
            end,
            color: None,
        }
    }

    pub fn colored(mut self, color: SymbolicColor) -> Self {
        self.color = Some(color);
        self
    }
}

/// A line referring to two entries of [`Geometry::points`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineIndices {
    pub from: usize,
    pub to: usize,
    pub color: SymbolicColor,
}

/// Indexed line geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    pub name: String,
    pub points: Vec<VectorN>,
    pub lines: Vec<LineIndices>,
    /// Color of lines that do not name their own.
    pub color: SymbolicColor,
    /// Whether the points are folded through a 4D visualizer before display.
    pub four_dimensional: bool,
}

impl Geometry {
    /// Indexes `lines`, merging equal points and dropping repeated edges.
    ///
    /// Fails with `DimensionMismatch` unless every point is 4D.
    pub fn from_lines(name: impl Into<String>, lines: &[Line], color: SymbolicColor) -> Result<Self> {
        for p in lines.iter().flat_map(|l| [&l.start, &l.end]) {
            if p.dimension() != POINT_DIMENSION {
                return Err(MathError::mismatch(POINT_DIMENSION, p.dimension()));
            }
        }
        Ok(Self::indexed(name.into(), lines, color))
    }

    /// Indexing behind [`from_lines`](Self::from_lines), for lines of 4D points.
    fn indexed(name: String, lines: &[Line], color: SymbolicColor) -> Self {
        let mut geometry = Self {
            name,
            points: Vec::new(),
            lines: Vec::with_capacity(lines.len()),
            color,
            four_dimensional: false,
        };
        for line in lines {
            let from = geometry.index_of(&line.start);
            let to = geometry.index_of(&line.end);
            let duplicate = geometry
                .lines
                .iter()
                .any(|l| (l.from, l.to) == (from, to) || (l.from, l.to) == (to, from));
            if !duplicate {
                geometry.lines.push(LineIndices {
                    from,
                    to,
                    color: line.color.unwrap_or(color),
                });
            }
        }
        geometry
    }

    fn index_of(&mut self, point: &VectorN) -> usize {
        match self.points.iter().position(|p| p == point) {
            Some(index) => index,
            None => {
                self.points.push(point.clone());
                self.points.len() - 1
            }
        }
    }

    /// Marks the geometry as four-dimensional.
    pub fn four_dimensional(mut self) -> Self {
        self.four_dimensional = true;
        self
    }

    /// A hypercube with corners at `±half_extent` in x, y and z, extruded along q from
    /// `q = 1` to `q = 2`.
    ///
    /// Keeping q away from zero gives the wireframe projection its nested-cube image.
    pub fn tesseract(half_extent: f32) -> Result<Self> {
        let h = half_extent;
        let p = |x: f32, y: f32| VectorN::from_slice(&[x, y, -h, 1.0]);
        let square = quadrilateral(p(-h, -h), p(h, -h), p(h, h), p(-h, h));
        let cube = extruded(&square, &VectorN::from_slice(&[0.0, 0.0, 2.0 * h, 0.0]))?;
        let hypercube = extruded(&cube, &VectorN::from_slice(&[0.0, 0.0, 0.0, 1.0]))?;
        Ok(Self::from_lines("Tesseract", &hypercube, SymbolicColor::Accent)?.four_dimensional())
    }

    /// A regular 5-cell whose base tetrahedron has radius one.
    pub fn pentachoron() -> Result<Self> {
        let s3 = 3.0f32.sqrt();
        let s2 = 2.0f32.sqrt();
        let corners = [
            [0.0, 0.0, 1.0, 0.0],
            [s3 / 2.0, 0.0, -0.5, 0.0],
            [-s3 / 2.0, 0.0, -0.5, 0.0],
            [0.0, s2, 0.0, 0.0],
            [0.0, s2 / 4.0, 0.0, 30.0f32.sqrt() / 4.0],
        ]
        .map(|c| VectorN::from_slice(&c));

        let mut lines = Vec::new();
        for (i, a) in corners.iter().enumerate() {
            for b in &corners[i + 1..] {
                lines.push(Line::new(a.clone(), b.clone()));
            }
        }
        Ok(Self::from_lines("Pentachoron", &lines, SymbolicColor::Accent)?.four_dimensional())
    }

    /// Four unit axes from the origin, colored per axis.
    pub fn axis() -> Self {
        let origin = VectorN::new(POINT_DIMENSION);
        let mut lines = Vec::new();
        for (axis, color) in [SymbolicColor::X, SymbolicColor::Y, SymbolicColor::Z, SymbolicColor::Q]
            .into_iter()
            .enumerate()
        {
            let mut end = VectorN::new(POINT_DIMENSION);
            end[axis] = 1.0;
            lines.push(Line::new(origin.clone(), end).colored(color));
        }
        Self::indexed("Axis".to_string(), &lines, SymbolicColor::Primary)
    }

    /// A unit grid on the XZ plane spanning `-5..=5`, leaving out the unit segments
    /// covered by the x and z axes.
    pub fn grid() -> Self {
        const START: i32 = -5;
        const END: i32 = 5;
        let point = |x: i32, z: i32| VectorN::from_slice(&[x as f32, 0.0, z as f32, 0.0]);

        let mut lines = Vec::new();
        for z in START..=END {
            for x in START..END {
                if z == 0 && x == 0 {
                    continue;
                }
                lines.push(Line::new(point(x, z), point(x + 1, z)));
            }
        }
        for x in START..=END {
            for z in START..END {
                if x == 0 && z == 0 {
                    continue;
                }
                lines.push(Line::new(point(x, z), point(x, z + 1)));
            }
        }
        Self::indexed("Grid".to_string(), &lines, SymbolicColor::Primary)
    }

    /// Computes the axis-aligned bounding box.
    ///
    /// Returns `(min, max)` corners; both are zero for an empty geometry.
    pub fn bounds(&self) -> (VectorN, VectorN) {
        let Some(first) = self.points.first() else {
            return (VectorN::new(POINT_DIMENSION), VectorN::new(POINT_DIMENSION));
        };
        let mut min = first.clone();
        let mut max = first.clone();
        for p in &self.points[1..] {
            for i in 0..p.dimension().min(min.dimension()) {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }
        (min, max)
    }

    /// Returns the center of the bounding box.
    pub fn center(&self) -> VectorN {
        let (min, max) = self.bounds();
        VectorN::from_fn(min.dimension(), |i| (min[i] + max[i]) * 0.5)
    }

    /// Translates all points by `offset`.
    pub fn translate(&mut self, offset: &VectorN) -> Result<()> {
        if offset.dimension() != POINT_DIMENSION {
            return Err(MathError::mismatch(POINT_DIMENSION, offset.dimension()));
        }
        for p in &mut self.points {
            p.add_in_place(offset)?;
        }
        Ok(())
    }

    /// Scales all points uniformly around the origin.
    pub fn scale(&mut self, factor: f32) {
        for p in &mut self.points {
            *p *= factor;
        }
    }

    /// Moves the bounding box center to the origin.
    pub fn recenter(&mut self) -> Result<()> {
        let center = self.center();
        self.translate(&-&center)
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The four edges of the quadrilateral `a b c d`.
pub fn quadrilateral(a: VectorN, b: VectorN, c: VectorN, d: VectorN) -> Vec<Line> {
    vec![
        Line::new(a.clone(), b.clone()),
        Line::new(b, c.clone()),
        Line::new(c, d.clone()),
        Line::new(d, a),
    ]
}

/// `lines`, a copy of `lines` moved by `direction`, and the edges connecting both.
pub fn extruded(lines: &[Line], direction: &VectorN) -> Result<Vec<Line>> {
    let mut out = Vec::with_capacity(lines.len() * 4);
    out.extend(lines.iter().cloned());
    for line in lines {
        out.push(Line {
            start: line.start.try_add(direction)?,
            end: line.end.try_add(direction)?,
            color: line.color,
        });
    }
    for line in lines {
        for p in [&line.start, &line.end] {
            out.push(Line {
                start: p.clone(),
                end: p.try_add(direction)?,
                color: line.color,
            });
        }
    }
    Ok(out)
}

//! Geometry buffers and bounding volumes
//!
//! A [`Geometry`] is a set of parallel vertex-attribute buffers plus an
//! optional index buffer. Every buffer stores raw `f32` components; the
//! attribute kind determines how many components make up one vertex. The
//! struct keeps its buffers private so the length invariant (every buffer
//! holds `vertex_count * components` floats) survives mutation.

use std::collections::HashMap;

use thiserror::Error;

use crate::foundation::collections::TypedHandle;
use crate::foundation::math::Vec3;

/// Typed handle to a geometry stored in the scene graph
pub type GeometryHandle = TypedHandle<Geometry>;

/// Vertex attribute kinds a geometry can carry
///
/// Position is required on every geometry; the rest are optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    /// Vertex position, 3 components
    Position,
    /// Vertex normal, 3 components
    Normal,
    /// Primary texture coordinates, 2 components
    Uv0,
    /// Secondary texture coordinates, 2 components
    Uv1,
    /// Vertex color, 4 components (RGBA)
    Color,
    /// Tangent with handedness, 4 components
    Tangent,
}

impl VertexAttribute {
    /// All attribute kinds in canonical order
    pub const ALL: [VertexAttribute; 6] = [
        VertexAttribute::Position,
        VertexAttribute::Normal,
        VertexAttribute::Uv0,
        VertexAttribute::Uv1,
        VertexAttribute::Color,
        VertexAttribute::Tangent,
    ];

    /// Number of `f32` components one vertex contributes to this buffer
    pub fn component_count(self) -> usize {
        match self {
            VertexAttribute::Position | VertexAttribute::Normal => 3,
            VertexAttribute::Uv0 | VertexAttribute::Uv1 => 2,
            VertexAttribute::Color | VertexAttribute::Tangent => 4,
        }
    }

    /// Per-vertex default components synthesized when a merge member lacks
    /// this attribute: up normal, zero UVs, opaque white color, +X tangent.
    /// Position has no default; it can never be synthesized.
    pub fn default_components(self) -> Option<&'static [f32]> {
        match self {
            VertexAttribute::Position => None,
            VertexAttribute::Normal => Some(&[0.0, 1.0, 0.0]),
            VertexAttribute::Uv0 | VertexAttribute::Uv1 => Some(&[0.0, 0.0]),
            VertexAttribute::Color => Some(&[1.0, 1.0, 1.0, 1.0]),
            VertexAttribute::Tangent => Some(&[1.0, 0.0, 0.0, 1.0]),
        }
    }
}

/// Errors raised by geometry construction and validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeometryError {
    /// Position buffer length is not divisible by the component width
    #[error("position buffer length {0} is not a multiple of 3")]
    UnalignedPositions(usize),

    /// An attribute buffer disagrees with the geometry's vertex count
    #[error("{attribute:?} buffer holds {actual} floats, expected {expected}")]
    BufferLengthMismatch {
        /// The offending attribute
        attribute: VertexAttribute,
        /// Expected length: vertex count times component width
        expected: usize,
        /// Actual buffer length
        actual: usize,
    },

    /// An index refers past the end of the vertex buffers
    #[error("index {index} is out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        /// The offending index value
        index: u32,
        /// Number of vertices in the geometry
        vertex_count: usize,
    },
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl AABB {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Compute the AABB of a raw position buffer (x,y,z triples)
    ///
    /// Returns `None` for an empty buffer.
    pub fn from_positions(positions: &[f32]) -> Option<Self> {
        let mut triples = positions.chunks_exact(3);
        let first = triples.next()?;
        let mut min = Vec3::new(first[0], first[1], first[2]);
        let mut max = min;
        for triple in triples {
            min.x = min.x.min(triple[0]);
            min.y = min.y.min(triple[1]);
            min.z = min.z.min(triple[2]);
            max.x = max.x.max(triple[0]);
            max.y = max.y.max(triple[1]);
            max.z = max.z.max(triple[2]);
        }
        Some(Self { min, max })
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }
}

/// Vertex and index buffer set defining a shape
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    attributes: HashMap<VertexAttribute, Vec<f32>>,
    indices: Option<Vec<u32>>,
    bounding_box: Option<AABB>,
}

impl Geometry {
    /// Create a geometry from a position buffer (x,y,z triples)
    pub fn new(positions: Vec<f32>) -> Result<Self, GeometryError> {
        if positions.len() % 3 != 0 {
            return Err(GeometryError::UnalignedPositions(positions.len()));
        }
        let mut attributes = HashMap::new();
        attributes.insert(VertexAttribute::Position, positions);
        Ok(Self {
            attributes,
            indices: None,
            bounding_box: None,
        })
    }

    /// Builder form of [`Geometry::set_attribute`]
    pub fn with_attribute(
        mut self,
        attribute: VertexAttribute,
        data: Vec<f32>,
    ) -> Result<Self, GeometryError> {
        self.set_attribute(attribute, data)?;
        Ok(self)
    }

    /// Builder form of [`Geometry::set_indices`]
    pub fn with_indices(mut self, indices: Vec<u32>) -> Result<Self, GeometryError> {
        self.set_indices(indices)?;
        Ok(self)
    }

    /// Store an attribute buffer, checking it against the vertex count
    ///
    /// Replacing the position buffer must keep the vertex count unchanged
    /// once other attributes exist, since they would all be invalidated.
    pub fn set_attribute(
        &mut self,
        attribute: VertexAttribute,
        data: Vec<f32>,
    ) -> Result<(), GeometryError> {
        if attribute == VertexAttribute::Position {
            if data.len() % 3 != 0 {
                return Err(GeometryError::UnalignedPositions(data.len()));
            }
            if self.attributes.len() > 1 && data.len() != self.vertex_count() * 3 {
                return Err(GeometryError::BufferLengthMismatch {
                    attribute,
                    expected: self.vertex_count() * 3,
                    actual: data.len(),
                });
            }
        } else {
            let expected = self.vertex_count() * attribute.component_count();
            if data.len() != expected {
                return Err(GeometryError::BufferLengthMismatch {
                    attribute,
                    expected,
                    actual: data.len(),
                });
            }
        }
        self.attributes.insert(attribute, data);
        Ok(())
    }

    /// Store an index buffer, checking every index against the vertex count
    pub fn set_indices(&mut self, indices: Vec<u32>) -> Result<(), GeometryError> {
        let vertex_count = self.vertex_count();
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(GeometryError::IndexOutOfRange {
                index,
                vertex_count,
            });
        }
        self.indices = Some(indices);
        Ok(())
    }

    /// Get an attribute buffer if present
    pub fn attribute(&self, attribute: VertexAttribute) -> Option<&[f32]> {
        self.attributes.get(&attribute).map(Vec::as_slice)
    }

    /// Whether the geometry carries the given attribute
    pub fn has_attribute(&self, attribute: VertexAttribute) -> bool {
        self.attributes.contains_key(&attribute)
    }

    /// Attribute kinds present on this geometry, in canonical order
    pub fn attribute_kinds(&self) -> Vec<VertexAttribute> {
        VertexAttribute::ALL
            .into_iter()
            .filter(|kind| self.attributes.contains_key(kind))
            .collect()
    }

    /// The position buffer (always present)
    pub fn positions(&self) -> &[f32] {
        self.attributes
            .get(&VertexAttribute::Position)
            .map_or(&[], Vec::as_slice)
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.positions().len() / 3
    }

    /// The index buffer if present
    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    /// Number of indices, zero when non-indexed
    pub fn index_count(&self) -> usize {
        self.indices.as_ref().map_or(0, Vec::len)
    }

    /// Whether the geometry has an index buffer
    pub fn is_indexed(&self) -> bool {
        self.indices.is_some()
    }

    /// Triangle count: indices / 3, or zero for non-indexed geometry
    pub fn triangle_count(&self) -> usize {
        self.index_count() / 3
    }

    /// Cached bounding box, if one was computed
    pub fn bounding_box(&self) -> Option<&AABB> {
        self.bounding_box.as_ref()
    }

    /// Recompute the bounding box from the current position buffer
    pub fn recompute_bounding_box(&mut self) {
        self.bounding_box = AABB::from_positions(self.positions());
    }

    /// Check the buffer-length invariant and index ranges
    pub fn validate(&self) -> Result<(), GeometryError> {
        let positions_len = self.positions().len();
        if positions_len % 3 != 0 {
            return Err(GeometryError::UnalignedPositions(positions_len));
        }
        let vertex_count = positions_len / 3;
        for (&attribute, buffer) in &self.attributes {
            let expected = vertex_count * attribute.component_count();
            if buffer.len() != expected {
                return Err(GeometryError::BufferLengthMismatch {
                    attribute,
                    expected,
                    actual: buffer.len(),
                });
            }
        }
        if let Some(indices) = &self.indices {
            if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(GeometryError::IndexOutOfRange {
                    index,
                    vertex_count,
                });
            }
        }
        Ok(())
    }
}

use std::sync::Arc;

use bevy::{
    prelude::*,
    mesh::{Indices, VertexAttributeValues},
};

/// One vertex of a source or bent mesh.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MeshVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tangent: Vec4,
    pub uv: Vec2,
}

/// Plain vertex and index buffers of a triangle mesh.
///
/// Attribute vectors are parallel; `normals`, `tangents` and `uvs` may be
/// empty when the mesh has no such attribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tangents: Vec<Vec4>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// The `index`th vertex, with zeroed attributes where missing.
    pub fn vertex(&self, index: usize) -> MeshVertex {
        MeshVertex {
            position: self.positions[index],
            normal: self.normals.get(index).copied().unwrap_or_default(),
            tangent: self.tangents.get(index).copied().unwrap_or_default(),
            uv: self.uvs.get(index).copied().unwrap_or_default(),
        }
    }

    /// Read the buffers of a Bevy mesh.
    ///
    /// Returns `None` if the mesh has no `Float32x3` positions. A mesh
    /// without indices is read as a plain triangle list.
    pub fn from_mesh(mesh: &Mesh) -> Option<Self> {
        let positions = match mesh.attribute(Mesh::ATTRIBUTE_POSITION)? {
            VertexAttributeValues::Float32x3(v) => v.iter().map(|p| Vec3::from_array(*p)).collect::<Vec<_>>(),
            _ => return None,
        };

        let normals = match mesh.attribute(Mesh::ATTRIBUTE_NORMAL) {
            Some(VertexAttributeValues::Float32x3(v)) => v.iter().map(|n| Vec3::from_array(*n)).collect(),
            _ => Vec::new(),
        };

        let tangents = match mesh.attribute(Mesh::ATTRIBUTE_TANGENT) {
            Some(VertexAttributeValues::Float32x4(v)) => v.iter().map(|t| Vec4::from_array(*t)).collect(),
            _ => Vec::new(),
        };

        let uvs = match mesh.attribute(Mesh::ATTRIBUTE_UV_0) {
            Some(VertexAttributeValues::Float32x2(v)) => v.iter().map(|uv| Vec2::from_array(*uv)).collect(),
            _ => Vec::new(),
        };

        let indices = match mesh.indices() {
            Some(Indices::U16(i)) => i.iter().map(|&i| i as u32).collect(),
            Some(Indices::U32(i)) => i.clone(),
            None => (0..positions.len() as u32).collect(),
        };

        Some(Self {
            positions,
            normals,
            tangents,
            uvs,
            indices,
        })
    }
}

/// A transformed, read-only view over shared [`MeshData`].
///
/// The transform is applied once, when the view is built. `translate`,
/// `rotate` and `scale_res` return new views over the same data.
#[derive(Debug, Clone)]
pub struct SourceMesh {
    data: Arc<MeshData>,
    translation: Vec3,
    rotation: Quat,
    scale: Vec3,

    vertices: Vec<MeshVertex>,
    triangles: Vec<u32>,
    min_x: f32,
    length: f32,
    min_y: f32,
    length_y: f32,
}

impl SourceMesh {
    /// Build an untransformed view over `data`.
    pub fn new(data: impl Into<Arc<MeshData>>) -> Self {
        Self::build(data.into(), Vec3::ZERO, Quat::IDENTITY, Vec3::ONE)
    }

    /// Same mesh, translated by `translation` after rotation and scale.
    pub fn translate(&self, translation: Vec3) -> Self {
        Self::build(self.data.clone(), translation, self.rotation, self.scale)
    }

    /// Same mesh, rotated by `rotation`.
    pub fn rotate(&self, rotation: Quat) -> Self {
        Self::build(self.data.clone(), self.translation, rotation, self.scale)
    }

    /// Same mesh, scaled by `scale`.
    pub fn scale_res(&self, scale: Vec3) -> Self {
        Self::build(self.data.clone(), self.translation, self.rotation, scale)
    }

    fn build(data: Arc<MeshData>, translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        let vertices: Vec<MeshVertex> = (0..data.vertex_count())
            .map(|i| {
                let mut vertex = data.vertex(i);
                if rotation != Quat::IDENTITY {
                    vertex.position = rotation * vertex.position;
                    vertex.normal = rotation * vertex.normal;
                    vertex.tangent = (rotation * vertex.tangent.truncate()).extend(vertex.tangent.w);
                }
                vertex.position = vertex.position * scale + translation;
                vertex
            })
            .collect();

        // an odd number of mirrored axes turns every face inside out
        let negative_axes = scale.to_array().iter().filter(|s| **s < 0.0).count();
        let mut triangles = data.indices.clone();
        if negative_axes % 2 == 1 {
            for triangle in triangles.chunks_exact_mut(3) {
                triangle.swap(0, 1);
            }
        }

        let (min_x, max_x) = extent(vertices.iter().map(|v| v.position.x));
        let (min_y, max_y) = extent(vertices.iter().map(|v| v.position.y));

        Self {
            data,
            translation,
            rotation,
            scale,
            vertices,
            triangles,
            min_x,
            length: (max_x - min_x).abs(),
            min_y,
            length_y: (max_y - min_y).abs(),
        }
    }

    /// The shared, untransformed mesh data.
    pub fn data(&self) -> &Arc<MeshData> {
        &self.data
    }

    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Transformed vertices.
    pub fn vertices(&self) -> &[MeshVertex] {
        &self.vertices
    }

    /// Triangle indices, with winding corrected for mirroring scales.
    pub fn triangles(&self) -> &[u32] {
        &self.triangles
    }

    /// Smallest transformed X.
    pub fn min_x(&self) -> f32 {
        self.min_x
    }

    /// Extent along X, the axis laid along the curve.
    pub fn length(&self) -> f32 {
        self.length
    }

    /// Smallest transformed Y.
    pub fn min_y(&self) -> f32 {
        self.min_y
    }

    /// Extent along Y.
    pub fn length_y(&self) -> f32 {
        self.length_y
    }
}

fn extent(values: impl Iterator<Item = f32>) -> (f32, f32) {
    let (min, max) = values.fold((f32::MAX, f32::MIN), |(min, max), v| (min.min(v), max.max(v)));
    if min > max {
        (0.0, 0.0)
    } else {
        (min, max)
    }
}

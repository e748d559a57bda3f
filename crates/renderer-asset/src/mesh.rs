use glam::Mat4;

/// One influence of a bone over a single vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VertexWeight {
    pub vertex: usize,
    pub weight: f32,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoneAsset {
    pub name: String,
    /// Mesh-space to bone-space transform as stored by the source format.
    pub offset_matrix: Mat4,
    #[cfg_attr(feature = "serde", serde(default))]
    pub weights: Vec<VertexWeight>,
}

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeshAsset {
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: Option<String>,
    pub vertex_count: usize,
    #[cfg_attr(feature = "serde", serde(default))]
    pub bones: Vec<BoneAsset>,
}

impl MeshAsset {
    pub fn has_bones(&self) -> bool {
        !self.bones.is_empty()
    }
}

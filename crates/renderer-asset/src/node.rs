use glam::{Mat4, Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatrixNodeTransform(pub Mat4);

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecomposedTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for DecomposedTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl DecomposedTransform {
    /// Splits an affine matrix into translation, rotation and scale.
    ///
    /// Matrices with a negative determinant come back with a negative scale
    /// on one axis, so reflected matrices should be corrected beforehand.
    /// A matrix with a zero-length axis has no rotation; it gets identity.
    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        let rotation = if rotation.is_finite() {
            rotation
        } else {
            Quat::IDENTITY
        };
        Self {
            translation,
            rotation,
            scale,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeTransform {
    Matrix(MatrixNodeTransform),
    Decomposed(DecomposedTransform),
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::Decomposed(DecomposedTransform::default())
    }
}

impl NodeTransform {
    pub fn matrix(&self) -> Mat4 {
        match self {
            NodeTransform::Matrix(matrix) => matrix.0,
            NodeTransform::Decomposed(decomposed) => decomposed.matrix(),
        }
    }
}

impl From<NodeTransform> for DecomposedTransform {
    fn from(value: NodeTransform) -> Self {
        match value {
            NodeTransform::Matrix(matrix) => DecomposedTransform::from_matrix(matrix.0),
            NodeTransform::Decomposed(decomposed) => decomposed,
        }
    }
}

/// A node of the imported hierarchy, already parsed by a format loader.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeAsset {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub transform: Option<NodeTransform>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub children: Vec<NodeAsset>,
}

impl NodeAsset {
    /// Local transform of the node, identity when the source gave none.
    pub fn local_matrix(&self) -> Mat4 {
        self.transform
            .as_ref()
            .map(NodeTransform::matrix)
            .unwrap_or(Mat4::IDENTITY)
    }
}

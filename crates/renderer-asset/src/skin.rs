use glam::Mat4;

use crate::{node::DecomposedTransform, skeleton::SkeletonError};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JointAsset {
    pub id: usize,
    pub name: String,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Offset matrix after reflection correction, relative to the parent.
    pub local_matrix: Mat4,
    pub local_transform: DecomposedTransform,
    pub bind_matrix: Mat4,
    pub inverse_bind_matrix: Mat4,
}

/// A resolved skeleton in bind pose. Joints are ordered by id.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkeletonAsset {
    pub joints: Vec<JointAsset>,
    /// Joints whose bind matrix could not be inverted. Their inverse bind
    /// matrix is identity.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub errors: Vec<SkeletonError>,
}

impl SkeletonAsset {
    pub fn joint(&self, id: usize) -> Option<&JointAsset> {
        self.joints.get(id)
    }

    pub fn joint_by_name(&self, name: &str) -> Option<&JointAsset> {
        self.joints.iter().find(|joint| joint.name == name)
    }

    pub fn roots(&self) -> impl Iterator<Item = &JointAsset> {
        self.joints.iter().filter(|joint| joint.parent.is_none())
    }

    pub fn bind_matrices(&self) -> Vec<Mat4> {
        self.joints.iter().map(|joint| joint.bind_matrix).collect()
    }

    pub fn inverse_bind_matrices(&self) -> Vec<Mat4> {
        self.joints
            .iter()
            .map(|joint| joint.inverse_bind_matrix)
            .collect()
    }
}

/// Integer width of a joint index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JointIndexWidth {
    U8,
    U16,
    U32,
}

impl JointIndexWidth {
    pub const U8_MAX_JOINTS: usize = 255;
    pub const U16_MAX_JOINTS: usize = 32767;

    /// Narrowest width able to address every joint of a skeleton with
    /// `joint_count` joints.
    pub fn for_joint_count(joint_count: usize) -> Self {
        if joint_count <= Self::U8_MAX_JOINTS {
            JointIndexWidth::U8
        } else if joint_count <= Self::U16_MAX_JOINTS {
            JointIndexWidth::U16
        } else {
            JointIndexWidth::U32
        }
    }

    pub fn size(&self) -> usize {
        match self {
            JointIndexWidth::U8 => 1,
            JointIndexWidth::U16 => 2,
            JointIndexWidth::U32 => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JointIndices {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl JointIndices {
    pub fn width(&self) -> JointIndexWidth {
        match self {
            JointIndices::U8(_) => JointIndexWidth::U8,
            JointIndices::U16(_) => JointIndexWidth::U16,
            JointIndices::U32(_) => JointIndexWidth::U32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            JointIndices::U8(indices) => indices.len(),
            JointIndices::U16(indices) => indices.len(),
            JointIndices::U32(indices) => indices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<u32> {
        match self {
            JointIndices::U8(indices) => indices.get(index).map(|&joint| joint as u32),
            JointIndices::U16(indices) => indices.get(index).map(|&joint| joint as u32),
            JointIndices::U32(indices) => indices.get(index).copied(),
        }
    }
}

/// Fixed-stride skinning attributes of one mesh.
///
/// `joints` and `weights` both hold `influences_per_vertex` slots per vertex.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkinAttributes {
    pub joints: JointIndices,
    pub weights: Vec<f32>,
    pub influences_per_vertex: usize,
    /// Largest number of influences any vertex had before reduction.
    pub max_influence_count: usize,
}

impl SkinAttributes {
    pub fn vertex_count(&self) -> usize {
        if self.influences_per_vertex == 0 {
            0
        } else {
            self.weights.len() / self.influences_per_vertex
        }
    }

    /// Number of slots per vertex that can carry a real influence.
    pub fn meaningful_influences(&self) -> usize {
        self.max_influence_count.min(self.influences_per_vertex)
    }

    pub fn vertex_joints(&self, vertex: usize) -> Vec<u32> {
        let start = vertex * self.influences_per_vertex;
        (start..start + self.influences_per_vertex)
            .filter_map(|index| self.joints.get(index))
            .collect()
    }

    pub fn vertex_weights(&self, vertex: usize) -> &[f32] {
        let start = vertex * self.influences_per_vertex;
        self.weights
            .get(start..start + self.influences_per_vertex)
            .unwrap_or(&[])
    }
}

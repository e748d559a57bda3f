use super::{mesh::MeshAsset, node::NodeAsset};

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SceneAsset {
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub nodes: Vec<NodeAsset>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub meshes: Vec<MeshAsset>,
}

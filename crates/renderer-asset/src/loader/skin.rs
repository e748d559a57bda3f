use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use log::{debug, warn};

use crate::{
    mesh::MeshAsset,
    node::NodeAsset,
    primitive::{JointIndexWidth, JointIndices, SkinAttributes},
    scene::SceneAsset,
    skeleton::{SkeletonBuilder, SkeletonError},
    skin::SkeletonAsset,
    weight::{normalize_weights, JointIndex, WeightAggregator},
};

use super::SkinLoadParams;

#[derive(Debug, Clone, PartialEq)]
pub enum SkinLoadError {
    VertexOutOfBounds {
        mesh: usize,
        bone: String,
        vertex: usize,
        vertex_count: usize,
    },
    TooManyJoints(usize),
    /// Buffers need at least one influence slot per vertex.
    InvalidInfluenceCount(usize),
}

impl Display for SkinLoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SkinLoadError::VertexOutOfBounds {
                mesh,
                bone,
                vertex,
                vertex_count,
            } => write!(
                f,
                "Bone {:?} of mesh #{} weights vertex {}, but mesh has {} vertices",
                bone, mesh, vertex, vertex_count
            ),
            SkinLoadError::TooManyJoints(count) => {
                write!(f, "Too many joints for an index buffer: {}", count)
            }
            SkinLoadError::InvalidInfluenceCount(count) => {
                write!(f, "Invalid influence count per vertex: {}", count)
            }
        }
    }
}

impl Error for SkinLoadError {}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshSkinAsset {
    pub name: Option<String>,
    /// `None` for meshes without bones.
    pub attributes: Option<SkinAttributes>,
}

#[derive(Debug, Clone)]
pub struct SkinnedSceneAsset {
    pub name: Option<String>,
    /// Skinning buffers, in the order of the scene meshes.
    pub meshes: Vec<MeshSkinAsset>,
    /// Kept apart from the mesh buffers so a broken hierarchy can be handled
    /// by dropping skinning instead of the whole scene.
    pub skeleton: Result<Option<SkeletonAsset>, SkeletonError>,
}

struct SkinLoader<'a> {
    scene: &'a SceneAsset,
    params: SkinLoadParams,
    skeleton: SkeletonBuilder,
}

impl<'a> SkinLoader<'a> {
    fn new(scene: &'a SceneAsset, params: SkinLoadParams) -> Self {
        Self {
            scene,
            params,
            skeleton: SkeletonBuilder::new(),
        }
    }

    fn assign_joint_ids(&mut self) {
        for mesh in &self.scene.meshes {
            for bone in &mesh.bones {
                self.skeleton.joint_id(&bone.name);
            }
        }
    }

    fn write_joint_indices<I: JointIndex>(
        vertices: &[WeightAggregator],
        stride: usize,
    ) -> Vec<I> {
        let mut indices = Vec::with_capacity(vertices.len() * stride);
        for vertex in vertices {
            vertex.write_indices(&mut indices);
        }
        indices
    }

    fn load_mesh(
        &mut self,
        index: usize,
        mesh: &MeshAsset,
    ) -> Result<MeshSkinAsset, SkinLoadError> {
        if !mesh.has_bones() {
            return Ok(MeshSkinAsset {
                name: mesh.name.clone(),
                attributes: None,
            });
        }

        let max_influences = self.params.max_influences;
        let mut vertices = vec![WeightAggregator::new(max_influences); mesh.vertex_count];
        for bone in &mesh.bones {
            let id = self.skeleton.joint_id(&bone.name);
            let joint = u32::try_from(id).map_err(|_| SkinLoadError::TooManyJoints(id + 1))?;
            for weight in &bone.weights {
                if !weight.weight.is_finite() {
                    warn!(
                        "Skip non-finite weight of bone {:?} on vertex {}",
                        bone.name, weight.vertex
                    );
                    continue;
                }
                let Some(vertex) = vertices.get_mut(weight.vertex) else {
                    return Err(SkinLoadError::VertexOutOfBounds {
                        mesh: index,
                        bone: bone.name.clone(),
                        vertex: weight.vertex,
                        vertex_count: mesh.vertex_count,
                    });
                };
                vertex.add(joint, weight.weight);
            }
        }

        let max_influence_count = vertices
            .iter()
            .map(WeightAggregator::count)
            .max()
            .unwrap_or(0);
        if max_influence_count > max_influences {
            debug!(
                "Mesh #{} has up to {} influences per vertex, keeping {}",
                index, max_influence_count, max_influences
            );
        }

        let stride = max_influences;
        let joints = match JointIndexWidth::for_joint_count(self.skeleton.joint_count()) {
            JointIndexWidth::U8 => JointIndices::U8(Self::write_joint_indices(&vertices, stride)),
            JointIndexWidth::U16 => JointIndices::U16(Self::write_joint_indices(&vertices, stride)),
            JointIndexWidth::U32 => JointIndices::U32(Self::write_joint_indices(&vertices, stride)),
        };
        let mut weights = Vec::with_capacity(vertices.len() * max_influences);
        for vertex in &vertices {
            vertex.write_weights(&mut weights);
        }
        if self.params.normalize_weights {
            weights.chunks_mut(max_influences).for_each(normalize_weights);
        }

        debug!(
            "Mesh #{}: {} vertices, {} bones, {:?} joint indices",
            index,
            mesh.vertex_count,
            mesh.bones.len(),
            joints.width()
        );
        Ok(MeshSkinAsset {
            name: mesh.name.clone(),
            attributes: Some(SkinAttributes {
                joints,
                weights,
                influences_per_vertex: max_influences,
                max_influence_count,
            }),
        })
    }

    fn load_meshes(&mut self) -> Result<Vec<MeshSkinAsset>, SkinLoadError> {
        let scene = self.scene;
        let mut meshes = Vec::with_capacity(scene.meshes.len());
        for (index, mesh) in scene.meshes.iter().enumerate() {
            meshes.push(self.load_mesh(index, mesh)?);
        }
        Ok(meshes)
    }

    /// Registers every subtree rooted at a node named after a mesh bone.
    /// Nodes above the topmost bones are not part of the skeleton.
    fn register_nodes(&mut self, nodes: &[NodeAsset]) -> Result<(), SkeletonError> {
        for node in nodes {
            if self.skeleton.get_joint_id(&node.name).is_some() {
                self.skeleton.register_joint(node)?;
            } else {
                self.register_nodes(&node.children)?;
            }
        }
        Ok(())
    }

    fn load(mut self) -> Result<SkinnedSceneAsset, SkinLoadError> {
        if self.params.max_influences == 0 {
            return Err(SkinLoadError::InvalidInfluenceCount(0));
        }
        self.assign_joint_ids();
        let meshes = self.load_meshes()?;

        let scene = self.scene;
        let skeleton = self
            .register_nodes(&scene.nodes)
            .and_then(|()| self.skeleton.finalize());
        match &skeleton {
            Ok(Some(skeleton)) => check_offset_matrices(scene, skeleton),
            Ok(None) => {}
            Err(err) => warn!("Failed to build skeleton: {}", err),
        }

        Ok(SkinnedSceneAsset {
            name: scene.name.clone(),
            meshes,
            skeleton,
        })
    }
}

fn check_offset_matrices(scene: &SceneAsset, skeleton: &SkeletonAsset) {
    for bone in scene.meshes.iter().flat_map(|mesh| &mesh.bones) {
        let Some(joint) = skeleton.joint_by_name(&bone.name) else {
            continue;
        };
        if !bone
            .offset_matrix
            .abs_diff_eq(joint.inverse_bind_matrix, 1e-3)
        {
            debug!(
                "Offset matrix of bone {:?} differs from its inverse bind matrix",
                bone.name
            );
        }
    }
}

/// Converts the bone data of `scene` into skinning buffers and a skeleton.
///
/// Joint ids follow mesh order, then bone order inside each mesh, then the
/// order hierarchy nodes are visited in.
pub fn load_scene(
    scene: &SceneAsset,
    params: SkinLoadParams,
) -> Result<SkinnedSceneAsset, SkinLoadError> {
    SkinLoader::new(scene, params).load()
}

#[cfg(test)]
mod test {
    use glam::{Mat4, Vec3};

    use super::{load_scene, SkinLoadError};
    use crate::{
        loader::SkinLoadParams,
        mesh::{BoneAsset, MeshAsset, VertexWeight},
        node::{MatrixNodeTransform, NodeAsset, NodeTransform},
        primitive::JointIndexWidth,
        scene::SceneAsset,
        skeleton::SkeletonError,
    };

    fn bone(name: &str, weights: &[(usize, f32)]) -> BoneAsset {
        BoneAsset {
            name: name.to_string(),
            offset_matrix: Mat4::IDENTITY,
            weights: weights
                .iter()
                .map(|&(vertex, weight)| VertexWeight { vertex, weight })
                .collect(),
        }
    }

    fn node(name: &str, translation: Vec3, children: Vec<NodeAsset>) -> NodeAsset {
        NodeAsset {
            name: name.to_string(),
            transform: Some(NodeTransform::Matrix(MatrixNodeTransform(
                Mat4::from_translation(translation),
            ))),
            children,
        }
    }

    fn armature(children: Vec<NodeAsset>) -> NodeAsset {
        node("Armature", Vec3::new(0.0, 0.0, 10.0), children)
    }

    #[test]
    fn test_mesh_without_bones() {
        let scene = SceneAsset {
            meshes: vec![MeshAsset {
                name: Some(String::from("static")),
                vertex_count: 3,
                bones: vec![],
            }],
            ..Default::default()
        };
        let result = load_scene(&scene, SkinLoadParams::default()).unwrap();
        assert_eq!(result.meshes[0].attributes, None);
        assert_eq!(result.skeleton, Ok(None));
    }

    #[test]
    fn test_vertex_out_of_bounds() {
        let scene = SceneAsset {
            meshes: vec![MeshAsset {
                name: None,
                vertex_count: 2,
                bones: vec![bone("hip", &[(2, 1.0)])],
            }],
            ..Default::default()
        };
        assert_eq!(
            load_scene(&scene, SkinLoadParams::default()).err(),
            Some(SkinLoadError::VertexOutOfBounds {
                mesh: 0,
                bone: String::from("hip"),
                vertex: 2,
                vertex_count: 2,
            })
        );
    }

    #[test]
    fn test_zero_influences_rejected() {
        let scene = SceneAsset {
            nodes: vec![node("hip", Vec3::Y, vec![])],
            meshes: vec![MeshAsset {
                name: None,
                vertex_count: 2,
                bones: vec![bone("hip", &[(0, 1.0)])],
            }],
            ..Default::default()
        };
        let params = SkinLoadParams {
            max_influences: 0,
            ..Default::default()
        };
        assert_eq!(
            load_scene(&scene, params).err(),
            Some(SkinLoadError::InvalidInfluenceCount(0))
        );
    }

    #[test]
    fn test_skeleton_starts_at_topmost_bone() {
        let scene = SceneAsset {
            name: Some(String::from("character")),
            nodes: vec![armature(vec![node(
                "hip",
                Vec3::Y,
                vec![node("tail", Vec3::X, vec![])],
            )])],
            meshes: vec![MeshAsset {
                name: None,
                vertex_count: 1,
                bones: vec![bone("hip", &[(0, 1.0)])],
            }],
        };
        let result = load_scene(&scene, SkinLoadParams::default()).unwrap();
        let skeleton = result.skeleton.unwrap().unwrap();

        assert_eq!(skeleton.joints.len(), 2);
        assert!(skeleton.joint_by_name("Armature").is_none());
        let hip = skeleton.joint_by_name("hip").unwrap();
        let tail = skeleton.joint_by_name("tail").unwrap();
        assert_eq!(hip.id, 0);
        assert_eq!(tail.parent, Some(0));
        assert_eq!(hip.bind_matrix, Mat4::from_translation(Vec3::Y));
        assert!(tail
            .bind_matrix
            .abs_diff_eq(Mat4::from_translation(Vec3::new(1.0, 1.0, 0.0)), 1e-6));
    }

    #[test]
    fn test_broken_skeleton_keeps_mesh_buffers() {
        let scene = SceneAsset {
            nodes: vec![armature(vec![node("hip", Vec3::Y, vec![])])],
            meshes: vec![MeshAsset {
                name: None,
                vertex_count: 1,
                bones: vec![bone("hip", &[(0, 0.5)]), bone("ghost", &[(0, 0.5)])],
            }],
            ..Default::default()
        };
        let result = load_scene(&scene, SkinLoadParams::default()).unwrap();
        assert!(matches!(
            result.skeleton,
            Err(SkeletonError::IncompleteSkeleton { .. })
        ));
        let attributes = result.meshes[0].attributes.as_ref().unwrap();
        assert_eq!(attributes.vertex_joints(0), vec![0, 1, 0, 0]);
    }

    #[test]
    fn test_duplicate_bone_nodes() {
        let scene = SceneAsset {
            nodes: vec![
                node("hip", Vec3::Y, vec![]),
                armature(vec![node("hip", Vec3::Y, vec![])]),
            ],
            meshes: vec![MeshAsset {
                name: None,
                vertex_count: 1,
                bones: vec![bone("hip", &[(0, 1.0)])],
            }],
            ..Default::default()
        };
        let result = load_scene(&scene, SkinLoadParams::default()).unwrap();
        assert_eq!(
            result.skeleton,
            Err(SkeletonError::DuplicateJoint {
                id: 0,
                name: String::from("hip"),
            })
        );
    }

    #[test]
    fn test_normalize_and_capacity() {
        let scene = SceneAsset {
            nodes: vec![node(
                "a",
                Vec3::ZERO,
                vec![node("b", Vec3::X, vec![node("c", Vec3::X, vec![])])],
            )],
            meshes: vec![MeshAsset {
                name: None,
                vertex_count: 2,
                bones: vec![
                    bone("a", &[(0, 0.1), (1, 1.0)]),
                    bone("b", &[(0, 0.3)]),
                    bone("c", &[(0, 0.1)]),
                ],
            }],
            ..Default::default()
        };
        let params = SkinLoadParams {
            max_influences: 2,
            normalize_weights: true,
        };
        let result = load_scene(&scene, params).unwrap();
        let attributes = result.meshes[0].attributes.as_ref().unwrap();

        assert_eq!(attributes.influences_per_vertex, 2);
        assert_eq!(attributes.max_influence_count, 3);
        assert_eq!(attributes.meaningful_influences(), 2);
        assert_eq!(attributes.joints.width(), JointIndexWidth::U8);
        assert_eq!(attributes.vertex_joints(0), vec![0, 1]);
        assert!((attributes.vertex_weights(0)[0] - 0.25).abs() < 1e-6);
        assert!((attributes.vertex_weights(0)[1] - 0.75).abs() < 1e-6);
        assert_eq!(attributes.vertex_weights(1), &[1.0, 0.0]);
    }
}

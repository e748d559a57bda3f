use glam::{Mat4, Quat, Vec3};
use renderer_asset::{
    loader::{skin::load_scene, SkinLoadParams},
    mesh::{BoneAsset, MeshAsset, VertexWeight},
    node::{DecomposedTransform, NodeAsset, NodeTransform},
    primitive::{JointIndexWidth, JointIndices},
    scene::SceneAsset,
};

fn leg_scene() -> SceneAsset {
    let hip = DecomposedTransform {
        translation: Vec3::new(0.0, 1.0, 0.0),
        rotation: Quat::from_rotation_x(0.2),
        scale: Vec3::ONE,
    };
    let knee = DecomposedTransform {
        translation: Vec3::new(0.0, -0.5, 0.0),
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };
    SceneAsset {
        name: Some(String::from("leg")),
        nodes: vec![NodeAsset {
            name: String::from("hip"),
            transform: Some(NodeTransform::Decomposed(hip)),
            children: vec![NodeAsset {
                name: String::from("knee"),
                transform: Some(NodeTransform::Decomposed(knee)),
                children: vec![],
            }],
        }],
        meshes: vec![MeshAsset {
            name: Some(String::from("thigh")),
            vertex_count: 5,
            bones: vec![
                BoneAsset {
                    name: String::from("hip"),
                    offset_matrix: hip.matrix().inverse(),
                    weights: vec![
                        VertexWeight {
                            vertex: 0,
                            weight: 0.9,
                        },
                        VertexWeight {
                            vertex: 1,
                            weight: 0.1,
                        },
                    ],
                },
                BoneAsset {
                    name: String::from("knee"),
                    offset_matrix: (hip.matrix() * knee.matrix()).inverse(),
                    weights: vec![VertexWeight {
                        vertex: 1,
                        weight: 0.95,
                    }],
                },
            ],
        }],
    }
}

#[test]
fn test_leg_weights() {
    let result = load_scene(&leg_scene(), SkinLoadParams::default()).unwrap();
    assert_eq!(result.name.as_deref(), Some("leg"));
    let attributes = result.meshes[0].attributes.as_ref().unwrap();

    assert_eq!(attributes.joints.width(), JointIndexWidth::U8);
    assert_eq!(attributes.vertex_count(), 5);
    assert_eq!(attributes.max_influence_count, 2);
    assert_eq!(attributes.vertex_joints(0), vec![0, 0, 0, 0]);
    assert_eq!(attributes.vertex_weights(0), &[0.9, 0.0, 0.0, 0.0]);
    assert_eq!(attributes.vertex_joints(1), vec![0, 1, 0, 0]);
    assert_eq!(attributes.vertex_weights(1), &[0.1, 0.95, 0.0, 0.0]);
    for vertex in 2..5 {
        assert_eq!(attributes.vertex_weights(vertex), &[0.0; 4]);
    }
    match &attributes.joints {
        JointIndices::U8(indices) => assert_eq!(indices.len(), 20),
        other => panic!("unexpected index width {:?}", other.width()),
    }
}

#[test]
fn test_leg_skeleton() {
    let scene = leg_scene();
    let result = load_scene(&scene, SkinLoadParams::default()).unwrap();
    let skeleton = result.skeleton.unwrap().unwrap();

    let hip = skeleton.joint_by_name("hip").unwrap();
    let knee = skeleton.joint_by_name("knee").unwrap();
    assert_eq!((hip.id, knee.id), (0, 1));
    assert_eq!(knee.parent, Some(hip.id));
    assert_eq!(skeleton.roots().map(|joint| joint.id).collect::<Vec<_>>(), vec![0]);

    assert_eq!(knee.bind_matrix, hip.bind_matrix * knee.local_matrix);
    for (joint, bone) in skeleton.joints.iter().zip(&scene.meshes[0].bones) {
        assert!((joint.bind_matrix * joint.inverse_bind_matrix).abs_diff_eq(Mat4::IDENTITY, 1e-5));
        assert!(joint.inverse_bind_matrix.abs_diff_eq(bone.offset_matrix, 1e-5));
    }
    assert_eq!(skeleton.inverse_bind_matrices().len(), 2);
    assert!(skeleton.errors.is_empty());
}

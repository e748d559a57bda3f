//! Joint id allocation and bind pose resolution.

use std::{
    collections::HashMap,
    error::Error,
    fmt::{self, Display, Formatter},
};

use glam::Mat4;
use log::{debug, warn};

use crate::{
    node::{DecomposedTransform, NodeAsset},
    skin::{JointAsset, SkeletonAsset},
};

#[derive(Debug, Clone, PartialEq)]
pub enum SkeletonError {
    /// Two hierarchy nodes carry the same bone name.
    DuplicateJoint { id: usize, name: String },
    /// Some names got an id but never a hierarchy node.
    IncompleteSkeleton {
        assigned: usize,
        registered: usize,
        missing: Vec<String>,
    },
    /// The bind matrix of a joint has no inverse.
    SingularMatrix { id: usize, name: String },
}

impl Display for SkeletonError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SkeletonError::DuplicateJoint { id, name } => {
                write!(f, "Duplicate joint {:?} (#{})", name, id)
            }
            SkeletonError::IncompleteSkeleton {
                assigned,
                registered,
                missing,
            } => write!(
                f,
                "Incomplete skeleton: {} joints referenced, {} found in hierarchy, missing {:?}",
                assigned, registered, missing
            ),
            SkeletonError::SingularMatrix { id, name } => {
                write!(f, "Bind matrix of joint {:?} (#{}) is singular", name, id)
            }
        }
    }
}

impl Error for SkeletonError {}

#[derive(Debug, Clone, PartialEq)]
pub struct JointRecord {
    pub id: usize,
    pub name: String,
    /// Local transform of the hierarchy node, captured when it was visited.
    pub offset_matrix: Mat4,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

/// Collects joints of one scene and turns them into a [`SkeletonAsset`].
///
/// Ids are handed out in first-seen order, so the traversal order of the
/// caller decides them. [`SkeletonBuilder::finalize`] consumes the builder:
/// once the skeleton is resolved no more joints can be added.
#[derive(Debug, Default)]
pub struct SkeletonBuilder {
    joint_ids: HashMap<String, usize>,
    joint_names: Vec<String>,
    joints: Vec<Option<JointRecord>>,
}

impl SkeletonBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of `name`, allocating the next one if the name is new.
    pub fn joint_id(&mut self, name: &str) -> usize {
        if let Some(id) = self.joint_ids.get(name) {
            return *id;
        }
        let id = self.joint_names.len();
        self.joint_ids.insert(name.to_string(), id);
        self.joint_names.push(name.to_string());
        id
    }

    pub fn get_joint_id(&self, name: &str) -> Option<usize> {
        self.joint_ids.get(name).copied()
    }

    /// Number of ids handed out so far.
    pub fn joint_count(&self) -> usize {
        self.joint_names.len()
    }

    /// Number of joints backed by a hierarchy node.
    pub fn registered_count(&self) -> usize {
        self.joints.iter().filter(|joint| joint.is_some()).count()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.get_joint_id(name)
            .and_then(|id| self.joints.get(id))
            .is_some_and(Option::is_some)
    }

    /// Registers `node` and its whole subtree as joints, returning the id
    /// of `node`. Children are registered before their parent.
    pub fn register_joint(&mut self, node: &NodeAsset) -> Result<usize, SkeletonError> {
        let id = self.joint_id(&node.name);
        let mut record = JointRecord {
            id,
            name: node.name.clone(),
            offset_matrix: node.local_matrix(),
            parent: None,
            children: Vec::with_capacity(node.children.len()),
        };

        for child in &node.children {
            let child_id = self.register_joint(child)?;
            if let Some(Some(child_record)) = self.joints.get_mut(child_id) {
                child_record.parent = Some(id);
            }
            record.children.push(child_id);
        }

        self.insert_joint(record)?;
        Ok(id)
    }

    fn insert_joint(&mut self, record: JointRecord) -> Result<(), SkeletonError> {
        let id = record.id;
        if self.joints.len() <= id {
            self.joints.resize_with(id + 1, || None);
        }
        let slot = &mut self.joints[id];
        if slot.is_some() {
            return Err(SkeletonError::DuplicateJoint {
                id,
                name: record.name,
            });
        }
        *slot = Some(record);
        Ok(())
    }

    /// Resolves the bind pose of every joint.
    ///
    /// Returns `Ok(None)` when no joint was ever registered. Joints with a
    /// singular bind matrix do not fail the skeleton: they get an identity
    /// inverse bind matrix and are listed in [`SkeletonAsset::errors`].
    pub fn finalize(self) -> Result<Option<SkeletonAsset>, SkeletonError> {
        let registered = self.registered_count();
        if registered == 0 {
            if !self.joint_names.is_empty() {
                warn!(
                    "{} joints referenced by meshes, but none found in hierarchy",
                    self.joint_names.len()
                );
            }
            return Ok(None);
        }

        if registered != self.joint_names.len() {
            let missing = self
                .joint_names
                .iter()
                .enumerate()
                .filter(|(id, _)| !matches!(self.joints.get(*id), Some(Some(_))))
                .map(|(_, name)| name.clone())
                .collect();
            return Err(SkeletonError::IncompleteSkeleton {
                assigned: self.joint_names.len(),
                registered,
                missing,
            });
        }

        let records: Vec<JointRecord> = self.joints.into_iter().flatten().collect();
        let mut resolver = BindPoseResolver::new(&records);
        for id in 0..records.len() {
            resolver.resolve(id);
        }

        let mut errors = Vec::new();
        let joints = records
            .iter()
            .zip(resolver.into_resolved())
            .map(|(record, resolved)| {
                let inverse_bind_matrix = match invert_bind_matrix(resolved.bind_matrix) {
                    Some(inverse) => inverse,
                    None => {
                        warn!(
                            "Bind matrix of joint {:?} is singular, using identity",
                            record.name
                        );
                        errors.push(SkeletonError::SingularMatrix {
                            id: record.id,
                            name: record.name.clone(),
                        });
                        Mat4::IDENTITY
                    }
                };
                JointAsset {
                    id: record.id,
                    name: record.name.clone(),
                    parent: record.parent,
                    children: record.children.clone(),
                    local_matrix: resolved.local_matrix,
                    local_transform: resolved.local_transform,
                    bind_matrix: resolved.bind_matrix,
                    inverse_bind_matrix,
                }
            })
            .collect();

        debug!("Resolved skeleton with {} joints", records.len());
        Ok(Some(SkeletonAsset { joints, errors }))
    }
}

/// Negates the first basis column of a matrix with negative determinant,
/// turning a reflection into a proper rotation.
pub fn correct_reflection(mut matrix: Mat4) -> Mat4 {
    if matrix.determinant() < 0.0 {
        matrix.x_axis.x = -matrix.x_axis.x;
        matrix.x_axis.y = -matrix.x_axis.y;
        matrix.x_axis.z = -matrix.x_axis.z;
    }
    matrix
}

pub fn invert_bind_matrix(matrix: Mat4) -> Option<Mat4> {
    let determinant = matrix.determinant();
    if determinant == 0.0 || !determinant.is_finite() {
        return None;
    }
    let inverse = matrix.inverse();
    inverse.is_finite().then_some(inverse)
}

#[derive(Debug, Clone)]
struct ResolvedJoint {
    local_matrix: Mat4,
    local_transform: DecomposedTransform,
    bind_matrix: Mat4,
}

/// Memoized bind pose of joints stored by id.
struct BindPoseResolver<'a> {
    records: &'a [JointRecord],
    resolved: Vec<Option<ResolvedJoint>>,
}

impl<'a> BindPoseResolver<'a> {
    fn new(records: &'a [JointRecord]) -> Self {
        Self {
            records,
            resolved: vec![None; records.len()],
        }
    }

    fn resolve(&mut self, id: usize) -> Mat4 {
        if let Some(resolved) = &self.resolved[id] {
            return resolved.bind_matrix;
        }

        let records = self.records;
        let record = &records[id];
        let determinant = record.offset_matrix.determinant();
        if determinant < 0.0 {
            warn!("Joint {:?} has a reflected offset matrix", record.name);
        } else if determinant == 0.0 {
            warn!("Joint {:?} has a zero-scale offset matrix", record.name);
        }
        let local_matrix = correct_reflection(record.offset_matrix);
        let local_transform = DecomposedTransform::from_matrix(local_matrix);

        let bind_matrix = match record.parent {
            Some(parent) => self.resolve(parent) * local_matrix,
            None => local_matrix,
        };

        self.resolved[id] = Some(ResolvedJoint {
            local_matrix,
            local_transform,
            bind_matrix,
        });
        bind_matrix
    }

    fn into_resolved(self) -> impl Iterator<Item = ResolvedJoint> {
        self.resolved.into_iter().flatten()
    }
}

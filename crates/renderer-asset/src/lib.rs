//! Provide skinning data for renderer.
//!
//! This library takes bone influences and bone hierarchies already parsed
//! from a model file, and turns them into what a hardware-skinned primitive
//! needs: fixed-stride joint index and weight buffers for every mesh, and a
//! skeleton resolved into bind pose with inverse bind matrices.
//!
pub mod loader;
pub mod mesh;
pub mod node;
pub mod primitive;
pub mod scene;
pub mod skeleton;
pub mod skin;
pub mod weight;

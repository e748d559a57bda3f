use crate::weight::MAX_INFLUENCES;

/// Skinning data conversion for parsed scenes.
pub mod skin;

#[derive(Debug, Clone)]
pub struct SkinLoadParams {
    /// Influence slots per vertex in the output buffers.
    pub max_influences: usize,
    /// Rescale retained weights of every vertex to sum to 1.
    pub normalize_weights: bool,
}

impl Default for SkinLoadParams {
    fn default() -> Self {
        Self {
            max_influences: MAX_INFLUENCES,
            normalize_weights: false,
        }
    }
}

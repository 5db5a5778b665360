//! Soft-tissue deformation: derived-parameter rules, the default graph and
//! mapping table, and a preview solver.

pub mod preview;
pub mod rules;
pub mod setup;

pub use preview::kinematic_preview;
pub use rules::{
    AttachmentLayout, LineToGravity, MeshReadBack, MeshTopologyUpload, PointToAttachment,
    RegionToBox,
};
pub use setup::{TissueBindings, TissueConfig, block_mesh};

//! 产物层：页面 / 组件的冲突安全读写、片段拼接与项目脚手架

pub mod error;
pub mod scaffold;
pub mod splice;
pub mod store;

pub use error::ArtifactError;
pub use scaffold::{is_placeholder, NextAppScaffold, Scaffolder, PLACEHOLDER_MARKERS, PLACEHOLDER_ROOT_PAGE};
pub use splice::{splice, SplicePosition};
pub use store::{
    ArtifactEntry, ArtifactKind, ArtifactReceipt, ArtifactStore, ProjectFile, ProjectLayout,
    TreeNode, TreeNodeType, ROOT_PAGE_NAME,
};

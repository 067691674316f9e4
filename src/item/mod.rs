pub(crate) mod anchor;
pub(crate) mod data;
pub(crate) mod scene;
pub(crate) mod tree;

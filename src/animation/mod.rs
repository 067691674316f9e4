pub(crate) mod anim;
pub(crate) mod appearance;
pub(crate) mod group;
pub(crate) mod lifecycle;
pub(crate) mod stack;

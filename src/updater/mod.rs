pub(crate) mod data;
pub(crate) mod group;
pub(crate) mod item;
pub(crate) mod params;

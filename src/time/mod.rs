pub(crate) mod range;
pub(crate) mod rate;
pub(crate) mod schedule;

pub mod group_by;
pub mod skip;

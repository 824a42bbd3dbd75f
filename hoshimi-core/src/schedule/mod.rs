//! Schedule composition: the pure algorithms that fuse declared plans with
//! observed videos.

pub mod calendar;
pub mod composer;

pub mod add;
pub mod check;
pub mod distance;
pub mod hash;
pub mod list;
pub mod remove;

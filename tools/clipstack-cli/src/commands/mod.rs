pub mod compose;
pub mod probe;

pub mod assignment;
pub mod guess;
pub mod knowledge;

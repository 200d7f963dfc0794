mod passage;

pub use passage::Passage;

mod body_animator;
mod engine;
mod speech;
mod viseme_queue;

pub use body_animator::*;
pub use engine::*;
pub use speech::*;
pub use viseme_queue::*;

#[cfg(test)]
mod viseme_queue_tests;

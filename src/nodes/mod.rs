//! Leaf prompt-processing functions and the node registry that exposes them.
pub mod concat;
pub mod filter;
pub mod lora_stack;
pub mod registry;

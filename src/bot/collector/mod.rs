pub mod tokenizer;
pub mod collector;

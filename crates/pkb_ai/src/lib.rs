pub mod answer;
pub mod attribution;
pub mod chunking;
pub mod embeddings;
pub mod guardrails;
pub mod index;
pub mod llm;
pub mod openai;
pub mod respond;
pub mod retrieve;

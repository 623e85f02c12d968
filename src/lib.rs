pub mod betting;
pub mod board;
pub mod cards;
pub mod display;
pub mod engine;
pub mod error;
pub mod hand_evaluator;
pub mod profile;
pub mod ranges;
pub mod simulator;

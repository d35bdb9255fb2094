pub mod classifier;
pub mod cleaning;
pub mod dataset;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod executable_utils;
pub mod model;
pub mod normalize;
pub mod rules;
pub mod storage;
pub mod training;

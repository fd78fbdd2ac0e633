pub mod client;
pub mod model;
pub mod problem_id;

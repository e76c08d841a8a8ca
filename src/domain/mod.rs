pub mod engagement;
pub mod message;
pub mod social_graph;
pub mod user;

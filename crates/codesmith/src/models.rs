//! These models represent the objects passed around by the agent
//!
//! The agent talks to the model in openai's chat format, but we always convert
//! that wire format into these internal structs at the provider boundary so the
//! tools and the agent never see backend specific shapes.
pub mod message;
pub mod role;
pub mod tool;

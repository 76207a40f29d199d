//! Three-stage cascaded face detector: an image pyramid feeds a proposal
//! network, whose candidates are refined and finally scored with landmarks
//! by two further networks. The networks themselves sit behind
//! [`infer::ProposalNet`], [`infer::RefineNet`] and [`infer::OutputNet`].

pub mod config;
pub mod error;
pub mod imaging;
pub mod infer;
pub mod inference;
pub mod models;
pub mod protocol;
pub mod server;

pub use config::{CascadeConfig, ServerConfig};
pub use error::{Error, Result};
pub use infer::{BoundingBox, CandidateSet, Face, FaceCascade, Offset};

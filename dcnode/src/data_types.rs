//! Protocol data types served and consumed by the node
//!
//! Each type carries its DroneCAN identity through [`enc::DataType`] and implements
//! the uniform serialization contract of the `dcnode-encoding` crate. Application-specific
//! types are expected to implement the same traits.

pub mod get_node_info;
pub mod node_status;
pub mod param;
pub mod restart_node;
pub mod transport_stats;

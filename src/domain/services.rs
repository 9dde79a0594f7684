//! Domain services
//!
//! Ports through which the harvesting core talks to its collaborators.

pub mod feed_services;

pub use feed_services::{
    CollaboratorError, CollaboratorResult, DocumentTree, MemorySink, RecordNode, RecordSink,
    SelectorRole,
};

mod assign;
mod client;
mod descriptor;
mod error;
mod logger;
mod pages;
mod reconcile;
mod session;
mod types;
mod visibility;

pub use assign::{assign_devices, normalize_page_code};
pub use client::{XccClient, XccClientBuilder};
pub use descriptor::{parse_descriptor, DescriptorSet};
pub use error::{Error, Result};
pub use logger::PollLogMode;
pub use pages::PageSet;
pub use reconcile::{merge_live_documents, parse_live_document, resolve_entities};
pub use types::*;
pub use visibility::VisibilityPredicate;

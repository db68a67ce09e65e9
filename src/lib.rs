// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # openstax-chef
//!
//! Builds a hierarchical learning-content channel from the OpenStax book
//! catalog: subjects, books, per-chapter PDF documents, and resource topics.
//!
//! ## Architecture
//!
//! - **Page index** (`page_index`): load-once chapter boundary overrides
//! - **Thumbnails** (`thumbnail`): cover retrieval, SVG repair, PNG rendering
//! - **Splitting** (`split`): PDF chapter extraction aligned to the table of contents
//! - **Assembly** (`assemble`): catalog walk, subject dedup, tree validation
//!
//! ## Library usage
//!
//! ```no_run
//! use openstax_chef::assemble::TreeAssembler;
//! use openstax_chef::catalog::CatalogClient;
//! use openstax_chef::config::ChefConfig;
//! use openstax_chef::fetch::HttpFetcher;
//! use openstax_chef::page_index::PageIndexStore;
//! use openstax_chef::split::{ChapterSplitter, pdf::PdfSplitEngine};
//! use openstax_chef::thumbnail::AssetNormalizer;
//! use openstax_chef::tree::ContentNode;
//!
//! let config = ChefConfig::default();
//! let paths = config.paths();
//! paths.ensure_dirs().unwrap();
//! let fetcher = HttpFetcher::new(&config.fetch);
//! let store = PageIndexStore::load(&config.page_index_file).unwrap();
//! let licenses = config.license_table().unwrap();
//!
//! let mut assembler = TreeAssembler::new(
//!     CatalogClient::new(&fetcher, &config.base_url),
//!     AssetNormalizer::new(&fetcher, &paths, &config.assets_dir),
//!     ChapterSplitter::new(&fetcher, &paths, &store, &PdfSplitEngine),
//!     &licenses,
//!     &config.copyright_holder,
//! );
//! let mut channel = ContentNode::channel(&config.channel);
//! let books = assembler.list_books().unwrap();
//! assembler.assemble(&mut channel, &books).unwrap();
//! ```

pub mod assemble;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod license;
pub mod page_index;
pub mod paths;
pub mod split;
pub mod text;
pub mod thumbnail;
pub mod tree;

pub mod backfill;
pub mod dita;
pub mod downgrade;
pub mod encoding;
pub mod join;
pub mod path_trie;
pub mod placeholder;
pub mod segment_builder;
pub mod segmenter;
pub mod store;
pub mod validation;
pub mod xliff;

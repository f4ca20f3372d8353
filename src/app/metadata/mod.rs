//! Sample metadata: fusion of command-line and spreadsheet sources, and
//! collection location resolution

pub mod resolver;
pub mod sheet;
pub mod table;
pub mod types;

pub use resolver::{combine_metadata, load_metadata, parse_metadata_pairs, GeoCache, LocationRewrite};
pub use sheet::{parse_sheet, read_sheet, trim_invisible};
pub use table::MetadataTable;
pub use types::{GeoSuggestion, LocationValue, Metadata};

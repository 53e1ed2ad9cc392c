pub mod errors;
pub mod platforms;
pub mod reader;

pub use errors::DdpError;
pub use platforms::{all_platforms, platform_by_name, SlackPlatform};
pub use reader::{
    read_csv_from_bytes, read_csv_from_file_to_df, read_ddp_bytes, read_ddp_file,
    read_json_records, records_to_df, ColumnKind, ColumnSelector,
};

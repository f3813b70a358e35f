pub mod datasource;
pub mod field_type;
pub mod permission;
pub mod report;
pub mod row;
pub mod template;
pub mod value;

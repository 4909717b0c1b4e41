pub mod records_table;
pub mod request_list;

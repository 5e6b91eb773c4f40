pub mod object_store;
pub mod s3_object_store;

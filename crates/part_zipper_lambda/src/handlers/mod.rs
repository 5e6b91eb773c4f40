pub mod zip_parts;

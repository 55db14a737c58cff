pub mod background;
pub mod kv;

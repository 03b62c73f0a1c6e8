pub mod slru;

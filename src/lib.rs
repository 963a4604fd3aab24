pub mod db;
pub mod monitor;
pub mod server;
pub mod version;
pub mod web;

#[cfg(test)]
pub(crate) mod test_support;

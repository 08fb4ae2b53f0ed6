pub mod client;
pub mod logging;
#[cfg(test)]
pub mod mock_client;

pub mod pagespeed_client;
pub mod sheets_client;

pub use pagespeed_client::PageSpeedClient;
pub use sheets_client::SheetsClient;

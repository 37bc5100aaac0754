pub mod http_api;
pub mod probe;

pub use http_api::HttpDataApi;
pub use probe::HttpLinkProbe;

//! Define our own macro to simplify the code
//!

/// Call the HTTP client with the proper arguments
///
/// - plain GET, JSON expected back
/// - plain GET with query parameters
///
#[macro_export]
macro_rules! http_get {
    ($self:ident, $url:expr) => {
        $self
            .client
            .get($url)
            .header("user-agent", $crate::version())
            .header("accept", "application/json")
            .send()
    };
    ($self:ident, $url:expr, $query:expr) => {
        $self
            .client
            .get($url)
            .header("user-agent", $crate::version())
            .header("accept", "application/json")
            .query($query)
            .send()
    };
}

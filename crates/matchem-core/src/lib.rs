#![deny(warnings)]
pub mod belief;
pub mod engine;
pub mod model;
pub mod serialization;
pub mod validate;

/// Widest item-set the u16 knowledge bitmasks can represent.
pub const MAX_SET_SIZE: usize = 16;

pub struct AppInfo;

impl AppInfo {
    pub const fn name() -> &'static str {
        "matchem"
    }

    pub const fn codename() -> &'static str {
        "Rust Remaster"
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::AppInfo;

    #[test]
    fn exposes_static_metadata() {
        assert_eq!(AppInfo::name(), "matchem");
        assert_eq!(AppInfo::codename(), "Rust Remaster");
        assert!(!AppInfo::version().is_empty());
    }
}

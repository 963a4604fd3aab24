const fn build_version(opt: Option<&'static str>) -> &'static str {
    match opt {
        Some(val) => val,
        None => env!("CARGO_PKG_VERSION"),
    }
}

/// Version reported by `--version`; `HEALTHWATCH_VERSION` at build time wins over the crate version.
pub const VERSION: &str = build_version(option_env!("HEALTHWATCH_VERSION"));

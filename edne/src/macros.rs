//! Shorthands for building and returning [`crate::error::ImportError`] values.

/// Creates an [`crate::error::ImportError`] from a kind and a static description.
///
/// A detail may follow as any `Display` value, and after it the error that caused this one
/// (`source: err`).
#[macro_export]
macro_rules! import_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::ImportError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::ImportError::from(($kind, $desc, $detail.to_string()))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        $crate::error::ImportError::from(($kind, $desc, $detail.to_string())).with_source($source)
    };
}

/// Returns early with an [`crate::error::ImportError`] carrying a detail.
#[macro_export]
macro_rules! bail {
    ($kind:expr, $desc:expr, $detail:expr) => {
        return ::core::result::Result::Err($crate::import_error!($kind, $desc, $detail))
    };
}

//! Context-helper machinery shared by the castellan crates.
//!
//! Each crate defines its own typed `Error` enum; this module supplies the
//! glue that gives those enums anyhow-style `.context()` ergonomics without
//! erasing the type.

/// Trait for error types that can be constructed from a plain message string.
///
/// Implement this for your crate's error type, then invoke [`impl_context!`]
/// in your error module to get `.context()` and `.with_context()` on `Result`
/// and `Option`.
pub trait FromMessage: Sized {
    fn from_message(message: String) -> Self;
}

/// Generate a crate-local `Context` trait with `.context()` and `.with_context()`
/// methods on `Result` and `Option`.
///
/// Invoke inside a module that defines `Error: FromMessage` and
/// `type Result<T> = std::result::Result<T, Error>`.
///
/// ```ignore
/// // in crates/foo/src/error.rs
/// castellan_common::impl_context!();
/// ```
#[macro_export]
macro_rules! impl_context {
    () => {
        pub trait Context<T> {
            fn context(self, context: impl Into<String>) -> Result<T>;
            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C;
        }

        impl<T, E: std::fmt::Display> Context<T> for std::result::Result<T, E> {
            fn context(self, context: impl Into<String>) -> Result<T> {
                let ctx: String = context.into();
                self.with_context(|| ctx)
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.map_err(|source| {
                    let ctx: String = f().into();
                    <Error as $crate::FromMessage>::from_message(format!("{ctx}: {source}"))
                })
            }
        }

        impl<T> Context<T> for Option<T> {
            fn context(self, context: impl Into<String>) -> Result<T> {
                let ctx: String = context.into();
                self.with_context(|| ctx)
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(f().into()))
            }
        }
    };
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Error(String);

    impl FromMessage for Error {
        fn from_message(message: String) -> Self {
            Self(message)
        }
    }

    type Result<T> = std::result::Result<T, Error>;

    crate::impl_context!();

    #[test]
    fn test_context_prefixes_the_source() {
        let source: std::result::Result<(), &str> = Err("disk full");
        let wrapped = source.context("write snapshot");
        assert_eq!(wrapped.unwrap_err(), Error("write snapshot: disk full".into()));
    }

    #[test]
    fn test_with_context_is_lazy_on_ok() {
        let mut called = false;
        let ok: std::result::Result<u8, &str> = Ok(7);
        let value = ok
            .with_context(|| {
                called = true;
                "unused"
            })
            .unwrap();
        assert_eq!(value, 7);
        assert!(!called);
    }

    #[test]
    fn test_option_context_maps_none() {
        let missing: Option<u8> = None;
        assert_eq!(
            missing.context("no such subject").unwrap_err(),
            Error("no such subject".into())
        );
        assert_eq!(Some(3).context("unused").unwrap(), 3);
    }
}

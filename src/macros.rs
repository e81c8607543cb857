//! Shared macros for the crate.

/// Placeholder for a masked field value.
pub(crate) fn masked<T>(_: &T) -> &'static str {
    "[REDACTED]"
}

/// Masks an optional secret while keeping its `Some`/`None` shape, so
/// debug output still shows whether the value is configured.
pub(crate) fn masked_opt<T>(value: &Option<T>) -> Option<&'static str> {
    value.as_ref().map(|_| "[REDACTED]")
}

/// Generate a `fmt::Debug` implementation that masks secret fields.
///
/// Fields are listed in three groups: `show` fields print normally,
/// `mask` fields print `"[REDACTED]"`, and `mask_opt` fields print
/// `Some("[REDACTED]")` or `None`.
///
/// # Example
///
/// ```ignore
/// redacted_debug!(MyConfig {
///     show: [url, username],
///     mask: [api_key],
///     mask_opt: [password],
/// });
/// ```
macro_rules! redacted_debug {
    ($name:ident {
        show: [$($show:ident),* $(,)?],
        mask: [$($mask:ident),* $(,)?],
        mask_opt: [$($opt:ident),* $(,)?] $(,)?
    }) => {
        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.debug_struct(stringify!($name))
                    $(.field(stringify!($show), &self.$show))*
                    $(.field(stringify!($mask), &crate::macros::masked(&self.$mask)))*
                    $(.field(stringify!($opt), &crate::macros::masked_opt(&self.$opt)))*
                    .finish_non_exhaustive()
            }
        }
    };
}

#[cfg(test)]
mod tests {
    #[allow(dead_code)]
    struct Creds {
        endpoint: String,
        token: String,
        passphrase: Option<String>,
    }

    redacted_debug!(Creds {
        show: [endpoint],
        mask: [token],
        mask_opt: [passphrase],
    });

    #[test]
    fn secrets_never_reach_debug_output() {
        let creds = Creds {
            endpoint: "https://api.example".into(),
            token: "tok-12345".into(),
            passphrase: Some("hunter2".into()),
        };
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("https://api.example"));
        assert!(!rendered.contains("tok-12345"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn unset_optional_secret_shows_none() {
        let creds = Creds {
            endpoint: "db".into(),
            token: "t".into(),
            passphrase: None,
        };
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("passphrase: None"));
    }
}

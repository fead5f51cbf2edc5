use alloc::borrow::Cow;

/// Returns the canonical form of `key`: surrounding whitespace removed and
/// every character lowercased.
///
/// Borrows from `key` when it is already canonical.
///
/// # Examples
///
/// ```rust
/// # use quad_probe::normalize_key;
/// #
/// assert_eq!(normalize_key("  PiKaChu\t"), "pikachu");
/// assert!(matches!(
///     normalize_key("bulbasaur"),
///     std::borrow::Cow::Borrowed(_)
/// ));
/// ```
pub fn normalize_key(key: &str) -> Cow<'_, str> {
    let trimmed = key.trim();
    if is_lowercase(trimmed) {
        Cow::Borrowed(trimmed)
    } else {
        Cow::Owned(trimmed.to_lowercase())
    }
}

#[inline]
fn is_lowercase(s: &str) -> bool {
    // Final sigma is context dependent in `str::to_lowercase`, but it is
    // uppercase and therefore already caught by the per-char check.
    s.chars().all(|c| c.to_lowercase().eq(core::iter::once(c)))
}

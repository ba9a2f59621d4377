//! # Utility Functions Module
//!
//! Small helpers for building the argument vectors handed to external tools.

/// Converts any iterable of string-like items to `Vec<String>`.
///
/// # Example
/// ```rust
/// use asset_optimizer::utils::to_string_vec;
///
/// let level = 9;
/// let args = to_string_vec(["-o", "max", &level.to_string()]);
/// assert_eq!(args, vec!["-o", "max", "9"]);
/// ```
pub fn to_string_vec<T, I>(items: I) -> Vec<String>
where
    T: ToString,
    I: IntoIterator<Item = T>,
{
    items.into_iter().map(|item| item.to_string()).collect()
}

/// Splits a whitespace-separated flag template (`"-o max -q"`) into its tokens.
///
/// Empty templates yield no tokens, so `""` never produces a stray empty argument.
pub fn split_template(template: &str) -> Vec<String> {
    template.split_whitespace().map(str::to_string).collect()
}

/// Builds a `Vec<String>` from mixed literal/displayable items.
///
/// # Example
/// ```rust
/// use asset_optimizer::args;
///
/// let size = 128;
/// let flags = args![format!("-b{}", size), "-y"];
/// assert_eq!(flags, vec!["-b128", "-y"]);
/// ```
#[macro_export]
macro_rules! args {
    [$($item:expr),* $(,)?] => {
        $crate::utils::to_string_vec([$($item.to_string()),*])
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_string_vec_mixed_types() {
        let iterations = 15;
        let result = to_string_vec(["--iterations", &iterations.to_string(), "-y"]);
        assert_eq!(result, vec!["--iterations", "15", "-y"]);
    }

    #[test]
    fn test_split_template() {
        assert_eq!(split_template("-o max  -q"), vec!["-o", "max", "-q"]);
        assert!(split_template("").is_empty());
        assert!(split_template("   ").is_empty());
    }

    #[test]
    fn test_args_macro() {
        let filter = 'm';
        let result = args![format!("--filters={}", filter), "-y", 3];
        assert_eq!(result, vec!["--filters=m", "-y", "3"]);
    }
}

//! `__`-delimited parameter paths

use smallvec::SmallVec;
use vecflow_schema::PATH_SEPARATOR;

/// Shown in errors raised at a node-relative root
pub const ROOT_PATH: &str = "<root>";

pub(crate) type Segments<'a> = SmallVec<[&'a str; 8]>;

pub(crate) fn split(path: &str) -> Segments<'_> {
    path.split(PATH_SEPARATOR).collect()
}

/// Append one segment to a prefix
pub fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}{PATH_SEPARATOR}{segment}")
    }
}

/// Path of the `index`-th child under `slot`
pub fn child(prefix: &str, slot: &str, index: usize) -> String {
    join(&join(prefix, slot), &index.to_string())
}

pub(crate) fn display(path: &str) -> &str {
    if path.is_empty() {
        ROOT_PATH
    } else {
        path
    }
}

/// Child indices must be canonical decimals so each child has exactly one path
pub(crate) fn parse_index(segment: &str) -> Option<usize> {
    let index: usize = segment.parse().ok()?;
    (index.to_string() == segment).then_some(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_and_child() {
        assert_eq!(join("", "norm"), "norm");
        assert_eq!(join("transformations__1", "norm"), "transformations__1__norm");
        assert_eq!(child("", "concat", 2), "concat__2");
        assert_eq!(child("embedding", "transform", 0), "embedding__transform__0");
    }

    #[test]
    fn test_split_keeps_empty_segments() {
        assert_eq!(split("a__b").as_slice(), &["a", "b"]);
        assert_eq!(split("a____b").as_slice(), &["a", "", "b"]);
        assert_eq!(split("").as_slice(), &[""]);
    }

    #[test]
    fn test_parse_index_is_canonical() {
        assert_eq!(parse_index("0"), Some(0));
        assert_eq!(parse_index("12"), Some(12));
        assert_eq!(parse_index("01"), None);
        assert_eq!(parse_index("+1"), None);
        assert_eq!(parse_index("-1"), None);
        assert_eq!(parse_index("one"), None);
    }

    #[test]
    fn test_display_root() {
        assert_eq!(display(""), ROOT_PATH);
        assert_eq!(display("concat__0"), "concat__0");
    }
}

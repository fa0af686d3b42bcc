use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// Matched against the file stem. Separators are `_`, `-`, `.` and spaces.
regex!(LOD_REGEX, r"(?i)(?:^|[_\-.\s])lod[_\-]?(\d+)(?:[_\-.\s]|$)");
regex!(NUMERIC_VARIANT_REGEX, r"[_\-](\d{2,})$");
regex!(RESOLUTION_REGEX, r"(?i)(?:^|[^0-9])(\d{2,5})x(\d{2,5})(?:[^0-9]|$)");
regex!(LEVEL_REGEX, r"(?i)(?:^|[_\-.\s])(?:(?:level|lvl)[_\-]?|l)(\d{1,2})(?:[_\-.\s]|$)");

// Custom style templates: expression and block tags, and the identifiers in them.
regex!(TEMPLATE_TAG_REGEX, r"\{[{%](.*?)[}%]\}");
regex!(IDENTIFIER_REGEX, r"[A-Za-z_][A-Za-z0-9_]*");

//! Slack message text handling

/// Decode the three HTML entities Slack escapes in message text.
///
/// Slack escapes `&`, `<` and `>` (<https://api.slack.com/reference/surfaces/formatting#escaping>).
/// Decoding is a single left-to-right pass, so `&amp;lt;` becomes `&lt;`
/// and is never expanded a second time. No other entities are touched.
pub fn decode_slack_entities(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('&') {
        output.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        let (decoded, consumed) = if tail.starts_with("&amp;") {
            ('&', "&amp;".len())
        } else if tail.starts_with("&lt;") {
            ('<', "&lt;".len())
        } else if tail.starts_with("&gt;") {
            ('>', "&gt;".len())
        } else {
            ('&', 1)
        };

        output.push(decoded);
        rest = &tail[consumed..];
    }

    output.push_str(rest);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_all_three_entities() {
        assert_eq!(decode_slack_entities("a &amp;&lt;b&gt; c"), "a &<b> c");
    }

    #[test]
    fn test_decode_does_not_double_decode() {
        assert_eq!(decode_slack_entities("&amp;amp;"), "&amp;");
        assert_eq!(decode_slack_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_decode_leaves_other_entities() {
        assert_eq!(decode_slack_entities("&quot;hi&quot; &#39;"), "&quot;hi&quot; &#39;");
        assert_eq!(decode_slack_entities("&AMP; &Lt;"), "&AMP; &Lt;");
    }

    #[test]
    fn test_decode_plain_text_unchanged() {
        assert_eq!(decode_slack_entities("hello world"), "hello world");
        assert_eq!(decode_slack_entities("fish & chips"), "fish & chips");
        assert_eq!(decode_slack_entities("trailing &"), "trailing &");
        assert_eq!(decode_slack_entities(""), "");
    }

    #[test]
    fn test_decode_multibyte_text() {
        assert_eq!(decode_slack_entities("日本語 &lt;3"), "日本語 <3");
    }
}

//! Parse raw response header lines into `Headers`.

use super::Headers;

/// Parse collected header lines into the headers of the final response.
///
/// libcurl hands us every header block it sees (redirect hops, `100 Continue`),
/// each starting with a status line. Only the last block describes the
/// response we return, so a status line discards what came before it.
pub(crate) fn parse_header_lines(lines: &[String]) -> Headers {
    let mut headers = Headers::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("HTTP/") {
            headers = Headers::new();
            continue;
        }
        if let Some((name, value)) = Headers::parse_line(line) {
            headers.append(name, value);
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_single_block() {
        let h = parse_header_lines(&lines(&[
            "HTTP/1.1 429 Too Many Requests",
            "Retry-After: 7",
            "Content-Length: 0",
            "",
        ]));
        assert_eq!(h.get("retry-after"), Some("7"));
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn keeps_only_final_block_after_redirect() {
        let h = parse_header_lines(&lines(&[
            "HTTP/1.1 302 Found",
            "Location: /elsewhere",
            "",
            "HTTP/1.1 200 OK",
            "ETag: \"v2\"",
            "",
        ]));
        assert!(h.get("location").is_none());
        assert_eq!(h.get("etag"), Some("\"v2\""));
    }

    #[test]
    fn continue_block_is_discarded() {
        let h = parse_header_lines(&lines(&[
            "HTTP/1.1 100 Continue",
            "",
            "HTTP/1.1 201 Created",
            "Location: /items/1",
        ]));
        assert_eq!(h.get("location"), Some("/items/1"));
    }
}

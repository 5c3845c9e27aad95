//! Delimiter extraction and comment-prefix stripping for metadata headers

/// The literal delimiter that brackets an embedded metadata header.
pub const DELIMITER: &str = "#|^^^|#";

/// Comment-bracket pairs the delimiter and header lines may be wrapped in.
/// The second element is empty for line-comment styles with no closer.
const COMMENT_PAIRS: &[(&str, &str)] =
	&[("/*", "*/"), ("<!--", "-->"), ("//", ""), ("#", ""), (";", "")];

/// Strip a single leading comment-bracket pair (if present) from one line,
/// trimming surrounding whitespace. Only one pair is ever stripped per line
/// - nested comment styles are not a case this format supports.
pub fn strip_comment_markers(line: &str) -> &str {
	let trimmed = line.trim();
	for (open, close) in COMMENT_PAIRS {
		if let Some(rest) = trimmed.strip_prefix(open) {
			let rest = rest.trim();
			if !close.is_empty() {
				if let Some(inner) = rest.strip_suffix(close) {
					return inner.trim();
				}
			}
			return rest;
		}
	}
	trimmed
}

/// Extract `(header_json, body)` from file contents that embed a header
/// between two delimiter lines. `body` is the raw bytes following the
/// second delimiter line, CR characters removed.
///
/// Returns `None` if fewer than two delimiter lines are found.
pub fn extract_header(contents: &str) -> Option<(String, String)> {
	let normalized = contents.replace('\r', "");
	let all_lines: Vec<&str> = normalized.split('\n').collect();

	let open_idx = all_lines.iter().position(|line| strip_comment_markers(line) == DELIMITER)?;
	let close_idx = all_lines
		.iter()
		.enumerate()
		.skip(open_idx + 1)
		.find(|(_, line)| strip_comment_markers(line) == DELIMITER)
		.map(|(i, _)| i)?;

	let header_json: String = all_lines[open_idx + 1..close_idx]
		.iter()
		.map(|l| strip_comment_markers(l))
		.collect::<Vec<_>>()
		.join("\n");

	let body_start_line = close_idx + 1;
	let body = if body_start_line < all_lines.len() {
		all_lines[body_start_line..].join("\n")
	} else {
		String::new()
	};

	Some((header_json, body))
}


// vim: ts=4

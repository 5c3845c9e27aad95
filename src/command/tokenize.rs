//! Quote/escape-aware shell tokenizer for local pre-deploy commands.
//!
//! Recognizes three data macros inline with ordinary tokens:
//! `<<<{@LOCALFILEDATA}` (feed the file's own content to the command's
//! stdin), `>{@REMOTEFILEDATA}` (capture stdout and replace the content
//! that will be transferred), `>>{@REMOTEFILEDATA}` (append stdout to the
//! content that will be transferred).

/// One token from a pre-deploy command line, annotated with a macro if it
/// carried one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
	Plain(String),
	/// `<<<{@LOCALFILEDATA}` - feed local file content to stdin.
	LocalFileDataIn,
	/// `>{@REMOTEFILEDATA}` - replace transferred content with stdout.
	RemoteFileDataReplace,
	/// `>>{@REMOTEFILEDATA}` - append stdout to transferred content.
	RemoteFileDataAppend,
}

const MACRO_IN: &str = "<<<{@LOCALFILEDATA}";
const MACRO_REPLACE: &str = ">{@REMOTEFILEDATA}";
const MACRO_APPEND: &str = ">>{@REMOTEFILEDATA}";

/// Tokenize a command line, splitting on whitespace outside quotes,
/// honoring single quotes, double quotes, and backslash escapes, and
/// recognizing the three data macros as standalone tokens.
pub fn tokenize(line: &str) -> Vec<Token> {
	let mut tokens = Vec::new();
	let mut current = String::new();
	let mut chars = line.chars().peekable();
	let mut in_single = false;
	let mut in_double = false;
	let mut has_content = false;

	macro_rules! flush {
		() => {
			if has_content {
				tokens.push(classify(std::mem::take(&mut current)));
				has_content = false;
			}
		};
	}

	while let Some(c) = chars.next() {
		match c {
			'\\' if !in_single => {
				if let Some(next) = chars.next() {
					current.push(next);
					has_content = true;
				}
			}
			'\'' if !in_double => {
				in_single = !in_single;
				has_content = true;
			}
			'"' if !in_single => {
				in_double = !in_double;
				has_content = true;
			}
			c if c.is_whitespace() && !in_single && !in_double => {
				flush!();
			}
			c => {
				current.push(c);
				has_content = true;
			}
		}
	}
	flush!();

	tokens
}

fn classify(raw: String) -> Token {
	match raw.as_str() {
		MACRO_IN => Token::LocalFileDataIn,
		MACRO_REPLACE => Token::RemoteFileDataReplace,
		MACRO_APPEND => Token::RemoteFileDataAppend,
		_ => Token::Plain(raw),
	}
}


// vim: ts=4

//! Static replies for inbound direct messages.
//!
//! The bridge itself only sends over REST. A gateway consumer that receives message events
//! calls [`reply_to`] for each one and posts the returned text back to the same channel.

/// Reply to `hi`.
pub const GREETING: &str = "Hello! I only respond in DMs.";
/// Reply to `!help`.
pub const HELP: &str = "Commands:\n- hi\n- !help\n\nUnity can also make me message you!";

/// Returns the reply for an inbound message, if any.
///
/// Guild messages never get a reply. Matching ignores ASCII case but not surrounding whitespace.
pub fn reply_to(content: &str, in_guild: bool) -> Option<&'static str> {
	if in_guild {
		return None;
	}

	match content.to_ascii_lowercase().as_str() {
		"hi" => Some(GREETING),
		"!help" => Some(HELP),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn direct_messages_get_static_replies() {
		assert_eq!(reply_to("hi", false), Some(GREETING));
		assert_eq!(reply_to("HI", false), Some(GREETING));
		assert_eq!(reply_to("!Help", false), Some(HELP));
		assert_eq!(reply_to(" hi", false), None);
		assert_eq!(reply_to("hello", false), None);
	}

	#[test]
	fn guild_messages_are_ignored() {
		assert_eq!(reply_to("hi", true), None);
		assert_eq!(reply_to("!help", true), None);
	}
}

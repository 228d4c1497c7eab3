//!
//! Display helpers for ledger data.

use crate::gateway::Block;

/// Shorten a digest to its first and last `keep` characters.
///
/// Digests no longer than `2 * keep` characters are returned unchanged.
pub fn short_digest(digest: &str, keep: usize) -> String {
	let chars: Vec<char> = digest.chars().collect();
	if chars.len() <= keep * 2 {
		return digest.to_string();
	}
	let head: String = chars[..keep].iter().collect();
	let tail: String = chars[chars.len() - keep..].iter().collect();
	format!("{}…{}", head, tail)
}

/// One-line summary of a block.
pub fn format_block_line(block: &Block) -> String {
	format!(
		"#{:<4} {}  nonce={:<8} txs={:<3} hash={} prev={}",
		block.index,
		block.timestamp.format("%Y-%m-%d %H:%M:%S"),
		block.nonce,
		block.transaction_count(),
		short_digest(&block.hash, 8),
		if block.is_genesis() {
			"genesis".to_string()
		} else {
			short_digest(&block.prev_hash, 8)
		},
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_short_digest() {
		assert_eq!(short_digest("abcdef", 3), "abcdef");
		assert_eq!(short_digest("0001abcdef9999", 4), "0001…9999");
	}
}

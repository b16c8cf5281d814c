/// Set on ids allocated for items that exist only locally.
pub const LOCAL_ID_FLAG: u64 = 1 << 63;

/// Derives the stable numeric id of a backend record.
///
/// The whole trimmed `source_id` is hashed with blake3 and the first eight bytes are kept, minus
/// [`LOCAL_ID_FLAG`]. Ids that share a prefix (ObjectIds written in the same second, for example)
/// still map to different values. Returns `None` for blank input.
pub fn derive_id(source_id: &str) -> Option<u64> {
	let source_id = source_id.trim();

	if source_id.is_empty() {
		return None;
	}

	let hash = blake3::hash(source_id.as_bytes());
	let mut buf = [0_u8; 8];

	buf.copy_from_slice(&hash.as_bytes()[..8]);

	Some(u64::from_le_bytes(buf) & !LOCAL_ID_FLAG)
}

pub fn local_id(sequence: u64) -> u64 {
	LOCAL_ID_FLAG | sequence
}

pub fn is_local_id(id: u64) -> bool {
	id & LOCAL_ID_FLAG != 0
}

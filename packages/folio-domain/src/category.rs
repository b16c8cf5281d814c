use std::collections::BTreeMap;

pub const NOTES: &str = "Notizen";
pub const ORDERS: &str = "Bestellungen";
pub const SERVICES: &str = "Leistungen";
pub const APPOINTMENTS: &str = "Termin";
pub const PAYMENTS: &str = "Zahlungen";
pub const EMAILS: &str = "E-mails";

/// Display labels of the customer note feed, in tab order.
pub const NOTE_CATEGORIES: [&str; 6] = [NOTES, ORDERS, SERVICES, APPOINTMENTS, PAYMENTS, EMAILS];

const BUILT_IN_REMAP: [(&str, &str); 1] = [("Emails", EMAILS)];

/// One-directional table from backend category strings to display labels.
///
/// Several backend values may collapse onto one label. [`CategoryMap::to_backend`] picks the
/// lexicographically smallest backend value as the canonical reverse mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMap {
	forward: BTreeMap<String, String>,
}
impl CategoryMap {
	pub fn from_config(cfg: &folio_config::Categories) -> Self {
		Self::default().with_overrides(
			cfg.remap.iter().map(|(backend, label)| (backend.as_str(), label.as_str())),
		)
	}

	pub fn with_overrides<'a, I>(mut self, overrides: I) -> Self
	where
		I: IntoIterator<Item = (&'a str, &'a str)>,
	{
		for (backend, label) in overrides {
			self.forward.insert(backend.trim().to_string(), label.trim().to_string());
		}

		self
	}

	/// Unknown categories pass through unchanged.
	pub fn to_label(&self, backend: &str) -> String {
		let backend = backend.trim();

		self.forward.get(backend).cloned().unwrap_or_else(|| backend.to_string())
	}

	pub fn to_backend(&self, label: &str) -> String {
		let label = label.trim();

		self.forward
			.iter()
			.find(|(_, mapped)| mapped.as_str() == label)
			.map(|(backend, _)| backend.clone())
			.unwrap_or_else(|| label.to_string())
	}
}
impl Default for CategoryMap {
	fn default() -> Self {
		let forward = BUILT_IN_REMAP
			.iter()
			.map(|(backend, label)| (backend.to_string(), label.to_string()))
			.collect();

		Self { forward }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn remaps_emails_and_passes_unknown_through() {
		let map = CategoryMap::default();

		assert_eq!(map.to_label("Emails"), "E-mails");
		assert_eq!(map.to_label(" Notizen "), "Notizen");
		assert_eq!(map.to_label("Reklamationen"), "Reklamationen");
	}

	#[test]
	fn reverse_mapping_uses_one_canonical_value() {
		let map = CategoryMap::default().with_overrides([("Mail", EMAILS), ("Newsletter", EMAILS)]);

		assert_eq!(map.to_label("Newsletter"), EMAILS);
		assert_eq!(map.to_backend(EMAILS), "Emails");
		assert_eq!(map.to_backend(NOTES), NOTES);
	}
}

use serde::{Deserialize, Serialize};

/// Everything that selects which slice of a customer's feed is shown.
///
/// Two contexts that compare equal share a pagination cursor; any difference starts a new
/// generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterContext {
	pub customer_id: String,
	/// Display label, not the backend category.
	pub category: Option<String>,
	pub search: Option<String>,
	pub group_by: Option<String>,
}
impl FilterContext {
	pub fn for_customer(customer_id: impl Into<String>) -> Self {
		Self { customer_id: customer_id.into(), ..Default::default() }
	}

	pub fn with_category(mut self, category: impl Into<String>) -> Self {
		self.category = Some(category.into());

		self
	}

	pub fn with_search(mut self, search: impl Into<String>) -> Self {
		let search = search.into();

		self.search = (!search.trim().is_empty()).then(|| search.trim().to_string());

		self
	}

	pub fn with_group_by(mut self, group_by: impl Into<String>) -> Self {
		self.group_by = Some(group_by.into());

		self
	}
}

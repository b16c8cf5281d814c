use folio_domain::FilterContext;
use folio_providers::Pagination;

use crate::MergeMode;

/// Handle for one outstanding page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
	pub generation: u64,
	pub page: u32,
	pub mode: MergeMode,
}

/// Page cursor for the active filter.
///
/// The generation increases on every reset; a ticket from an older generation can no longer
/// change the cursor.
#[derive(Debug, Clone)]
pub struct Cursor {
	filter: FilterContext,
	generation: u64,
	next_page: u32,
	has_next_page: bool,
	in_flight: bool,
	replace_next: bool,
}
impl Cursor {
	pub fn new(filter: FilterContext) -> Self {
		Self {
			filter,
			generation: 0,
			next_page: 1,
			has_next_page: true,
			in_flight: false,
			replace_next: true,
		}
	}

	pub fn filter(&self) -> &FilterContext {
		&self.filter
	}

	pub fn generation(&self) -> u64 {
		self.generation
	}

	pub fn next_page(&self) -> u32 {
		self.next_page
	}

	pub fn has_next_page(&self) -> bool {
		self.has_next_page
	}

	pub fn is_loading(&self) -> bool {
		self.in_flight
	}

	/// Switches to `filter`. Returns `false` when it equals the active one.
	pub fn reset(&mut self, filter: FilterContext) -> bool {
		if filter == self.filter {
			return false;
		}

		self.filter = filter;

		self.restart();

		true
	}

	/// Starts over at page 1 of the same filter.
	pub fn restart(&mut self) {
		self.generation += 1;
		self.next_page = 1;
		self.has_next_page = true;
		self.in_flight = false;
		self.replace_next = true;
	}

	pub fn begin(&mut self) -> Option<Ticket> {
		if self.in_flight || !self.has_next_page {
			return None;
		}

		self.in_flight = true;

		let mode = if self.replace_next { MergeMode::Replace } else { MergeMode::Append };

		Some(Ticket { generation: self.generation, page: self.next_page, mode })
	}

	pub fn is_current(&self, ticket: &Ticket) -> bool {
		ticket.generation == self.generation
	}

	/// Records a successful load. `has_next_page` comes from the server report only.
	pub fn complete(&mut self, ticket: &Ticket, pagination: &Pagination) -> bool {
		if !self.is_current(ticket) {
			return false;
		}

		self.in_flight = false;
		self.replace_next = false;
		self.next_page = ticket.page.saturating_add(1);
		self.has_next_page = pagination.has_next_page;

		true
	}

	/// Releases the in-flight slot and leaves the cursor where it was, so a retry asks for the
	/// same page.
	pub fn fail(&mut self, ticket: &Ticket) {
		if self.is_current(ticket) {
			self.in_flight = false;
		}
	}
}

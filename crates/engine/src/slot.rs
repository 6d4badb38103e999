//! Sequenced cache slot.

/// A cached value plus the sequence numbers of the fetches that target it.
///
/// Every fetch takes a ticket before suspending. A response is applied only
/// if its ticket is newer than the last applied one, so an older fetch that
/// resolves late never overwrites a newer result.
#[derive(Debug)]
pub(crate) struct Slot<T> {
	value: Option<T>,
	issued: u64,
	applied: u64,
}

impl<T> Default for Slot<T> {
	fn default() -> Self {
		Self {
			value: None,
			issued: 0,
			applied: 0,
		}
	}
}

impl<T> Slot<T> {
	/// Takes the next fetch ticket.
	pub fn issue(&mut self) -> u64 {
		self.issued = self.issued.wrapping_add(1);
		self.issued
	}

	/// Returns true if a response for `ticket` would be applied.
	pub fn accepts(&self, ticket: u64) -> bool {
		ticket > self.applied
	}

	/// Replaces the value if `ticket` is newer than the last applied one.
	pub fn apply(&mut self, ticket: u64, value: Option<T>) -> bool {
		if !self.accepts(ticket) {
			return false;
		}
		self.applied = ticket;
		self.value = value;
		true
	}

	pub fn value(&self) -> Option<&T> {
		self.value.as_ref()
	}

	pub fn value_mut(&mut self) -> Option<&mut T> {
		self.value.as_mut()
	}

	pub fn is_some(&self) -> bool {
		self.value.is_some()
	}
}
